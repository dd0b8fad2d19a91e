//! Command implementations

pub mod calc;
pub mod cert;
pub mod cust;
pub mod eqp;
pub mod init;
pub mod tool;
