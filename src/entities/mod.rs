//! Entity type definitions

pub mod certificate;
pub mod customer;
pub mod equipment;
pub mod tool;

pub use certificate::Certificate;
pub use customer::Customer;
pub use equipment::Equipment;
pub use tool::Tool;
