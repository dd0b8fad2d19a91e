//! calcert: calibration certificates for gas-detection instruments
//!
//! Records customers, instruments, reference gases and certificates as plain
//! YAML files and computes the GUM uncertainty budget of each calibration.

pub mod cli;
pub mod core;
pub mod entities;
pub mod schema;
pub mod yaml;
