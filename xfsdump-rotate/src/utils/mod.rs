//! Utility modules for the dump rotation tool.

pub mod errors;
pub mod logger;

pub use errors::{Result, RotateError};
