//! xfsdump rotation
//!
//! Takes incremental xfsdump backups of configured filesystems and expires
//! dump chains whose levels have grown too far apart.

pub mod commands;
pub mod config;
pub mod dump;
pub mod executor;
pub mod mounts;
pub mod retention;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::{Config, Settings};
pub use utils::errors::RotateError;
pub type Result<T> = std::result::Result<T, RotateError>;
