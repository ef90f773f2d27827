//! Command orchestration for the CLI.
//!
//! - `configure` - Interactive setup (`-c`)
//! - `run` - Scan, expire, prune and dump

pub mod configure;
pub mod run;

pub use configure::{execute_configure, short_host_name};
pub use run::{execute_run, RunReport};
