//! Custom error types for the dump rotation tool.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RotateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration key `{0}` is missing, configure first with \"-c\"")]
    MissingKey(String),

    #[error("Backup directory does not exist: {}", .0.display())]
    InvalidBackupDir(PathBuf),

    #[error("Malformed dump file name `{name}`: {reason}")]
    MalformedDumpName { name: String, reason: String },

    #[error("Filesystem {path} is not mounted as {fs_type}")]
    FilesystemNotMounted { path: String, fs_type: String },

    #[error("Required executable `{program}` not found: {source}")]
    ToolNotFound {
        program: String,
        #[source]
        source: which::Error,
    },

    #[error("Dump of {filesystem} failed: {reason}")]
    DumpFailed { filesystem: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Store write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),
}

impl RotateError {
    pub fn malformed(name: &str, reason: impl Into<String>) -> Self {
        Self::MalformedDumpName {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RotateError>;
