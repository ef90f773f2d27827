//! Configuration management for the dump rotation tool.
//!
//! [`Config`] holds what configuration mode persists in the key-value store.
//! [`Settings`] holds runtime knobs with defaults, overridable through
//! `XFSDUMP_ROTATE_*` environment variables.

use crate::dump::name::FIELD_DELIMITER;
use crate::retention::{RemovalMode, RetentionPolicy};
use crate::store::KeyValueStore;
use crate::utils::{Result, RotateError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

pub const KEY_BACKUP_DIR: &str = "backup_dir";
pub const KEY_HOST_NAME: &str = "host_name";
pub const KEY_BACKUP_FILESYSTEMS: &str = "backup_filesystems";

/// Environment prefix for [`Settings`] overrides.
pub const ENV_PREFIX: &str = "XFSDUMP_ROTATE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the dump files
    pub backup_dir: PathBuf,

    /// Short host name used as the first field of dump names
    pub host_name: String,

    /// Mount points to dump, in order
    pub backup_filesystems: Vec<String>,
}

fn required(store: &dyn KeyValueStore, key: &str) -> Result<String> {
    store
        .get(key)
        .ok_or_else(|| RotateError::MissingKey(key.to_string()))
}

/// A host name becomes the first field of every dump name, so it must be
/// non-empty and free of the field delimiter.
pub fn check_host_name(host_name: &str) -> Result<()> {
    if host_name.is_empty() {
        return Err(RotateError::Config("host name is empty".to_string()));
    }
    if host_name.contains(FIELD_DELIMITER) {
        return Err(RotateError::Config(format!(
            "host name `{host_name}` contains `{FIELD_DELIMITER}`, which separates dump name fields"
        )));
    }
    Ok(())
}

impl Config {
    /// Load from `store`, failing on the first missing key.
    pub fn load(store: &dyn KeyValueStore) -> Result<Self> {
        let backup_dir = PathBuf::from(required(store, KEY_BACKUP_DIR)?);
        let host_name = required(store, KEY_HOST_NAME)?;
        let backup_filesystems = serde_json::from_str(&required(store, KEY_BACKUP_FILESYSTEMS)?)?;

        Ok(Self {
            backup_dir,
            host_name,
            backup_filesystems,
        })
    }

    /// Write every key to `store` and flush it.
    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<()> {
        store.set(KEY_BACKUP_DIR, self.backup_dir.to_string_lossy().into_owned());
        store.set(KEY_HOST_NAME, self.host_name.clone());
        store.set(
            KEY_BACKUP_FILESYSTEMS,
            serde_json::to_string(&self.backup_filesystems)?,
        );
        store.flush()
    }

    pub fn validate(&self) -> Result<()> {
        if !self.backup_dir.is_dir() {
            return Err(RotateError::InvalidBackupDir(self.backup_dir.clone()));
        }
        check_host_name(&self.host_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Delete expired dumps instead of only logging them
    #[serde(default)]
    pub delete_expired: bool,

    /// Length of the retention "day" in seconds
    #[serde(default = "default_day_length_secs")]
    pub day_length_secs: u32,

    /// Dump program, resolved through PATH
    #[serde(default = "default_dump_program")]
    pub dump_program: String,

    /// Privilege escalation program, skipped when running as root
    #[serde(default = "default_sudo_program")]
    pub sudo_program: String,

    /// Filesystem type accepted in configuration mode
    #[serde(default = "default_filesystem_type")]
    pub filesystem_type: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default values
fn default_day_length_secs() -> u32 {
    24 * 60 * 60
}

fn default_dump_program() -> String {
    "xfsdump".to_string()
}

fn default_sudo_program() -> String {
    "sudo".to_string()
}

fn default_filesystem_type() -> String {
    "xfs".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            delete_expired: false,
            day_length_secs: default_day_length_secs(),
            dump_program: default_dump_program(),
            sudo_program: default_sudo_program(),
            filesystem_type: default_filesystem_type(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Defaults overridden by the process environment.
    pub fn load() -> Result<Self> {
        Self::from_env(None)
    }

    /// Defaults overridden by `vars` (or the process environment when `None`).
    pub fn from_env(vars: Option<HashMap<String, String>>) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(vars),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn removal_mode(&self) -> RemovalMode {
        if self.delete_expired {
            RemovalMode::Delete
        } else {
            RemovalMode::DryRun
        }
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy::new(chrono::Duration::seconds(i64::from(self.day_length_secs)))
    }
}
