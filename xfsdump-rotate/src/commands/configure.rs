//! Configuration mode.
//!
//! Prompts for the backup directory, records the short host name and keeps
//! only those filesystem candidates that are mounted with the expected type.

use crate::config::{check_host_name, Config, Settings};
use crate::mounts::MountTable;
use crate::store::KeyValueStore;
use crate::utils::{Result, RotateError};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Host name up to the first dot.
pub fn short_host_name(full: &str) -> &str {
    full.split('.').next().unwrap_or(full)
}

/// Short name of the local host.
pub fn local_short_host_name() -> Result<String> {
    let full = hostname::get()?.to_string_lossy().into_owned();
    Ok(short_host_name(&full).to_string())
}

fn prompt_backup_dir<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<PathBuf> {
    write!(output, "Configure a backup directory: ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let backup_dir = PathBuf::from(line.trim());

    if backup_dir.as_os_str().is_empty() || !backup_dir.is_dir() {
        return Err(RotateError::InvalidBackupDir(backup_dir));
    }
    Ok(backup_dir)
}

/// Run configuration mode and persist the result to `store`.
pub fn execute_configure<R: BufRead, W: Write>(
    store: &mut dyn KeyValueStore,
    input: &mut R,
    output: &mut W,
    host_name: &str,
    candidates: &[String],
    mounts: &MountTable,
    settings: &Settings,
) -> Result<Config> {
    check_host_name(host_name)?;
    let backup_dir = prompt_backup_dir(input, output)?;

    let mut backup_filesystems = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match mounts.validate(candidate, &settings.filesystem_type) {
            Ok(()) => {
                info!(filesystem = %candidate, "Backup filesystem candidate confirmed");
                if !backup_filesystems.contains(candidate) {
                    backup_filesystems.push(candidate.clone());
                }
            }
            Err(e) => error!("Rejecting backup filesystem candidate: {e}"),
        }
    }

    if backup_filesystems.is_empty() {
        warn!("No backup filesystems configured, runs will only apply retention");
    }

    let config = Config {
        backup_dir,
        host_name: host_name.to_string(),
        backup_filesystems,
    };
    config.save(store)?;

    info!(
        backup_dir = %config.backup_dir.display(),
        host = %config.host_name,
        filesystems = ?config.backup_filesystems,
        "Configuration saved"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::io::Cursor;
    use tempfile::TempDir;

    const MOUNTS: &str = "\
/dev/sda1 / ext4 rw 0 0
/dev/sdb1 /data xfs rw 0 0
/dev/sdc1 /home xfs rw 0 0
";

    fn run_configure(
        store: &mut MemoryStore,
        answer: &str,
        candidates: &[&str],
    ) -> Result<Config> {
        run_configure_as(store, "db1", answer, candidates)
    }

    fn run_configure_as(
        store: &mut MemoryStore,
        host_name: &str,
        answer: &str,
        candidates: &[&str],
    ) -> Result<Config> {
        let candidates: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
        let mut input = Cursor::new(format!("{answer}\n"));
        let mut output = Vec::new();
        execute_configure(
            store,
            &mut input,
            &mut output,
            host_name,
            &candidates,
            &MountTable::parse_proc_mounts(MOUNTS),
            &Settings::default(),
        )
    }

    #[test]
    fn test_short_host_name() {
        assert_eq!(short_host_name("db1.example.com"), "db1");
        assert_eq!(short_host_name("db1"), "db1");
    }

    #[test]
    fn test_configure_persists_valid_candidates() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let mut store = MemoryStore::default();

        let config = run_configure(
            &mut store,
            &temp_dir.path().to_string_lossy(),
            &["/data", "/", "/srv", "/home"],
        )?;

        assert_eq!(config.backup_filesystems, vec!["/data", "/home"]);
        assert_eq!(config.host_name, "db1");
        assert_eq!(Config::load(&store)?, config);
        Ok(())
    }

    #[test]
    fn test_configure_rejects_missing_backup_dir() {
        let mut store = MemoryStore::default();
        let err = run_configure(&mut store, "/nonexistent/backup", &["/data"]).unwrap_err();

        assert!(matches!(err, RotateError::InvalidBackupDir(_)));
        assert!(store.keys().is_empty());
    }

    #[test]
    fn test_configure_rejects_empty_answer() {
        let mut store = MemoryStore::default();
        let err = run_configure(&mut store, "   ", &[]).unwrap_err();
        assert!(matches!(err, RotateError::InvalidBackupDir(_)));
    }

    #[test]
    fn test_configure_rejects_host_name_with_delimiter() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let mut store = MemoryStore::default();

        let err = run_configure_as(
            &mut store,
            "db_1",
            &temp_dir.path().to_string_lossy(),
            &["/data"],
        )
        .unwrap_err();

        assert!(matches!(err, RotateError::Config(_)));
        assert!(store.keys().is_empty());
        Ok(())
    }
}
