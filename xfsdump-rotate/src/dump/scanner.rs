//! Backup directory scanning.
//!
//! Lists the dump files sitting directly in the backup directory and decodes
//! their names. Subdirectories are not descended into. A symlink counts as a
//! dump when it resolves to a regular file, and its modification time is
//! taken from the target; dangling links are skipped.

use super::name::{DumpLevel, DumpName, DUMP_EXTENSION};
use crate::utils::{Result, RotateError};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// A completed dump found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpFile {
    /// Host the dump was taken on
    pub host: String,

    /// Filesystem slug as recovered from the file name
    pub filesystem: String,

    /// Incremental level
    pub level: DumpLevel,

    /// Last modification time of the dump file
    pub modified: DateTime<Utc>,

    /// Full path to the file
    pub path: PathBuf,
}

impl DumpFile {
    fn from_entry(entry: &DirEntry) -> Result<Self> {
        let file_name = entry.file_name().to_string_lossy();
        let name = DumpName::parse(&file_name)?;
        let modified = std::fs::metadata(entry.path())?.modified()?;

        Ok(Self {
            host: name.host,
            filesystem: name.slug,
            level: name.level,
            modified: DateTime::<Utc>::from(modified),
            path: entry.path().to_path_buf(),
        })
    }
}

fn is_dump_file(entry: &DirEntry) -> bool {
    let has_extension = entry
        .path()
        .extension()
        .is_some_and(|ext| ext == DUMP_EXTENSION);
    if !has_extension {
        return false;
    }

    if entry.path_is_symlink() {
        match std::fs::metadata(entry.path()) {
            Ok(target) => target.is_file(),
            Err(e) => {
                debug!(path = %entry.path().display(), "Skipping dangling symlink: {e}");
                false
            }
        }
    } else {
        entry.file_type().is_file()
    }
}

/// Collect every dump file in `backup_dir`.
///
/// Any `.xfsdump` file whose name does not decode is an error for the whole
/// scan; other files are ignored.
pub fn scan_dump_dir(backup_dir: &Path) -> Result<Vec<DumpFile>> {
    if !backup_dir.is_dir() {
        return Err(RotateError::InvalidBackupDir(backup_dir.to_path_buf()));
    }

    let walker = WalkDir::new(backup_dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    let mut dumps = Vec::new();
    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;

        if !is_dump_file(&entry) {
            continue;
        }

        let dump = DumpFile::from_entry(&entry)?;
        debug!(
            host = %dump.host,
            filesystem = %dump.filesystem,
            level = %dump.level,
            path = %dump.path.display(),
            "Found dump file"
        );
        dumps.push(dump);
    }

    Ok(dumps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn test_scan_empty_directory() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let dumps = scan_dump_dir(temp_dir.path())?;
        assert!(dumps.is_empty());
        Ok(())
    }

    #[test]
    fn test_scan_decodes_dump_files() -> Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(temp_dir.path().join("db1_data_0.xfsdump"), b"full")?;
        fs::write(temp_dir.path().join("db1_data_1.xfsdump"), b"incr")?;
        fs::write(temp_dir.path().join("notes.txt"), b"ignored")?;

        let dumps = scan_dump_dir(temp_dir.path())?;
        assert_eq!(dumps.len(), 2);
        assert_eq!(dumps[0].host, "db1");
        assert_eq!(dumps[0].filesystem, "data");
        assert_eq!(dumps[0].level.value(), 0);
        assert_eq!(dumps[1].level.value(), 1);
        assert_eq!(dumps[1].path, temp_dir.path().join("db1_data_1.xfsdump"));
        Ok(())
    }

    #[test]
    fn test_scan_reads_mtime() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("db1_data_0.xfsdump");
        let file = fs::File::create(&path)?;
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        file.set_modified(mtime)?;

        let dumps = scan_dump_dir(temp_dir.path())?;
        assert_eq!(dumps[0].modified.timestamp(), 1_700_000_000);
        Ok(())
    }

    #[test]
    fn test_scan_is_not_recursive() -> Result<()> {
        let temp_dir = TempDir::new()?;
        fs::create_dir(temp_dir.path().join("old"))?;
        fs::write(temp_dir.path().join("old/db1_data_0.xfsdump"), b"x")?;

        let dumps = scan_dump_dir(temp_dir.path())?;
        assert!(dumps.is_empty());
        Ok(())
    }

    #[test]
    fn test_scan_skips_directories_with_dump_extension() -> Result<()> {
        let temp_dir = TempDir::new()?;
        fs::create_dir(temp_dir.path().join("db1_data_0.xfsdump"))?;

        let dumps = scan_dump_dir(temp_dir.path())?;
        assert!(dumps.is_empty());
        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn test_scan_follows_symlinked_dumps() -> Result<()> {
        use std::os::unix::fs::symlink;

        let temp_dir = TempDir::new()?;
        let store_dir = TempDir::new()?;
        let target = store_dir.path().join("db1_data_0.xfsdump");
        let file = fs::File::create(&target)?;
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000))?;

        symlink(&target, temp_dir.path().join("db1_data_0.xfsdump"))?;
        symlink(
            store_dir.path().join("gone.xfsdump"),
            temp_dir.path().join("db1_data_1.xfsdump"),
        )?;
        symlink(store_dir.path(), temp_dir.path().join("db1_data_2.xfsdump"))?;

        let dumps = scan_dump_dir(temp_dir.path())?;
        assert_eq!(dumps.len(), 1);
        assert!(dumps[0].level.is_full());
        assert_eq!(dumps[0].modified.timestamp(), 1_700_000_000);
        assert_eq!(dumps[0].path, temp_dir.path().join("db1_data_0.xfsdump"));
        Ok(())
    }

    #[test]
    fn test_scan_fails_on_malformed_name() -> Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(temp_dir.path().join("db1_data_full.xfsdump"), b"x")?;

        let err = scan_dump_dir(temp_dir.path()).unwrap_err();
        assert!(matches!(err, RotateError::MalformedDumpName { .. }));
        Ok(())
    }

    #[test]
    fn test_scan_missing_directory() {
        let err = scan_dump_dir(Path::new("/nonexistent/backup/dir")).unwrap_err();
        assert!(matches!(err, RotateError::InvalidBackupDir(_)));
    }
}
