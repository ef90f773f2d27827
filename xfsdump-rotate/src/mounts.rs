//! Mount table inspection.
//!
//! Used by configuration mode to make sure a candidate is really a mounted
//! filesystem of the expected type.

use crate::utils::{Result, RotateError};
use std::path::Path;
use std::process::Command;
use tracing::debug;

const PROC_MOUNTS: &str = "/proc/self/mounts";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub source: String,
    pub mount_point: String,
    pub fs_type: String,
}

#[derive(Debug, Clone, Default)]
pub struct MountTable {
    entries: Vec<MountEntry>,
}

/// Undo the octal escaping the kernel applies to spaces, tabs and newlines.
fn unescape_mount_field(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let value = std::str::from_utf8(&bytes[i + 1..i + 4])
                .ok()
                .and_then(|digits| u8::from_str_radix(digits, 8).ok());
            if let Some(value) = value {
                out.push(value);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

impl MountTable {
    /// Read the current mount table, preferring procfs over `mount`.
    pub fn load() -> Result<Self> {
        if Path::new(PROC_MOUNTS).exists() {
            let content = std::fs::read_to_string(PROC_MOUNTS)?;
            return Ok(Self::parse_proc_mounts(&content));
        }

        let output = Command::new("mount").output()?;
        if !output.status.success() {
            return Err(RotateError::Config(format!(
                "failed to read mount table: mount exited with {}",
                output.status
            )));
        }
        Ok(Self::parse_mount_output(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Parse `/proc/mounts` format: `source target fstype options dump pass`.
    pub fn parse_proc_mounts(content: &str) -> Self {
        let entries = content
            .lines()
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                let source = parts.next()?;
                let target = parts.next()?;
                let fs_type = parts.next()?;
                Some(MountEntry {
                    source: unescape_mount_field(source),
                    mount_point: unescape_mount_field(target),
                    fs_type: fs_type.to_string(),
                })
            })
            .collect();
        Self { entries }
    }

    /// Parse `mount` output: `source on target type fstype (options)`.
    pub fn parse_mount_output(content: &str) -> Self {
        let entries = content
            .lines()
            .filter_map(|line| {
                let parts: Vec<&str> = line.split_whitespace().collect();
                match parts.as_slice() {
                    [source, "on", target, "type", fs_type, ..] => Some(MountEntry {
                        source: source.to_string(),
                        mount_point: target.to_string(),
                        fs_type: fs_type.to_string(),
                    }),
                    _ => None,
                }
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[MountEntry] {
        &self.entries
    }

    pub fn is_mounted_as(&self, mount_point: &str, fs_type: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.mount_point == mount_point && e.fs_type == fs_type)
    }

    /// Error unless `mount_point` is mounted with type `fs_type`.
    pub fn validate(&self, mount_point: &str, fs_type: &str) -> Result<()> {
        if self.is_mounted_as(mount_point, fs_type) {
            debug!(mount_point, fs_type, "Mount confirmed");
            Ok(())
        } else {
            Err(RotateError::FilesystemNotMounted {
                path: mount_point.to_string(),
                fs_type: fs_type.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROC_SAMPLE: &str = "\
/dev/sda1 / ext4 rw,relatime 0 0
proc /proc proc rw,nosuid,nodev,noexec,relatime 0 0
/dev/sdb1 /data xfs rw,relatime,attr2,inode64 0 0
/dev/sdc1 /mnt/my\\040disk xfs rw 0 0
";

    const MOUNT_SAMPLE: &str = "\
/dev/sda1 on / type ext4 (rw,relatime)
/dev/sdb1 on /data type xfs (rw,relatime,attr2,inode64)
";

    #[test]
    fn test_parse_proc_mounts() {
        let table = MountTable::parse_proc_mounts(PROC_SAMPLE);
        assert_eq!(table.entries().len(), 4);
        assert!(table.is_mounted_as("/data", "xfs"));
        assert!(!table.is_mounted_as("/", "xfs"));
        assert!(!table.is_mounted_as("/proc", "xfs"));
    }

    #[test]
    fn test_unescapes_spaces() {
        let table = MountTable::parse_proc_mounts(PROC_SAMPLE);
        assert!(table.is_mounted_as("/mnt/my disk", "xfs"));
    }

    #[test]
    fn test_parse_mount_output() {
        let table = MountTable::parse_mount_output(MOUNT_SAMPLE);
        assert_eq!(table.entries().len(), 2);
        assert_eq!(table.entries()[1].source, "/dev/sdb1");
        assert!(table.is_mounted_as("/data", "xfs"));
    }

    #[test]
    fn test_validate_rejects_wrong_type_and_unmounted() {
        let table = MountTable::parse_proc_mounts(PROC_SAMPLE);
        assert!(table.validate("/data", "xfs").is_ok());
        assert!(matches!(
            table.validate("/", "xfs"),
            Err(RotateError::FilesystemNotMounted { .. })
        ));
        assert!(table.validate("/srv", "xfs").is_err());
    }
}
