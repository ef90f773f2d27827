//! Dump file naming.
//!
//! A dump file is named `<host>_<slug>_<level>.xfsdump`. The slug is the
//! mount path with every `-` and `_` removed and its components joined with
//! `-`, so the mapping from slug back to the mount path is lossy.

use crate::utils::{Result, RotateError};
use std::fmt;

/// Extension of every dump file, without the leading dot.
pub const DUMP_EXTENSION: &str = "xfsdump";

/// Separates host, slug and level inside a file name.
pub const FIELD_DELIMITER: char = '_';

/// Joins path components inside a slug.
pub const SLUG_SEPARATOR: char = '-';

/// Incremental dump level, 0 (full) through 9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DumpLevel(u8);

impl DumpLevel {
    pub const FULL: DumpLevel = DumpLevel(0);
    pub const MAX: DumpLevel = DumpLevel(9);

    pub fn new(level: u8) -> Option<Self> {
        (level <= Self::MAX.0).then_some(Self(level))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_full(self) -> bool {
        self.0 == 0
    }

    /// All levels in allocation order.
    pub fn all() -> impl Iterator<Item = DumpLevel> {
        (0..=Self::MAX.0).map(DumpLevel)
    }
}

impl fmt::Display for DumpLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Turn a mount path into the delimiter-free form used in file names.
///
/// `/var/lib/my_db` becomes `var-lib-mydb`; `/` becomes the empty slug.
pub fn filesystem_slug(filesystem: &str) -> String {
    let stripped: String = filesystem
        .chars()
        .filter(|c| *c != SLUG_SEPARATOR && *c != FIELD_DELIMITER)
        .collect();

    let mut components = stripped.split('/');
    // Leading component is empty for absolute paths.
    components.next();
    components.collect::<Vec<_>>().join(&SLUG_SEPARATOR.to_string())
}

/// Decoded form of a dump file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpName {
    pub host: String,
    pub slug: String,
    pub level: DumpLevel,
}

impl DumpName {
    pub fn new(host: impl Into<String>, filesystem: &str, level: DumpLevel) -> Self {
        Self {
            host: host.into(),
            slug: filesystem_slug(filesystem),
            level,
        }
    }

    /// Same host and filesystem, different level.
    pub fn with_level(&self, level: DumpLevel) -> Self {
        Self {
            host: self.host.clone(),
            slug: self.slug.clone(),
            level,
        }
    }

    pub fn file_name(&self) -> String {
        format!(
            "{host}{d}{slug}{d}{level}.{DUMP_EXTENSION}",
            host = self.host,
            slug = self.slug,
            level = self.level,
            d = FIELD_DELIMITER,
        )
    }

    /// Parse a file name produced by [`DumpName::file_name`].
    pub fn parse(file_name: &str) -> Result<Self> {
        let stem = file_name
            .strip_suffix(DUMP_EXTENSION)
            .and_then(|s| s.strip_suffix('.'))
            .ok_or_else(|| {
                RotateError::malformed(file_name, format!("missing .{DUMP_EXTENSION} extension"))
            })?;

        let fields: Vec<&str> = stem.split(FIELD_DELIMITER).collect();
        let [host, slug, level] = fields.as_slice() else {
            return Err(RotateError::malformed(
                file_name,
                format!("expected 3 `{FIELD_DELIMITER}` separated fields, found {}", fields.len()),
            ));
        };

        if host.is_empty() {
            return Err(RotateError::malformed(file_name, "empty host name"));
        }

        let level = level
            .parse::<u8>()
            .ok()
            .and_then(DumpLevel::new)
            .ok_or_else(|| RotateError::malformed(file_name, format!("invalid level `{level}`")))?;

        Ok(Self {
            host: host.to_string(),
            slug: slug.to_string(),
            level,
        })
    }
}

impl fmt::Display for DumpName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}
