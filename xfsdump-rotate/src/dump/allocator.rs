//! Picks the file name for the next dump of a filesystem.

use super::name::{DumpLevel, DumpName};
use std::path::Path;
use tracing::warn;

/// Lowest level in 0..=9 whose dump file does not exist in `backup_dir`.
///
/// When every level is taken the level 9 name is returned and the existing
/// file will be overwritten.
pub fn allocate_dump_name(host: &str, filesystem: &str, backup_dir: &Path) -> DumpName {
    let base = DumpName::new(host, filesystem, DumpLevel::FULL);

    for level in DumpLevel::all() {
        let candidate = base.with_level(level);
        if !backup_dir.join(candidate.file_name()).exists() {
            return candidate;
        }
    }

    warn!(
        host,
        filesystem,
        "All dump levels are in use, reusing level {}",
        DumpLevel::MAX
    );
    base.with_level(DumpLevel::MAX)
}
