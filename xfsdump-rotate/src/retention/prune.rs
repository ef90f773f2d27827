//! Removal of expired dump files.

use crate::utils::Result;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Whether expired dumps are actually deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalMode {
    /// Only log what would be removed
    #[default]
    DryRun,
    Delete,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub removed: Vec<PathBuf>,
    /// Listed as expired but gone before we got to them
    pub missing: Vec<PathBuf>,
}

/// Apply `mode` to every expired path.
pub fn prune(expired: &[PathBuf], mode: RemovalMode) -> Result<PruneReport> {
    let mut report = PruneReport::default();

    if expired.is_empty() {
        info!("No expired dump files");
        return Ok(report);
    }

    for path in expired {
        match mode {
            RemovalMode::DryRun => {
                info!(path = %path.display(), "Would remove expired dump (dry run)");
            }
            RemovalMode::Delete => match remove_dump(path) {
                Ok(true) => {
                    info!(path = %path.display(), "Removed expired dump");
                    report.removed.push(path.clone());
                }
                Ok(false) => {
                    warn!(path = %path.display(), "Expired dump already gone");
                    report.missing.push(path.clone());
                }
                Err(e) => return Err(e.into()),
            },
        }
    }

    Ok(report)
}

fn remove_dump(path: &Path) -> std::io::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
