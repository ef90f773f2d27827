//! Level-based retention of incremental dumps.
//!
//! Dumps are grouped per host and filesystem and walked from level 0 upward.
//! A level survives while it is newer than the level below it and the gap to
//! that level stays within `day_length * (10 - level)`. The first level that
//! fails either test is expired together with every level above it, since
//! those incrementals are useless without their parent.

pub mod prune;

use crate::dump::{DumpFile, DumpLevel};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::PathBuf;
use tracing::{debug, warn};

pub use prune::{prune, PruneReport, RemovalMode};

/// Identifies the dump chain a file belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub host: String,
    pub filesystem: String,
}

/// One dump chain, keyed and therefore ordered by level.
pub type DumpChain = BTreeMap<DumpLevel, DumpFile>;

pub type DumpGroups = BTreeMap<GroupKey, DumpChain>;

/// Group dumps into chains.
///
/// If two files claim the same level of a chain, the one with the newer
/// modification time is kept for evaluation; on a tie the later one wins.
/// The dropped file is left on disk.
pub fn group_dumps(dumps: impl IntoIterator<Item = DumpFile>) -> DumpGroups {
    let mut groups = DumpGroups::new();

    for dump in dumps {
        let key = GroupKey {
            host: dump.host.clone(),
            filesystem: dump.filesystem.clone(),
        };
        let chain = groups.entry(key).or_default();

        match chain.entry(dump.level) {
            Entry::Vacant(slot) => {
                slot.insert(dump);
            }
            Entry::Occupied(mut slot) => {
                let (kept, dropped) = if dump.modified >= slot.get().modified {
                    let previous = slot.insert(dump);
                    (slot.get().path.clone(), previous.path)
                } else {
                    (slot.get().path.clone(), dump.path)
                };
                warn!(
                    kept = %kept.display(),
                    dropped = %dropped.display(),
                    "Duplicate dump level, ignoring older file"
                );
            }
        }
    }

    groups
}

/// Decides which dumps have outlived their usefulness.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    day_length: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(Duration::days(1))
    }
}

impl RetentionPolicy {
    pub fn new(day_length: Duration) -> Self {
        Self { day_length }
    }

    /// Longest allowed gap between an incremental and the level below it.
    pub fn threshold(&self, level: DumpLevel) -> Duration {
        self.day_length * (10 - i32::from(level.value()))
    }

    /// Paths of the expired dumps in one chain, lowest level first.
    pub fn evaluate_chain(&self, chain: &DumpChain) -> Vec<PathBuf> {
        let mut expired = Vec::new();
        let mut watermark = DateTime::<Utc>::UNIX_EPOCH;
        let mut remove_all = false;

        for (&level, dump) in chain {
            if remove_all {
                expired.push(dump.path.clone());
                continue;
            }

            if level.is_full() {
                watermark = dump.modified;
                continue;
            }

            if let Some(reason) = self.expiry_reason(level, dump.modified, watermark) {
                debug!(path = %dump.path.display(), %level, reason, "Dump chain cut");
                expired.push(dump.path.clone());
                remove_all = true;
                continue;
            }

            watermark = dump.modified;
        }

        expired
    }

    fn expiry_reason(
        &self,
        level: DumpLevel,
        modified: DateTime<Utc>,
        watermark: DateTime<Utc>,
    ) -> Option<&'static str> {
        if watermark >= modified {
            Some("not newer than parent level")
        } else if level == DumpLevel::MAX {
            Some("terminal level")
        } else if modified - watermark > self.threshold(level) {
            Some("parent level too old")
        } else {
            None
        }
    }

    /// Paths of the expired dumps across all chains.
    pub fn evaluate(&self, groups: &DumpGroups) -> Vec<PathBuf> {
        groups
            .values()
            .flat_map(|chain| self.evaluate_chain(chain))
            .collect()
    }
}
