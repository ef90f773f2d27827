//! Run command orchestration.
//!
//! Scans the backup directory, expires stale dump chains, then takes one dump
//! per configured filesystem. Filesystems are dumped in order and a failure
//! does not stop the remaining ones.

use crate::config::Config;
use crate::dump::scan_dump_dir;
use crate::executor::{plan_dumps, DumpExecutor, DumpJob};
use crate::retention::{group_dumps, prune, PruneReport, RemovalMode, RetentionPolicy};
use crate::utils::{Result, RotateError};
use std::path::PathBuf;
use tracing::{debug, error, info};

/// Outcome of one run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Dumps selected by the retention policy
    pub expired: Vec<PathBuf>,

    pub pruned: PruneReport,

    /// Dumps that completed
    pub completed: Vec<DumpJob>,

    /// Dumps that failed, with the reason
    pub failed: Vec<(DumpJob, RotateError)>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Execute the run command.
pub fn execute_run(
    config: &Config,
    policy: &RetentionPolicy,
    mode: RemovalMode,
    executor: &dyn DumpExecutor,
) -> Result<RunReport> {
    config.validate()?;

    let dumps = scan_dump_dir(&config.backup_dir)?;
    info!(count = dumps.len(), dir = %config.backup_dir.display(), "Scanned backup directory");

    let groups = group_dumps(dumps);
    for (key, chain) in &groups {
        let levels: Vec<String> = chain
            .values()
            .map(|dump| format!("{}@{}", dump.level, dump.modified.to_rfc3339()))
            .collect();
        debug!(host = %key.host, filesystem = %key.filesystem, ?levels, "Dump chain");
    }

    let expired = policy.evaluate(&groups);
    info!(count = expired.len(), "Expired dump files");
    for path in &expired {
        info!(path = %path.display(), "Expired");
    }
    let pruned = prune(&expired, mode)?;

    let jobs = plan_dumps(config);
    debug!(
        "Planned dumps: {:?}",
        jobs.iter().map(|j| j.file_name.as_str()).collect::<Vec<_>>()
    );

    let mut report = RunReport {
        expired,
        pruned,
        ..RunReport::default()
    };

    for job in jobs {
        match executor.execute(&job) {
            Ok(()) => report.completed.push(job),
            Err(e) => {
                error!(filesystem = %job.filesystem, "{e}");
                report.failed.push((job, e));
            }
        }
    }

    info!(
        completed = report.completed.len(),
        failed = report.failed.len(),
        "Run finished"
    );
    Ok(report)
}
