//! Dump executor - Runs xfsdump for a planned dump.
//!
//! Executables are resolved up front so a missing `xfsdump` or `sudo` is
//! reported before the first filesystem is touched.

use crate::config::{Config, Settings};
use crate::dump::{allocate_dump_name, DumpLevel};
use crate::utils::{Result, RotateError};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{info, warn};

/// One dump to take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpJob {
    /// Directory receiving the dump file
    pub backup_dir: PathBuf,

    /// File name inside `backup_dir`
    pub file_name: String,

    pub level: DumpLevel,

    /// Mount point as configured, not reconstructed from the slug
    pub filesystem: String,
}

impl DumpJob {
    pub fn target_path(&self) -> PathBuf {
        self.backup_dir.join(&self.file_name)
    }
}

/// Plan one job per configured filesystem, in configuration order.
pub fn plan_dumps(config: &Config) -> Vec<DumpJob> {
    config
        .backup_filesystems
        .iter()
        .map(|filesystem| {
            let name = allocate_dump_name(&config.host_name, filesystem, &config.backup_dir);
            DumpJob {
                backup_dir: config.backup_dir.clone(),
                file_name: name.file_name(),
                level: name.level,
                filesystem: filesystem.clone(),
            }
        })
        .collect()
}

/// Something that can take a dump.
pub trait DumpExecutor {
    fn execute(&self, job: &DumpJob) -> Result<()>;
}

/// Runs the real xfsdump binary, through sudo unless already root.
#[derive(Debug, Clone)]
pub struct XfsdumpExecutor {
    elevate: Option<PathBuf>,
    dump: PathBuf,
    dry_run: bool,
}

fn resolve(program: &str) -> Result<PathBuf> {
    which::which(program).map_err(|source| RotateError::ToolNotFound {
        program: program.to_string(),
        source,
    })
}

fn running_as_root() -> bool {
    nix::unistd::Uid::effective().is_root()
}

impl XfsdumpExecutor {
    /// Locate the programs named in `settings`.
    ///
    /// In dry-run mode nothing is executed, so unresolved programs are only
    /// warned about and kept by name.
    pub fn resolve(settings: &Settings, dry_run: bool) -> Result<Self> {
        let lookup = |program: &str| match resolve(program) {
            Ok(path) => Ok(path),
            Err(e) if dry_run => {
                warn!("{e}");
                Ok(PathBuf::from(program))
            }
            Err(e) => Err(e),
        };

        let dump = lookup(&settings.dump_program)?;
        let elevate = if running_as_root() {
            None
        } else {
            Some(lookup(&settings.sudo_program)?)
        };

        Ok(Self {
            elevate,
            dump,
            dry_run,
        })
    }

    pub fn with_programs(elevate: Option<PathBuf>, dump: PathBuf, dry_run: bool) -> Self {
        Self {
            elevate,
            dump,
            dry_run,
        }
    }

    /// Full argument vector, program first.
    pub fn command_line(&self, job: &DumpJob) -> Vec<OsString> {
        let mut argv: Vec<OsString> = Vec::with_capacity(8);
        if let Some(elevate) = &self.elevate {
            argv.push(elevate.clone().into_os_string());
        }
        argv.push(self.dump.clone().into_os_string());
        argv.push("-F".into());
        argv.push("-f".into());
        argv.push(job.target_path().into_os_string());
        argv.push("-l".into());
        argv.push(job.level.to_string().into());
        argv.push(job.filesystem.clone().into());
        argv
    }

    fn spawn(&self, argv: &[OsString]) -> std::io::Result<std::process::ExitStatus> {
        let (program, args) = argv.split_first().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command line")
        })?;

        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
    }
}

fn display_command(argv: &[OsString]) -> String {
    argv.iter()
        .map(|arg| arg.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

impl DumpExecutor for XfsdumpExecutor {
    fn execute(&self, job: &DumpJob) -> Result<()> {
        let argv = self.command_line(job);
        let command = display_command(&argv);

        if self.dry_run {
            info!(filesystem = %job.filesystem, level = %job.level, "Would execute: {}", command);
            return Ok(());
        }

        info!(filesystem = %job.filesystem, level = %job.level, "Executing: {}", command);

        let status = self.spawn(&argv).map_err(|e| RotateError::DumpFailed {
            filesystem: job.filesystem.clone(),
            reason: format!("failed to start {}: {}", command, e),
        })?;

        if !status.success() {
            return Err(RotateError::DumpFailed {
                filesystem: job.filesystem.clone(),
                reason: format!("{} exited with {}", display_path(&self.dump), status),
            });
        }

        info!(path = %job.target_path().display(), "Dump complete");
        Ok(())
    }
}

fn display_path(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
