//! xfsdump-rotate - Main entry point
//!
//! Meant to be run from cron: expires stale dumps, then takes the next
//! incremental dump of every configured filesystem.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, warn};
use xfsdump_rotate::commands;
use xfsdump_rotate::executor::XfsdumpExecutor;
use xfsdump_rotate::mounts::MountTable;
use xfsdump_rotate::retention::RemovalMode;
use xfsdump_rotate::store::{KeyValueStore, TomlFileStore};
use xfsdump_rotate::{utils, Config, RotateError, Settings};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Interactive configuration, FILESYSTEM arguments become the backup targets
    #[arg(short = 'c', long)]
    configure: bool,

    /// Path to the configuration store (default: next to the executable)
    #[arg(long, value_name = "FILE")]
    store: Option<PathBuf>,

    /// Delete expired dumps instead of only listing them
    #[arg(long)]
    delete: bool,

    /// Log dump commands and expired dumps without running or deleting anything
    #[arg(short = 'n', long, conflicts_with = "delete")]
    dry_run: bool,

    /// Candidate filesystems for configuration mode
    #[arg(value_name = "FILESYSTEM")]
    filesystems: Vec<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Settings carry the log level, so they load before logging exists.
    let settings = Settings::load();
    let configured_level = settings
        .as_ref()
        .map(|s| s.log_level.as_str())
        .unwrap_or("info");
    if let Err(e) = utils::logger::init(utils::logger::effective_level(args.verbose, configured_level)) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let result = settings
        .map_err(anyhow::Error::from)
        .and_then(|settings| run(args, settings));

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

/// Returns whether every dump succeeded.
fn run(args: Args, mut settings: Settings) -> Result<bool> {
    if args.delete {
        settings.delete_expired = true;
    }

    let store_path = match args.store {
        Some(path) => path,
        None => TomlFileStore::default_path()?,
    };
    debug!("Opening configuration store: {}", store_path.display());
    let mut store = TomlFileStore::open(&store_path)
        .with_context(|| format!("failed to open configuration store {}", store_path.display()))?;

    if args.configure {
        let host_name = commands::configure::local_short_host_name()?;
        let mounts = MountTable::load()?;
        let stdin = std::io::stdin();
        commands::execute_configure(
            &mut store,
            &mut stdin.lock(),
            &mut std::io::stdout(),
            &host_name,
            &args.filesystems,
            &mounts,
            &settings,
        )?;
    } else if !args.filesystems.is_empty() {
        warn!(
            "Ignoring filesystem arguments outside configuration mode: {:?}",
            args.filesystems
        );
    }

    let config = match Config::load(&store) {
        Ok(config) => config,
        Err(e @ RotateError::MissingKey(_)) => {
            debug!("Configuration store keys: {:?}", store.keys());
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };
    debug!(
        backup_dir = %config.backup_dir.display(),
        host = %config.host_name,
        filesystems = ?config.backup_filesystems,
        "Running with configuration"
    );

    // Resolve programs before anything is deleted or dumped.
    let executor = XfsdumpExecutor::resolve(&settings, args.dry_run)?;

    let mode = if args.dry_run {
        RemovalMode::DryRun
    } else {
        settings.removal_mode()
    };

    let report = commands::execute_run(&config, &settings.retention_policy(), mode, &executor)?;
    Ok(report.is_success())
}
