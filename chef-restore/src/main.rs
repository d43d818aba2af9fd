//! Chef Restore - Main entry point
//!
//! Restores a Chef server backup onto a live server.

use anyhow::Result;
use chef_restore::{
    api::HttpChefApi, backup::BackupDir, config::Config, utils, ComponentKind, RestoreError,
    RestoreOptions, Restorer,
};
use chrono::{Duration, Utc};
use clap::Parser;
use dialoguer::Confirm;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Components to restore: clients, users, nodes, roles, data_bags,
    /// environments, cookbooks (default: all)
    #[arg(value_name = "COMPONENT")]
    components: Vec<String>,

    /// Restore backup data from DIR
    #[arg(short = 'D', long = "backup-directory", value_name = "DIR")]
    backup_dir: Option<PathBuf>,

    /// Ignore json metadata errors when restoring cookbooks
    #[arg(short = 'I', long)]
    ignore_metadata_errors: bool,

    /// The number of concurrent connections
    #[arg(short = 'C', long, value_name = "NUM_PROCS")]
    concurrency: Option<usize>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load(args.config.as_deref())?;

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    let mut options = RestoreOptions::from(&config.restore);
    if let Some(dir) = args.backup_dir {
        options.backup_dir = dir;
    }
    if let Some(concurrency) = args.concurrency {
        options.concurrency = concurrency;
    }
    options.ignore_metadata_errors |= args.ignore_metadata_errors;

    tracing::info!(
        "Starting chef-restore v{} (server: {}, backup: {})",
        env!("CARGO_PKG_VERSION"),
        config.server.url,
        options.backup_dir.display()
    );

    let kinds = match ComponentKind::parse_all(&args.components) {
        Ok(kinds) => kinds,
        Err(e @ RestoreError::InvalidComponents(_)) => {
            tracing::error!("{}", e);
            return Ok(ExitCode::from(1));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::warn!("This will overwrite existing data!");
    let backup = BackupDir::new(&options.backup_dir);
    match backup.is_older_than(Duration::days(1), Utc::now()) {
        Ok(true) => tracing::warn!("Backup is at least 1 day old"),
        Ok(false) => {}
        Err(e) => {
            tracing::error!("Cannot read backup directory {}: {}", backup.root().display(), e);
            return Ok(ExitCode::from(1));
        }
    }

    if !args.yes
        && !Confirm::new()
            .with_prompt("Do you want to restore backup, possibly overwriting existing data")
            .default(false)
            .interact()?
    {
        tracing::info!("Restore cancelled");
        return Ok(ExitCode::from(3));
    }

    let api = HttpChefApi::new(&config.server)?;
    let restorer = Restorer::new(Arc::new(api), options);

    match restorer.run(&kinds).await {
        Ok(report) => {
            report.log_summary();
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!("Restore aborted: {}", e);
            Ok(ExitCode::from(1))
        }
    }
}
