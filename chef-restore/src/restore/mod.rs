//! Restore orchestrator.
//!
//! For each requested component the artifacts of the backup directory are
//! listed, restored through a [`WorkerPool`], and collected into a report.
//! Per-item failures are logged and recorded; only an unparseable cookbook
//! metadata file (unless ignored) ends the run early.

mod clients;
mod cookbooks;
mod data_bags;
mod outcome;
mod standard;
mod users;

pub use outcome::{ComponentReport, JobResult, Outcome, RunReport};

use crate::api::{ChefApi, EntityKind};
use crate::backup::BackupDir;
use crate::component::ComponentKind;
use crate::pool::WorkerPool;
use crate::utils::errors::Result;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct RestoreOptions {
    pub backup_dir: PathBuf,
    pub concurrency: usize,
    pub ignore_metadata_errors: bool,
    pub user_password: String,
}

impl From<&crate::config::RestoreConfig> for RestoreOptions {
    fn from(config: &crate::config::RestoreConfig) -> Self {
        Self {
            backup_dir: config.backup_dir.clone(),
            concurrency: config.concurrency,
            ignore_metadata_errors: config.ignore_metadata_errors,
            user_password: config.user_password.clone(),
        }
    }
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self::from(&crate::config::RestoreConfig::default())
    }
}

pub struct Restorer<A> {
    api: Arc<A>,
    options: RestoreOptions,
    backup: BackupDir,
    pool: WorkerPool,
}

impl<A: ChefApi> Restorer<A> {
    pub fn new(api: Arc<A>, options: RestoreOptions) -> Self {
        Self {
            api,
            backup: BackupDir::new(&options.backup_dir),
            pool: WorkerPool::new(options.concurrency),
            options,
        }
    }

    /// Restore `kinds` in the given order.
    pub async fn run(&self, kinds: &[ComponentKind]) -> Result<RunReport> {
        let mut report = RunReport::default();

        for &kind in kinds {
            let component = self.restore_component(kind).await?;
            report.components.push(component);
        }

        Ok(report)
    }

    pub async fn restore_component(&self, kind: ComponentKind) -> Result<ComponentReport> {
        match kind {
            ComponentKind::Clients => clients::restore(self).await,
            ComponentKind::Users => users::restore(self).await,
            ComponentKind::Nodes => standard::restore(self, kind, EntityKind::Node).await,
            ComponentKind::Roles => standard::restore(self, kind, EntityKind::Role).await,
            ComponentKind::DataBags => data_bags::restore(self).await,
            ComponentKind::Environments => {
                standard::restore(self, kind, EntityKind::Environment).await
            }
            ComponentKind::Cookbooks => cookbooks::restore(self).await,
        }
    }
}
