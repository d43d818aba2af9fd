//! Cookbooks: stage each backup directory under its logical name and upload it.

use super::outcome::{classify, ComponentReport, JobResult, Outcome};
use super::Restorer;
use crate::api::ChefApi;
use crate::backup::Artifact;
use crate::component::ComponentKind;
use crate::cookbook::{logical_name, Cookbook};
use crate::utils::errors::{RestoreError, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, error, info};

pub(super) async fn restore<A: ChefApi>(restorer: &Restorer<A>) -> Result<ComponentReport> {
    info!("=== Restoring cookbooks ===");

    let artifacts = restorer.backup.cookbooks()?;
    let api = Arc::clone(&restorer.api);
    let ignore_metadata_errors = restorer.options.ignore_metadata_errors;

    let results = restorer
        .pool
        .run(artifacts, move |artifact| {
            let api = Arc::clone(&api);
            async move { restore_cookbook(api.as_ref(), artifact, ignore_metadata_errors).await }
        })
        .await?;

    let report = ComponentReport::new(ComponentKind::Cookbooks, results);
    info!(confirmed = report.succeeded(), "Uploaded {} Cookbooks", report.dispatched());
    Ok(report)
}

/// Only a metadata parse error with `ignore_metadata_errors` unset escapes as `Err`.
async fn restore_cookbook<A: ChefApi>(
    api: &A,
    artifact: Artifact,
    ignore_metadata_errors: bool,
) -> Result<JobResult> {
    let thing = format!("cookbook[{}]", artifact.name);

    let outcome = match upload(api, &artifact).await {
        Ok(()) => Outcome::Uploaded,
        Err(e @ RestoreError::MetadataParse { .. }) => {
            error!("Error parsing JSON for: {}", thing);
            if !ignore_metadata_errors {
                return Err(e);
            }
            Outcome::Skipped(e.to_string())
        }
        Err(e) => classify(&thing, &e),
    };

    Ok(JobResult::new(thing, outcome))
}

async fn upload<A: ChefApi>(api: &A, artifact: &Artifact) -> Result<()> {
    let name = logical_name(&artifact.name);
    // Removed when dropped at the end of this job, whatever the outcome.
    let (_staging, staged) = stage(&artifact.path, &artifact.name, name)?;

    info!("Restoring cookbook {}", name);
    let cookbook = Cookbook::load(&staged, &artifact.name).await?;
    api.upload_cookbook(&cookbook).await?;

    Ok(())
}

/// Expose `source` inside a fresh temporary directory at a path ending in `name`.
pub(crate) fn stage(source: &Path, dir_name: &str, name: &str) -> io::Result<(TempDir, PathBuf)> {
    let staging = tempfile::Builder::new().prefix("chef-restore-").tempdir()?;
    let source = std::fs::canonicalize(source)?;

    #[cfg(unix)]
    let staged = {
        let staged = staging.path().join(name);
        std::os::unix::fs::symlink(&source, &staged)?;
        staged
    };

    #[cfg(not(unix))]
    let staged = {
        let parent = staging.path().join(dir_name);
        std::fs::create_dir(&parent)?;
        let staged = parent.join(name);
        crate::fs::copy_tree(&source, &staged)?;
        staged
    };

    debug!(cookbook = dir_name, staged = %staged.display(), "Staged cookbook");
    Ok((staging, staged))
}
