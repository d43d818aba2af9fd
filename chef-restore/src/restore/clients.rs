//! Clients: recreate from the exported key material.

use super::outcome::{classify, ComponentReport, JobResult, Outcome};
use super::Restorer;
use crate::api::{ChefApi, ClientPayload};
use crate::backup::Artifact;
use crate::component::ComponentKind;
use crate::loader::{load_document, LoadOptions};
use crate::utils::errors::Result;
use std::sync::Arc;
use tracing::info;

pub(super) async fn restore<A: ChefApi>(restorer: &Restorer<A>) -> Result<ComponentReport> {
    info!("=== Restoring clients ===");

    let artifacts = restorer.backup.json_files(ComponentKind::Clients)?;
    let api = Arc::clone(&restorer.api);

    let results = restorer
        .pool
        .run(artifacts, move |artifact| {
            let api = Arc::clone(&api);
            async move { Ok(restore_client(api.as_ref(), artifact).await) }
        })
        .await?;

    Ok(ComponentReport::new(ComponentKind::Clients, results))
}

async fn restore_client<A: ChefApi>(api: &A, artifact: Artifact) -> JobResult {
    let thing = format!("client[{}]", artifact.name);

    let outcome = match create(api, &artifact).await {
        Ok(()) => {
            info!("Created client from {}", artifact.path.display());
            Outcome::Created
        }
        Err(e) => classify(&thing, &e),
    };

    JobResult::new(thing, outcome)
}

async fn create<A: ChefApi>(api: &A, artifact: &Artifact) -> Result<()> {
    let document = load_document(&artifact.path, LoadOptions::raw()).await?;
    api.create_client(&ClientPayload::from_document(&document)).await?;
    Ok(())
}
