//! Nodes, roles and environments: update, falling back to create.

use super::outcome::{classify, ComponentReport, JobResult, Outcome};
use super::Restorer;
use crate::api::{ApiError, ChefApi, EntityKind};
use crate::backup::Artifact;
use crate::component::ComponentKind;
use crate::loader::{load_document, string_field, LoadOptions};
use crate::utils::errors::Result;
use std::sync::Arc;
use tracing::info;

pub(super) async fn restore<A: ChefApi>(
    restorer: &Restorer<A>,
    component: ComponentKind,
    kind: EntityKind,
) -> Result<ComponentReport> {
    info!("=== Restoring {} ===", component);

    let artifacts = restorer.backup.json_files(component)?;
    let api = Arc::clone(&restorer.api);

    let results = restorer
        .pool
        .run(artifacts, move |artifact| {
            let api = Arc::clone(&api);
            async move { Ok(restore_entity(api.as_ref(), kind, artifact).await) }
        })
        .await?;

    Ok(ComponentReport::new(component, results))
}

async fn restore_entity<A: ChefApi>(api: &A, kind: EntityKind, artifact: Artifact) -> JobResult {
    let thing = format!("{}[{}]", kind.label(), artifact.name);

    let outcome = match save(api, kind, &artifact).await {
        Ok(outcome) => outcome,
        Err(e) => classify(&thing, &e),
    };

    JobResult::new(thing, outcome)
}

async fn save<A: ChefApi>(api: &A, kind: EntityKind, artifact: &Artifact) -> Result<Outcome> {
    let document = load_document(&artifact.path, LoadOptions::typed(kind.json_class())).await?;
    let name = string_field(&document, "name").unwrap_or(&artifact.name);

    match api.update(kind, name, &document).await {
        Ok(()) => {
            info!("Updated {} from {}", kind.collection(), artifact.path.display());
            Ok(Outcome::Updated)
        }
        Err(ApiError::NotFound(_)) => {
            api.create(kind, &document).await?;
            info!("Created {} from {}", kind.collection(), artifact.path.display());
            Ok(Outcome::Created)
        }
        Err(e) => Err(e.into()),
    }
}
