//! Users: recreate with a placeholder password.

use super::outcome::{classify, ComponentReport, JobResult, Outcome};
use super::Restorer;
use crate::api::{ChefApi, UserPayload, UserRecord};
use crate::backup::Artifact;
use crate::component::ComponentKind;
use crate::loader::load_record;
use crate::utils::errors::Result;
use std::sync::Arc;
use tracing::{info, warn};

pub(super) async fn restore<A: ChefApi>(restorer: &Restorer<A>) -> Result<ComponentReport> {
    info!("=== Restoring users ===");

    let artifacts = restorer.backup.json_files(ComponentKind::Users)?;
    if !artifacts.is_empty() {
        warn!("Restored users get a placeholder password and must reset it");
    }

    let api = Arc::clone(&restorer.api);
    let password: Arc<str> = Arc::from(restorer.options.user_password.as_str());

    let results = restorer
        .pool
        .run(artifacts, move |artifact| {
            let api = Arc::clone(&api);
            let password = Arc::clone(&password);
            async move { Ok(restore_user(api.as_ref(), artifact, &password).await) }
        })
        .await?;

    Ok(ComponentReport::new(ComponentKind::Users, results))
}

async fn restore_user<A: ChefApi>(api: &A, artifact: Artifact, password: &str) -> JobResult {
    let mut thing = format!("user[{}]", artifact.name);

    let outcome = match load_record::<UserRecord>(&artifact.path).await {
        Ok(record) => {
            thing = format!("user[{}]", record.username);
            info!("Restoring {}", thing);
            match api.create_user(&UserPayload::from_record(record, password)).await {
                Ok(()) => Outcome::Created,
                Err(e) => classify(&thing, &e.into()),
            }
        }
        Err(e) => classify(&thing, &e),
    };

    JobResult::new(thing, outcome)
}
