//! Job outcomes, error classification and run reports.

use crate::api::ApiError;
use crate::component::ComponentKind;
use crate::utils::errors::RestoreError;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Updated,
    Created,
    Uploaded,
    Skipped(String),
    Failed(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Updated | Outcome::Created | Outcome::Uploaded)
    }
}

/// Result of one restore job, e.g. `node[web1]` updated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub thing: String,
    pub outcome: Outcome,
}

impl JobResult {
    pub fn new(thing: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            thing: thing.into(),
            outcome,
        }
    }
}

/// Turn a per-job error into an outcome and report it.
///
/// Conflicts mean the entity already exists and are skipped; everything else
/// fails this job only.
pub(crate) fn classify(thing: &str, err: &RestoreError) -> Outcome {
    if err.is_parse_error() {
        error!("Error parsing JSON for: {}", thing);
        return Outcome::Failed(err.to_string());
    }

    match err {
        RestoreError::Api(ApiError::Conflict(_)) => {
            warn!("{} already exists; skipping", thing);
            Outcome::Skipped("already exists".to_string())
        }
        RestoreError::Api(e) => {
            error!("Failed to create {}: {}; skipping", thing, e);
            Outcome::Failed(e.to_string())
        }
        other => {
            error!("Failed to restore {}: {}; skipping", thing, other);
            Outcome::Failed(other.to_string())
        }
    }
}

/// Results for one component
#[derive(Debug, Clone)]
pub struct ComponentReport {
    pub kind: ComponentKind,
    pub results: Vec<JobResult>,
}

impl ComponentReport {
    pub fn new(kind: ComponentKind, results: Vec<JobResult>) -> Self {
        Self { kind, results }
    }

    /// Jobs that ran
    pub fn dispatched(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_success()).count()
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    pub fn outcome_of(&self, thing: &str) -> Option<&Outcome> {
        self.results
            .iter()
            .find(|r| r.thing == thing)
            .map(|r| &r.outcome)
    }

    fn count(&self, predicate: impl Fn(&Outcome) -> bool) -> usize {
        self.results.iter().filter(|r| predicate(&r.outcome)).count()
    }
}

/// Results of a whole run, in restore order
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub components: Vec<ComponentReport>,
}

impl RunReport {
    pub fn component(&self, kind: ComponentKind) -> Option<&ComponentReport> {
        self.components.iter().find(|c| c.kind == kind)
    }

    pub fn failed(&self) -> usize {
        self.components.iter().map(ComponentReport::failed).sum()
    }

    pub fn log_summary(&self) {
        for component in &self.components {
            info!(
                component = %component.kind,
                processed = component.dispatched(),
                succeeded = component.succeeded(),
                skipped = component.skipped(),
                failed = component.failed(),
                "Restore summary"
            );
        }
        if self.failed() > 0 {
            warn!("{} items failed to restore", self.failed());
        }
    }
}
