//! Error types for the restore tool.

use crate::api::ApiError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("Component types {} are not valid.", .0.join(","))]
    InvalidComponents(Vec<String>),

    #[error("Error parsing JSON for: cookbook[{cookbook}]: {source}")]
    MetadataParse {
        cookbook: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid document {}: {reason}", path.display())]
    InvalidDocument { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Worker task failed: {0}")]
    Worker(String),
}

impl RestoreError {
    /// True for errors caused by a malformed artifact rather than the server.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            RestoreError::Parse { .. }
                | RestoreError::InvalidDocument { .. }
                | RestoreError::MetadataParse { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RestoreError>;
