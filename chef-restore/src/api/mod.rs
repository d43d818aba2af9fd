//! Chef server API client.
//!
//! [`ChefApi`] is the seam between the restore orchestrator and the server;
//! [`HttpChefApi`] talks to a real server over HTTP.

#[cfg(test)]
pub(crate) mod fake;
pub mod http;
pub mod payload;

pub use http::HttpChefApi;
pub use payload::{ClientPayload, UserPayload, UserRecord};

use crate::cookbook::Cookbook;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Entities restored with update-then-create semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Node,
    Role,
    Environment,
}

impl EntityKind {
    /// API collection path, also the backup directory name
    pub fn collection(self) -> &'static str {
        match self {
            EntityKind::Node => "nodes",
            EntityKind::Role => "roles",
            EntityKind::Environment => "environments",
        }
    }

    /// Singular label used in log lines
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Node => "node",
            EntityKind::Role => "role",
            EntityKind::Environment => "environment",
        }
    }

    /// Class hint carried by exported documents
    pub fn json_class(self) -> &'static str {
        match self {
            EntityKind::Node => "Chef::Node",
            EntityKind::Role => "Chef::Role",
            EntityKind::Environment => "Chef::Environment",
        }
    }
}

/// Failure of a single API call, classified by HTTP status
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("404 Not Found: {0}")]
    NotFound(String),

    #[error("409 Conflict: {0}")]
    Conflict(String),

    #[error("{status} {body}")]
    Client { status: u16, body: String },

    #[error("{status} {body}")]
    Server { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("local I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Classify a non-success response
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            404 => ApiError::NotFound(body),
            409 => ApiError::Conflict(body),
            400..=499 => ApiError::Client { status, body },
            _ => ApiError::Server { status, body },
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Remote operations needed to restore a backup
#[async_trait]
pub trait ChefApi: Send + Sync + 'static {
    /// Replace an existing node, role or environment
    async fn update(&self, kind: EntityKind, name: &str, body: &Value) -> ApiResult<()>;

    /// Create a node, role or environment
    async fn create(&self, kind: EntityKind, body: &Value) -> ApiResult<()>;

    /// Create an empty data bag
    async fn create_data_bag(&self, name: &str) -> ApiResult<()>;

    async fn update_data_bag_item(&self, bag: &str, id: &str, body: &Value) -> ApiResult<()>;

    async fn create_data_bag_item(&self, bag: &str, body: &Value) -> ApiResult<()>;

    async fn create_client(&self, payload: &ClientPayload) -> ApiResult<()>;

    async fn create_user(&self, payload: &UserPayload) -> ApiResult<()>;

    /// Upload every file of a cookbook and register the version.
    /// Dependencies are not checked.
    async fn upload_cookbook(&self, cookbook: &Cookbook) -> ApiResult<()>;
}
