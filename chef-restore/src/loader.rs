//! Loads backed-up entity documents.
//!
//! Every call carries its own [`LoadOptions`]; there is no process-wide JSON
//! setting deciding whether `json_class` hints are honoured.

use crate::utils::errors::{RestoreError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;

/// Per-call deserializer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    expected_class: Option<&'static str>,
}

impl LoadOptions {
    /// Treat `json_class` as an ordinary field.
    pub fn raw() -> Self {
        Self {
            expected_class: None,
        }
    }

    /// Require a present `json_class` hint to name `class`.
    pub fn typed(class: &'static str) -> Self {
        Self {
            expected_class: Some(class),
        }
    }
}

/// Read and parse a JSON object document.
pub async fn load_document(path: &Path, options: LoadOptions) -> Result<Value> {
    let content = tokio::fs::read_to_string(path).await?;
    parse_document(path, &content, options)
}

/// Read a document into a typed record.
pub async fn load_record<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let document = load_document(path, LoadOptions::raw()).await?;
    serde_json::from_value(document).map_err(|source| RestoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_document(path: &Path, content: &str, options: LoadOptions) -> Result<Value> {
    let document: Value = serde_json::from_str(content).map_err(|source| RestoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    if !document.is_object() {
        return Err(RestoreError::InvalidDocument {
            path: path.to_path_buf(),
            reason: "expected a JSON object".to_string(),
        });
    }

    if let Some(expected) = options.expected_class {
        if let Some(found) = document.get("json_class").and_then(Value::as_str) {
            if found != expected {
                return Err(RestoreError::InvalidDocument {
                    path: path.to_path_buf(),
                    reason: format!("expected json_class {expected}, found {found}"),
                });
            }
        }
    }

    Ok(document)
}

/// String field `key` of a document, if present and non-empty.
pub fn string_field<'a>(document: &'a Value, key: &str) -> Option<&'a str> {
    document
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}
