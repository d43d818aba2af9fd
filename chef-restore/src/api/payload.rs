//! Request bodies for client and user creation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /clients`. Only these four fields of an exported client
/// are sent; anything else in the backup is dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientPayload {
    pub name: Value,
    pub public_key: Value,
    pub admin: Value,
    pub validator: Value,
}

impl ClientPayload {
    pub fn from_document(document: &Value) -> Self {
        let field = |key: &str| document.get(key).cloned().unwrap_or(Value::Null);

        Self {
            name: field("name"),
            public_key: field("public_key"),
            admin: field("admin"),
            validator: field("validator"),
        }
    }
}

/// An exported user
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub display_name: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub public_key: Option<String>,
}

/// Body of `POST /users`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserPayload {
    pub username: String,
    pub display_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub password: String,
}

impl UserPayload {
    /// Exported users carry no password, so every user gets `password`.
    pub fn from_record(record: UserRecord, password: &str) -> Self {
        Self {
            username: record.username,
            display_name: record.display_name,
            first_name: record.first_name,
            last_name: record.last_name,
            email: record.email,
            public_key: record.public_key,
            middle_name: record.middle_name,
            password: password.to_string(),
        }
    }
}
