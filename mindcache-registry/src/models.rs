use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub subject_id: String,
    pub profile_json: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub owner_user_id: String,
    pub parent_instance_id: Option<String>,
    pub readonly: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegate {
    pub id: String,
    pub owner_user_id: String,
    pub secret_hash: String,
    pub capabilities: Vec<PermissionLevel>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// The three checks the authority performs per §4.3.4: read, write, and
/// system (attribute/protected-entry management).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    Read,
    Write,
    System,
}

/// Credentials a client presents in the wire protocol's `auth` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Credential {
    Bearer { token: String },
    Delegate { delegate_id: String, secret: String },
}
