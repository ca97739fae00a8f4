use serde::{Deserialize, Serialize};

/// How the adapter proves its identity in the `auth` frame. Mirrors the
/// registry's `Credential` shape on the wire without depending on
/// `mindcache-registry` (the client never touches the registry directly).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Credential {
    Bearer { token: String },
    Delegate { delegate_id: String, secret: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated,
}
