//! The wire message taxonomy (§4.3.2): JSON text frames for control
//! messages, a binary frame for `doc_update`'s opaque CRDT delta.

use mindcache_core::{errors::ErrorKind, Attributes, EntryKey, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Auth { credential: serde_json::Value },
    Set {
        key: String,
        value: Value,
        attributes: Option<Attributes>,
    },
    Delete { key: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    AuthSuccess { snapshot: serde_json::Value },
    AuthFailure { reason: String },
    Sync { snapshot: serde_json::Value },
    Set {
        key: String,
        value: Value,
        attributes: Attributes,
        revision: u64,
    },
    Delete { key: String, revision: u64 },
    Error {
        kind: ErrorKind,
        message: String,
        /// The key the rejected operation targeted, when there was one, so
        /// the client can roll back just that key's local mutation rather
        /// than treating every in-flight write as suspect.
        key: Option<String>,
    },
}

/// `doc_update` is carried as a binary frame rather than JSON; this struct
/// is how the in-process layers refer to it, not what goes over the wire
/// (the wire payload is just the CRDT's own opaque bytes, tagged with the
/// key and instance out of band by the frame's routing).
#[derive(Debug, Clone)]
pub struct DocUpdate {
    pub key: EntryKey,
    pub op_bytes: Vec<u8>,
}
