use serde::{Deserialize, Serialize};

/// The kind of binary payload an entry carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryKind {
    Image,
    File,
}

/// The discriminant of a [`Value`], stored on [`Attributes`](crate::Attributes)
/// so callers can inspect an entry's kind without cloning its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Text,
    Json,
    Binary,
    Document,
}

/// The value stored under a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Value {
    Text(String),
    Json(serde_json::Value),
    Binary {
        data: Vec<u8>,
        content_type: String,
        kind: BinaryKind,
    },
    /// The current materialization of a document-kind entry. The
    /// replicated structure itself lives in the document CRDT; this is the
    /// cached projection a plain reader sees.
    Document(String),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Text(_) => ValueKind::Text,
            Value::Json(_) => ValueKind::Json,
            Value::Binary { .. } => ValueKind::Binary,
            Value::Document(_) => ValueKind::Document,
        }
    }

    /// Render for template expansion / system-prompt inclusion.
    pub fn render(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Json(v) => v.to_string(),
            Value::Document(s) => s.clone(),
            Value::Binary {
                content_type, data, kind,
            } => format!("[{:?} {}, {} bytes]", kind, content_type, data.len()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Document(s) => Some(s),
            _ => None,
        }
    }
}
