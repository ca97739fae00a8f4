use super::value::ValueKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// System-level tags that control how an entry participates in prompt and
/// tool derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemTag {
    SystemPrompt,
    LlmRead,
    LlmWrite,
    ApplyTemplate,
}

/// Attributes of a stored entry.
///
/// `readonly` is intentionally not a field here: it is derived as
/// `!system_tags.contains(&SystemTag::LlmWrite)`, so the "readonly and
/// LlmWrite are mutually exclusive" invariant is true by construction
/// rather than something to validate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    pub value_type: ValueKind,
    #[serde(default)]
    pub system_tags: HashSet<SystemTag>,
    #[serde(default)]
    pub content_tags: HashSet<String>,
    pub content_type: Option<String>,
    #[serde(default)]
    pub z_index: i64,
    #[serde(default)]
    pub protected: bool,
}

impl Attributes {
    pub fn new(value_type: ValueKind) -> Self {
        Self {
            value_type,
            system_tags: HashSet::new(),
            content_tags: HashSet::new(),
            content_type: None,
            z_index: 0,
            protected: false,
        }
    }

    pub fn is_readonly(&self) -> bool {
        !self.system_tags.contains(&SystemTag::LlmWrite)
    }

    pub fn is_protected(&self) -> bool {
        self.protected
    }

    pub fn is_system_prompt(&self) -> bool {
        self.system_tags.contains(&SystemTag::SystemPrompt)
    }
}

/// Write provenance and ordering metadata kept alongside an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMeta {
    pub last_writer: String,
    pub revision: u64,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// A stored key/value pair together with its attributes and tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub value: super::value::Value,
    pub attributes: Attributes,
    #[serde(default)]
    pub tags: HashSet<String>,
    pub meta: EntryMeta,
}
