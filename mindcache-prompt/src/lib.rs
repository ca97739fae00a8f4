//! Pure derivation of an LLM system prompt and tool descriptors from store
//! state. Nothing in this crate performs I/O; `execute_tool` is the only
//! function that mutates anything, and it mutates the `&mut Store` it's
//! handed.

use mindcache_core::errors::StoreError;
use mindcache_core::{Attributes, EntryKey, SystemTag, Value};
use mindcache_store::Store;
use serde::{Deserialize, Serialize};

/// Which set of tools to derive: `Edit` exposes the key-management tools
/// alongside per-key writers, `Use` exposes only the per-key writers an
/// agent would call at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolMode {
    Edit,
    Use,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolCall {
    Write { key: String, value: serde_json::Value },
    CreateKey { key: String, value: serde_json::Value },
    DeleteKey { key: String },
    SetAttributes { key: String, attributes: Attributes },
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("tool call referenced unknown key: {0}")]
    UnknownKey(String),
}

/// Renders the entries tagged `SystemPrompt`, ordered by `(z_index, key)`,
/// each as `"key: value"` after template expansion.
pub fn render_system_prompt(store: &Store) -> String {
    let mut rows: Vec<(i64, EntryKey, String)> = store
        .keys()
        .into_iter()
        .filter_map(|key| {
            let attrs = store.get_attributes(key.as_str())?;
            if !attrs.is_system_prompt() {
                return None;
            }
            let value = store.get(key.as_str())?;
            Some((attrs.z_index, key, value.render()))
        })
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    rows.into_iter()
        .map(|(_, key, rendered)| format!("{}: {}", key.as_str(), rendered))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Derives the tool descriptors an LLM should be offered for the given
/// mode.
pub fn derive_tools(store: &Store, mode: ToolMode) -> Vec<ToolDescriptor> {
    let mut tools = Vec::new();
    if mode == ToolMode::Edit {
        tools.push(ToolDescriptor {
            name: "create_key".to_string(),
            description: "Create a new entry in the store.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": { "key": {"type": "string"}, "value": {} },
                "required": ["key", "value"],
            }),
        });
        tools.push(ToolDescriptor {
            name: "delete_key".to_string(),
            description: "Delete an entry from the store.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": { "key": {"type": "string"} },
                "required": ["key"],
            }),
        });
        tools.push(ToolDescriptor {
            name: "set_attributes".to_string(),
            description: "Set the attributes of an existing entry.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": { "key": {"type": "string"}, "attributes": {} },
                "required": ["key", "attributes"],
            }),
        });
    }

    for key in store.keys() {
        let Some(attrs) = store.get_attributes(key.as_str()) else {
            continue;
        };
        if !attrs.system_tags.contains(&SystemTag::LlmWrite) {
            continue;
        }
        if mode == ToolMode::Use && attrs.is_system_prompt() {
            continue;
        }
        if mode == ToolMode::Use && attrs.is_readonly() {
            continue;
        }
        tools.push(ToolDescriptor {
            name: format!("write_{}", key.as_str()),
            description: format!("Write a new value for '{}'.", key.as_str()),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": { "value": {} },
                "required": ["value"],
            }),
        });
    }
    tools
}

/// Executes a tool call an LLM requested. JSON-kind tool input is parsed
/// before storage.
pub fn execute_tool(store: &mut Store, call: ToolCall) -> Result<Value, ToolError> {
    match call {
        ToolCall::Write { key, value } => {
            let value = Value::Json(value);
            store.set(&key, value.clone(), None)?;
            Ok(value)
        }
        ToolCall::CreateKey { key, value } => {
            let value = Value::Json(value);
            store.set(&key, value.clone(), None)?;
            Ok(value)
        }
        ToolCall::DeleteKey { key } => {
            store.delete(&key)?;
            Ok(Value::Text(String::new()))
        }
        ToolCall::SetAttributes { key, attributes } => {
            store.set_attributes(&key, attributes)?;
            store
                .get(&key)
                .ok_or_else(|| ToolError::UnknownKey(key.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindcache_core::{StoreConfig, ValueKind};

    fn store_with_prompt_entry() -> Store {
        let mut store = Store::new(StoreConfig::default(), "tester");
        store.set("greeting", Value::Text("hello".into()), None).unwrap();
        let mut attrs = Attributes::new(ValueKind::Text);
        attrs.system_tags.insert(SystemTag::SystemPrompt);
        attrs.z_index = 1;
        store.set_attributes("greeting", attrs).unwrap();
        store
    }

    #[test]
    fn system_prompt_includes_tagged_entries() {
        let store = store_with_prompt_entry();
        let prompt = render_system_prompt(&store);
        assert_eq!(prompt, "greeting: hello");
    }

    #[test]
    fn ordering_follows_z_index_then_key() {
        let mut store = Store::new(StoreConfig::default(), "tester");
        for (key, z) in [("b", 0), ("a", 0), ("c", -1)] {
            store.set(key, Value::Text(key.into()), None).unwrap();
            let mut attrs = Attributes::new(ValueKind::Text);
            attrs.system_tags.insert(SystemTag::SystemPrompt);
            attrs.z_index = z;
            store.set_attributes(key, attrs).unwrap();
        }
        let prompt = render_system_prompt(&store);
        assert_eq!(prompt, "c: c\na: a\nb: b");
    }

    #[test]
    fn edit_mode_always_includes_key_management_tools() {
        let store = Store::new(StoreConfig::default(), "tester");
        let tools = derive_tools(&store, ToolMode::Edit);
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert!(names.contains(&"create_key"));
        assert!(names.contains(&"delete_key"));
        assert!(names.contains(&"set_attributes"));
    }

    #[test]
    fn use_mode_excludes_readonly_entries() {
        let mut store = Store::new(StoreConfig::default(), "tester");
        store.set("readonly_key", Value::Text("x".into()), None).unwrap();
        let tools = derive_tools(&store, ToolMode::Use);
        assert!(tools.iter().all(|t| t.name != "write_readonly_key"));
    }

    #[test]
    fn use_mode_includes_writable_entries() {
        let mut store = Store::new(StoreConfig::default(), "tester");
        store.set("notes", Value::Text("x".into()), None).unwrap();
        let mut attrs = Attributes::new(ValueKind::Text);
        attrs.system_tags.insert(SystemTag::LlmWrite);
        store.set_attributes("notes", attrs).unwrap();
        let tools = derive_tools(&store, ToolMode::Use);
        assert!(tools.iter().any(|t| t.name == "write_notes"));
    }
}
