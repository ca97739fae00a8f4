//! Markdown import/export.
//!
//! Each entry renders as a `## key` heading, a fenced `attributes` block
//! holding its JSON-encoded [`Attributes`], and a fenced block holding the
//! value. Binary values are base64-encoded inside their fence so the whole
//! document stays plain text.

use mindcache_core::{Attributes, BinaryKind, Entry, EntryKey, EntryMeta, Value, ValueKind};
use std::collections::HashMap;

pub fn to_markdown(instance_name: &str, entries: &HashMap<EntryKey, Entry>) -> String {
    let mut keys: Vec<&EntryKey> = entries.keys().collect();
    keys.sort();
    let mut out = format!("# MindCache {instance_name}\n\n");
    for key in keys {
        let entry = &entries[key];
        out.push_str(&format!("## {}\n\n", key.as_str()));
        out.push_str("```attributes\n");
        out.push_str(&serde_json::to_string(&entry.attributes).unwrap_or_default());
        out.push_str("\n```\n\n");
        out.push_str("```value\n");
        out.push_str(&render_value(&entry.value));
        out.push_str("\n```\n\n");
    }
    out
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Text(s) => s.clone(),
        Value::Document(s) => s.clone(),
        Value::Json(v) => serde_json::to_string_pretty(v).unwrap_or_default(),
        Value::Binary {
            data,
            content_type,
            kind,
        } => {
            use base64::Engine;
            let encoded = base64::engine::general_purpose::STANDARD.encode(data);
            let kind_str = match kind {
                BinaryKind::Image => "image",
                BinaryKind::File => "file",
            };
            format!("data:{content_type};{kind_str};base64,{encoded}")
        }
    }
}

pub fn from_markdown(text: &str) -> Vec<(EntryKey, Entry)> {
    let mut result = Vec::new();
    let lines: Vec<&str> = text.lines().collect();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if let Some(key_str) = line.strip_prefix("## ") {
            let key_str = key_str.trim().to_string();
            i += 1;
            let attrs_block = read_fence(&lines, &mut i, "attributes");
            let value_block = read_fence(&lines, &mut i, "value");
            let Some(key) = EntryKey::new(key_str).ok() else {
                continue;
            };
            let attributes: Attributes = match attrs_block.and_then(|b| serde_json::from_str(&b).ok()) {
                Some(a) => a,
                None => Attributes::new(ValueKind::Text),
            };
            let value = parse_value(attributes.value_type, value_block.unwrap_or_default());
            let entry = Entry {
                value,
                attributes,
                tags: Default::default(),
                meta: EntryMeta {
                    last_writer: "import".to_string(),
                    revision: 0,
                    updated_at: chrono::Utc::now(),
                },
            };
            result.push((key, entry));
            continue;
        }
        i += 1;
    }
    result
}

fn read_fence(lines: &[&str], i: &mut usize, _label: &str) -> Option<String> {
    while *i < lines.len() && lines[*i].trim().is_empty() {
        *i += 1;
    }
    if *i >= lines.len() || !lines[*i].starts_with("```") {
        return None;
    }
    *i += 1;
    let start = *i;
    while *i < lines.len() && lines[*i] != "```" {
        *i += 1;
    }
    let body = lines[start..*i].join("\n");
    if *i < lines.len() {
        *i += 1;
    }
    Some(body)
}

fn parse_value(kind: ValueKind, body: String) -> Value {
    match kind {
        ValueKind::Text => Value::Text(body),
        ValueKind::Document => Value::Document(body),
        ValueKind::Json => Value::Json(serde_json::from_str(&body).unwrap_or(serde_json::Value::Null)),
        ValueKind::Binary => parse_data_url(&body),
    }
}

fn parse_data_url(body: &str) -> Value {
    use base64::Engine;
    let rest = body.strip_prefix("data:").unwrap_or(body);
    let mut parts = rest.splitn(3, ';');
    let content_type = parts.next().unwrap_or("application/octet-stream").to_string();
    let kind_str = parts.next().unwrap_or("file");
    let b64 = parts
        .next()
        .and_then(|p| p.strip_prefix("base64,"))
        .unwrap_or("");
    let data = base64::engine::general_purpose::STANDARD
        .decode(b64)
        .unwrap_or_default();
    let kind = if kind_str == "image" {
        BinaryKind::Image
    } else {
        BinaryKind::File
    };
    Value::Binary {
        data,
        content_type,
        kind,
    }
}
