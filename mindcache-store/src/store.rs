use crate::subscription::{Callback, SubscriptionHandle, SubscriptionId};
use crate::{markdown, reserved, template};
use mindcache_core::errors::StoreError;
use mindcache_core::{Attributes, Entry, EntryKey, EntryMeta, StoreConfig, Value, ValueKind};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use tracing::error;

/// The L1 store: a typed key/value map with attributes, tags, subscriptions,
/// and template expansion. Single-threaded cooperative — every mutating
/// method takes `&mut self` and the store is owned by at most one adapter
/// at a time (see [`Store::mark_attached`]).
pub struct Store {
    config: StoreConfig,
    entries: HashMap<EntryKey, Entry>,
    key_subscribers: HashMap<EntryKey, Vec<(SubscriptionId, Callback)>>,
    global_subscribers: Vec<(SubscriptionId, Callback)>,
    next_subscription_id: u64,
    writer_id: String,
    attached: bool,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(StoreConfig::default(), "local")
    }
}

impl Store {
    pub fn new(config: StoreConfig, writer_id: impl Into<String>) -> Self {
        Self {
            config,
            entries: HashMap::new(),
            key_subscribers: HashMap::new(),
            global_subscribers: Vec::new(),
            next_subscription_id: 0,
            writer_id: writer_id.into(),
            attached: false,
        }
    }

    /// Marks the store as attached to an adapter. A second attach is an
    /// error — a `Store` is owned by at most one adapter at a time.
    pub fn mark_attached(&mut self) -> Result<(), StoreError> {
        if self.attached {
            return Err(StoreError::AlreadyAttached);
        }
        self.attached = true;
        Ok(())
    }

    pub fn mark_detached(&mut self) {
        self.attached = false;
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn writer_id(&self) -> &str {
        &self.writer_id
    }

    fn validate_key(key: &str) -> Result<EntryKey, StoreError> {
        let entry_key = EntryKey::new(key)?;
        if entry_key.is_reserved() {
            return Err(StoreError::InvalidKey {
                key: key.to_string(),
            });
        }
        Ok(entry_key)
    }

    /// Sets a key to a value, creating the entry if it doesn't already
    /// exist or replacing the existing value and bumping its revision
    /// otherwise. When `attrs` is omitted the existing attributes (or the
    /// type's defaults, for a new key) are kept; when provided, it replaces
    /// the attribute set wholesale. A `set` that changes neither the value
    /// nor the attributes is a no-op: no revision bump, no notification.
    pub fn set(&mut self, key: &str, value: Value, attrs: Option<Attributes>) -> Result<(), StoreError> {
        let entry_key = Self::validate_key(key)?;
        let existing = self.entries.get(&entry_key);

        let attributes = match attrs {
            Some(attrs) => attrs,
            None => existing
                .map(|e| e.attributes.clone())
                .unwrap_or_else(|| Attributes::new(value.kind())),
        };

        if let Some(existing) = existing {
            if existing.value == value && existing.attributes == attributes {
                return Ok(());
            }
        }

        let revision = existing.map(|e| e.meta.revision + 1).unwrap_or(0);
        let tags = existing.map(|e| e.tags.clone()).unwrap_or_default();
        let entry = Entry {
            value,
            attributes,
            tags,
            meta: EntryMeta {
                last_writer: self.writer_id.clone(),
                revision,
                updated_at: chrono::Utc::now(),
            },
        };
        self.entries.insert(entry_key.clone(), entry);
        self.notify(&entry_key);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(rendered) = reserved::resolve(key) {
            return Some(Value::Text(rendered));
        }
        let entry_key = EntryKey::new(key).ok()?;
        let entry = self.entries.get(&entry_key)?;
        if entry.attributes.system_tags.contains(&mindcache_core::SystemTag::ApplyTemplate) {
            if let Some(text) = entry.value.as_text() {
                return Some(Value::Text(self.expand_template(text)));
            }
        }
        Some(entry.value.clone())
    }

    pub fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        let entry_key = Self::validate_key(key)?;
        if self.entries.remove(&entry_key).is_none() {
            return Err(StoreError::NotFound {
                key: key.to_string(),
            });
        }
        self.notify(&entry_key);
        Ok(())
    }

    pub fn has(&self, key: &str) -> bool {
        EntryKey::new(key)
            .map(|k| self.entries.contains_key(&k))
            .unwrap_or(false)
    }

    pub fn keys(&self) -> Vec<EntryKey> {
        let mut keys: Vec<EntryKey> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn get_all(&self) -> HashMap<EntryKey, Value> {
        self.entries
            .iter()
            .map(|(k, e)| (k.clone(), e.value.clone()))
            .collect()
    }

    pub fn get_attributes(&self, key: &str) -> Option<Attributes> {
        let entry_key = EntryKey::new(key).ok()?;
        self.entries.get(&entry_key).map(|e| e.attributes.clone())
    }

    pub fn get_meta(&self, key: &str) -> Option<EntryMeta> {
        let entry_key = EntryKey::new(key).ok()?;
        self.entries.get(&entry_key).map(|e| e.meta.clone())
    }

    pub fn set_attributes(&mut self, key: &str, attributes: Attributes) -> Result<(), StoreError> {
        let entry_key = Self::validate_key(key)?;
        let entry = self
            .entries
            .get_mut(&entry_key)
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })?;
        entry.attributes = attributes;
        drop(entry);
        self.notify(&entry_key);
        Ok(())
    }

    pub fn add_tag(&mut self, key: &str, tag: impl Into<String>) -> Result<(), StoreError> {
        let entry_key = Self::validate_key(key)?;
        let tag = tag.into();
        let entry = self
            .entries
            .get_mut(&entry_key)
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })?;
        entry.tags.insert(tag.clone());
        entry.attributes.content_tags.insert(tag);
        drop(entry);
        self.notify(&entry_key);
        Ok(())
    }

    pub fn remove_tag(&mut self, key: &str, tag: &str) -> Result<(), StoreError> {
        let entry_key = Self::validate_key(key)?;
        let entry = self
            .entries
            .get_mut(&entry_key)
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })?;
        entry.tags.remove(tag);
        entry.attributes.content_tags.remove(tag);
        drop(entry);
        self.notify(&entry_key);
        Ok(())
    }

    pub fn get_tags(&self, key: &str) -> Option<Vec<String>> {
        let entry_key = EntryKey::new(key).ok()?;
        self.entries.get(&entry_key).map(|e| {
            let mut tags: Vec<String> = e.tags.iter().cloned().collect();
            tags.sort();
            tags
        })
    }

    pub fn get_all_tags(&self) -> Vec<String> {
        let mut tags: std::collections::HashSet<String> = std::collections::HashSet::new();
        for entry in self.entries.values() {
            tags.extend(entry.tags.iter().cloned());
        }
        let mut tags: Vec<String> = tags.into_iter().collect();
        tags.sort();
        tags
    }

    pub fn get_tagged(&self, tag: &str) -> Vec<EntryKey> {
        let mut keys: Vec<EntryKey> = self
            .entries
            .iter()
            .filter(|(_, e)| e.tags.contains(tag))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn subscribe(
        &mut self,
        key: &str,
        callback: Callback,
    ) -> Result<SubscriptionHandle, StoreError> {
        let entry_key = Self::validate_key(key)?;
        let id = self.next_id();
        self.key_subscribers
            .entry(entry_key)
            .or_default()
            .push((id, callback));
        Ok(SubscriptionHandle(id))
    }

    pub fn subscribe_to_all(&mut self, callback: Callback) -> SubscriptionHandle {
        let id = self.next_id();
        self.global_subscribers.push((id, callback));
        SubscriptionHandle(id)
    }

    pub fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        for subs in self.key_subscribers.values_mut() {
            subs.retain(|(id, _)| *id != handle.0);
        }
        self.global_subscribers.retain(|(id, _)| *id != handle.0);
    }

    fn next_id(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription_id);
        self.next_subscription_id += 1;
        id
    }

    /// Dispatches to every subscriber of `key` and to every global
    /// subscriber, in registration order. A callback that panics is caught
    /// and logged; later callbacks still run.
    fn notify(&self, key: &EntryKey) {
        let entry = self.entries.get(key);
        if let Some(subs) = self.key_subscribers.get(key) {
            for (_, cb) in subs {
                self.invoke(cb, key, entry);
            }
        }
        for (_, cb) in &self.global_subscribers {
            self.invoke(cb, key, entry);
        }
    }

    fn invoke(&self, cb: &Callback, key: &EntryKey, entry: Option<&Entry>) {
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| cb(key, entry)));
        if let Err(panic) = result {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(key = %key, %message, "subscriber callback panicked");
        }
    }

    pub fn set_file(
        &mut self,
        key: &str,
        data: Vec<u8>,
        content_type: impl Into<String>,
        kind: mindcache_core::BinaryKind,
    ) -> Result<(), StoreError> {
        self.set(
            key,
            Value::Binary {
                data,
                content_type: content_type.into(),
                kind,
            },
            None,
        )
    }

    pub fn get_data_url(&self, key: &str) -> Option<String> {
        let entry_key = EntryKey::new(key).ok()?;
        match &self.entries.get(&entry_key)?.value {
            Value::Binary {
                data, content_type, ..
            } => {
                use base64::Engine;
                let encoded = base64::engine::general_purpose::STANDARD.encode(data);
                Some(format!("data:{content_type};base64,{encoded}"))
            }
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.entries).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_json(&mut self, json: serde_json::Value) -> Result<(), StoreError> {
        let entries: HashMap<EntryKey, Entry> =
            serde_json::from_value(json).map_err(|e| StoreError::InvalidValue {
                reason: e.to_string(),
            })?;
        self.entries = entries;
        let keys: Vec<EntryKey> = self.entries.keys().cloned().collect();
        for key in keys {
            self.notify(&key);
        }
        Ok(())
    }

    pub fn to_markdown(&self, instance_name: &str) -> String {
        markdown::to_markdown(instance_name, &self.entries)
    }

    pub fn from_markdown(&mut self, text: &str) {
        for (key, entry) in markdown::from_markdown(text) {
            self.entries.insert(key.clone(), entry);
            self.notify(&key);
        }
    }

    fn expand_template(&self, text: &str) -> String {
        template::expand(text, self.config.legacy_single_brace_templates, |name| {
            if let Some(reserved) = reserved::resolve(&format!("${name}")) {
                return Some(reserved);
            }
            let entry_key = EntryKey::new(name).ok()?;
            self.entries
                .get(&entry_key)
                .map(|e| e.value.render())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn store() -> Store {
        Store::new(StoreConfig::default(), "tester")
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut s = store();
        s.set("name", Value::Text("ada".into()), None).unwrap();
        assert_eq!(s.get("name"), Some(Value::Text("ada".into())));
    }

    #[test]
    fn reserved_keys_are_rejected_on_set() {
        let mut s = store();
        assert!(s.set("$now", Value::Text("x".into()), None).is_err());
    }

    #[test]
    fn reserved_keys_resolve_on_get() {
        let s = store();
        assert!(s.get("$now").is_some());
    }

    #[test]
    fn delete_missing_key_errors() {
        let mut s = store();
        assert!(s.delete("missing").is_err());
    }

    #[test]
    fn revision_increments_on_repeated_set() {
        let mut s = store();
        s.set("k", Value::Text("a".into()), None).unwrap();
        s.set("k", Value::Text("b".into()), None).unwrap();
        assert_eq!(s.get_meta("k").unwrap().revision, 1);
    }

    #[test]
    fn identical_set_is_a_no_op_and_does_not_notify() {
        let mut s = store();
        s.set("k", Value::Text("a".into()), None).unwrap();
        let revision_after_first_set = s.get_meta("k").unwrap().revision;

        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        s.subscribe(
            "k",
            Arc::new(move |_, _| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();

        s.set("k", Value::Text("a".into()), None).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(s.get_meta("k").unwrap().revision, revision_after_first_set);
    }

    #[test]
    fn tags_round_trip() {
        let mut s = store();
        s.set("k", Value::Text("a".into()), None).unwrap();
        s.add_tag("k", "important").unwrap();
        assert_eq!(s.get_tags("k"), Some(vec!["important".to_string()]));
        assert_eq!(s.get_tagged("important"), vec![EntryKey::new("k").unwrap()]);
        s.remove_tag("k", "important").unwrap();
        assert_eq!(s.get_tags("k"), Some(vec![]));
    }

    #[test]
    fn subscriber_is_notified_on_set() {
        let mut s = store();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        s.subscribe(
            "k",
            Arc::new(move |_, _| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();
        s.set("k", Value::Text("a".into()), None).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_subscriber_does_not_block_others() {
        let mut s = store();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        s.subscribe("k", Arc::new(|_, _| panic!("boom"))).unwrap();
        s.subscribe(
            "k",
            Arc::new(move |_, _| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();
        s.set("k", Value::Text("a".into()), None).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let mut s = store();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let handle = s
            .subscribe_to_all(Arc::new(move |_, _| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            }))
            ;
        s.unsubscribe(handle);
        s.set("k", Value::Text("a".into()), None).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn second_attach_is_an_error() {
        let mut s = store();
        s.mark_attached().unwrap();
        assert!(s.mark_attached().is_err());
    }

    #[test]
    fn json_round_trip_preserves_entries() {
        let mut s = store();
        s.set("k", Value::Text("a".into()), None).unwrap();
        let json = s.to_json();
        let mut s2 = store();
        s2.from_json(json).unwrap();
        assert_eq!(s2.get("k"), Some(Value::Text("a".into())));
    }

    #[test]
    fn markdown_round_trip_preserves_entries() {
        let mut s = store();
        s.set("k", Value::Text("hello world".into()), None).unwrap();
        let md = s.to_markdown("test-instance");
        assert!(md.starts_with("# MindCache test-instance\n"));
        let mut s2 = store();
        s2.from_markdown(&md);
        assert_eq!(s2.get("k"), Some(Value::Text("hello world".into())));
    }

    #[test]
    fn template_expansion_substitutes_known_key() {
        let mut s = store();
        s.set("name", Value::Text("ada".into()), None).unwrap();
        s.set("greeting", Value::Text("hi {{name}}".into()), None).unwrap();
        let mut attrs = s.get_attributes("greeting").unwrap();
        attrs
            .system_tags
            .insert(mindcache_core::SystemTag::ApplyTemplate);
        s.set_attributes("greeting", attrs).unwrap();
        assert_eq!(s.get("greeting"), Some(Value::Text("hi ada".into())));
    }
}
