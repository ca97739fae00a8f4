use super::broadcast::BroadcastMessage;
use super::messages::ActorMessage;
use mindcache_cloud::transport::ServerMessage;
use mindcache_core::errors::ErrorKind;
use mindcache_core::{ActorId, Attributes, InstanceId, StoreConfig, Value};
use mindcache_crdt::DocCrdt;
use mindcache_registry::{PermissionLevel, Registry};
use mindcache_storage::{queries, WriteConnection};
use mindcache_store::Store;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, instrument, warn};

/// One actor per attached instance. Owns the canonical in-memory `Store`,
/// the instance's revision counter, every document key's `DocCrdt`, and
/// the broadcast channel fanning mutations out to attached clients.
/// Single-writer by construction: the only way to mutate this instance is
/// to send it an `ActorMessage` and await the reply.
pub struct InstanceActor {
    instance_id: InstanceId,
    store: Store,
    documents: HashMap<String, DocCrdt>,
    writer: Arc<WriteConnection>,
    registry: Arc<Registry>,
    outbound: broadcast::Sender<BroadcastMessage>,
    /// The instance-wide revision counter (spec invariant: every accepted
    /// write increments it by exactly one, regardless of which key it
    /// touched). Distinct from `Store`'s own per-key revision, which only
    /// tracks how many times that one key has been written.
    revision: u64,
}

impl InstanceActor {
    pub fn spawn(
        instance_id: InstanceId,
        writer: Arc<WriteConnection>,
        registry: Arc<Registry>,
    ) -> (mpsc::Sender<ActorMessage>, broadcast::Sender<BroadcastMessage>) {
        let (tx, mut rx) = mpsc::channel::<ActorMessage>(256);
        let (outbound, _) = broadcast::channel(256);
        let outbound_for_actor = outbound.clone();

        let mut actor = InstanceActor {
            instance_id: instance_id.clone(),
            store: Store::new(StoreConfig::default(), instance_id.as_str().to_string()),
            documents: HashMap::new(),
            writer,
            registry,
            outbound: outbound_for_actor,
            revision: 0,
        };

        let loaded = actor
            .writer
            .with_conn(|conn| queries::entries::load_entries(conn, instance_id.as_str()))
            .unwrap_or_default();
        if !loaded.is_empty() {
            let mut map = serde_json::Map::new();
            let mut next_revision = 0u64;
            for (key, entry) in loaded {
                next_revision = next_revision.max(entry.meta.revision + 1);
                if let Ok(value) = serde_json::to_value(&entry) {
                    map.insert(key.as_str().to_string(), value);
                }
            }
            let _ = actor.store.from_json(serde_json::Value::Object(map));
            actor.revision = next_revision;
        }

        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                actor.handle(msg).await;
            }
        });

        (tx, outbound)
    }

    fn permissions(&self, actor_id: &ActorId) -> std::collections::HashSet<PermissionLevel> {
        self.registry
            .permissions_for(self.instance_id.as_str(), actor_id)
            .unwrap_or_default()
    }

    #[instrument(skip(self, msg))]
    async fn handle(&mut self, msg: ActorMessage) {
        match msg {
            ActorMessage::Set {
                actor_id,
                key,
                value,
                attributes,
                reply,
            } => {
                let result = self.handle_set(&actor_id, &key, value, attributes);
                let _ = reply.send(result);
            }
            ActorMessage::Delete { actor_id, key, reply } => {
                let result = self.handle_delete(&actor_id, &key);
                let _ = reply.send(result);
            }
            ActorMessage::DocUpdate {
                actor_id,
                key,
                op_bytes,
                reply,
            } => {
                let result = self.handle_doc_update(&actor_id, &key, op_bytes);
                let _ = reply.send(result);
            }
            ActorMessage::Snapshot { reply } => {
                let _ = reply.send(self.store.to_json());
            }
        }
    }

    fn handle_set(
        &mut self,
        actor_id: &ActorId,
        key: &str,
        value: Value,
        attributes: Option<Attributes>,
    ) -> Result<(), ServerMessage> {
        let perms = self.permissions(actor_id);
        if !perms.contains(&PermissionLevel::Write) {
            return Err(error(ErrorKind::Unauthorized, Some(key), "write permission required"));
        }
        let existing_attrs = self.store.get_attributes(key);
        if let Some(existing) = &existing_attrs {
            if existing.is_protected() && !perms.contains(&PermissionLevel::System) {
                return Err(error(ErrorKind::Unauthorized, Some(key), "entry is protected"));
            }
        }
        if let Some(new_attrs) = &attributes {
            let changes_system_tags = existing_attrs
                .as_ref()
                .map(|existing| existing.system_tags != new_attrs.system_tags)
                .unwrap_or(false);
            if changes_system_tags && !perms.contains(&PermissionLevel::System) {
                return Err(error(
                    ErrorKind::Unauthorized,
                    Some(key),
                    "changing systemTags requires system permission",
                ));
            }
        }

        self.store
            .set(key, value.clone(), attributes)
            .map_err(|e| error(ErrorKind::InvalidValue, Some(key), &e.to_string()))?;

        self.revision += 1;
        let revision = self.revision;
        let value = self.store.get(key).unwrap_or(value);
        let attributes = self
            .store
            .get_attributes(key)
            .unwrap_or_else(|| Attributes::new(value.kind()));
        let entry_key = mindcache_core::EntryKey::new(key).expect("validated by store.set");
        let tags = self.store.get_tags(key).unwrap_or_default();
        self.persist(&entry_key, &value, &attributes, &tags, &actor_id.0, revision);
        self.broadcast(BroadcastMessage::Text(ServerMessage::Set {
            key: key.to_string(),
            value,
            attributes,
            revision,
        }));
        info!(key, actor = %actor_id, "entry set");
        Ok(())
    }

    fn handle_delete(&mut self, actor_id: &ActorId, key: &str) -> Result<(), ServerMessage> {
        let perms = self.permissions(actor_id);
        if !perms.contains(&PermissionLevel::Write) {
            return Err(error(ErrorKind::Unauthorized, Some(key), "write permission required"));
        }
        self.store
            .delete(key)
            .map_err(|e| error(ErrorKind::NotFound, Some(key), &e.to_string()))?;
        self.revision += 1;
        let revision = self.revision;
        let entry_key = mindcache_core::EntryKey::new(key).expect("validated by store.delete");
        self.writer
            .with_conn(|conn| queries::entries::delete_entry(conn, self.instance_id.as_str(), &entry_key))
            .ok();
        self.broadcast(BroadcastMessage::Text(ServerMessage::Delete {
            key: key.to_string(),
            revision,
        }));
        info!(key, actor = %actor_id, "entry deleted");
        Ok(())
    }

    fn handle_doc_update(
        &mut self,
        actor_id: &ActorId,
        key: &str,
        op_bytes: Vec<u8>,
    ) -> Result<(), ServerMessage> {
        let perms = self.permissions(actor_id);
        if !perms.contains(&PermissionLevel::Write) {
            return Err(error(ErrorKind::Unauthorized, Some(key), "write permission required"));
        }
        let op = bincode::deserialize(&op_bytes)
            .map_err(|e| error(ErrorKind::InvalidValue, Some(key), &e.to_string()))?;
        let doc = self.documents.entry(key.to_string()).or_default();
        doc.apply(op);
        let materialized = doc.materialize();
        let _ = self.store.set(key, Value::Document(materialized), None);

        self.writer
            .with_conn(|conn| {
                queries::doc_ops::append_doc_op(conn, self.instance_id.as_str(), key, &actor_id.0, 0, &op_bytes)
            })
            .ok();

        // Document ops skip the revision counter — the CRDT's own
        // convergence guarantees are the consistency mechanism here, not
        // last-writer-wins.
        self.broadcast(BroadcastMessage::Binary {
            key: key.to_string(),
            op_bytes,
        });
        Ok(())
    }

    fn persist(
        &self,
        key: &mindcache_core::EntryKey,
        value: &Value,
        attributes: &Attributes,
        tags: &[String],
        writer: &str,
        revision: u64,
    ) {
        let entry = mindcache_core::Entry {
            value: value.clone(),
            attributes: attributes.clone(),
            tags: tags.iter().cloned().collect(),
            meta: mindcache_core::EntryMeta {
                last_writer: writer.to_string(),
                revision,
                updated_at: chrono::Utc::now(),
            },
        };
        if let Err(e) = self
            .writer
            .with_conn(|conn| queries::entries::upsert_entry(conn, self.instance_id.as_str(), key, &entry))
        {
            warn!(error = %e, "failed to persist entry");
        }
    }

    fn broadcast(&self, msg: BroadcastMessage) {
        let _ = self.outbound.send(msg);
    }
}

fn error(kind: ErrorKind, key: Option<&str>, message: &str) -> ServerMessage {
    ServerMessage::Error {
        kind,
        message: message.to_string(),
        key: key.map(|k| k.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    fn writer() -> Arc<WriteConnection> {
        let writer = WriteConnection::open_in_memory().unwrap();
        writer.with_conn(mindcache_storage::schema::migrate).unwrap();
        Arc::new(writer)
    }

    async fn set(
        tx: &mpsc::Sender<ActorMessage>,
        actor_id: &ActorId,
        key: &str,
        value: Value,
    ) -> Result<(), ServerMessage> {
        let (reply, rx) = oneshot::channel();
        tx.send(ActorMessage::Set {
            actor_id: actor_id.clone(),
            key: key.to_string(),
            value,
            attributes: None,
            reply,
        })
        .await
        .unwrap();
        rx.await.unwrap()
    }

    #[tokio::test]
    async fn set_without_write_permission_is_unauthorized() {
        let registry = Arc::new(Registry::open_in_memory().unwrap());
        let (tx, _outbound) = InstanceActor::spawn(InstanceId::new("inst-1"), writer(), registry);
        let actor_id = ActorId::new("stranger");
        let result = set(&tx, &actor_id, "k", Value::Text("hi".into())).await;
        match result {
            Err(ServerMessage::Error { kind, key, .. }) => {
                assert_eq!(kind, ErrorKind::Unauthorized);
                assert_eq!(key.as_deref(), Some("k"));
            }
            other => panic!("expected unauthorized error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn set_with_write_permission_broadcasts_and_increments_revision() {
        let registry = Arc::new(Registry::open_in_memory().unwrap());
        let actor_id = ActorId::new("writer-1");
        registry
            .grant("inst-1", &actor_id, PermissionLevel::Write)
            .unwrap();
        let (tx, outbound) =
            InstanceActor::spawn(InstanceId::new("inst-1"), writer(), registry);
        let mut outbound = outbound.subscribe();

        set(&tx, &actor_id, "k", Value::Text("first".into()))
            .await
            .unwrap();
        match outbound.recv().await.unwrap() {
            BroadcastMessage::Text(ServerMessage::Set { revision, .. }) => assert_eq!(revision, 0),
            other => panic!("expected a Set broadcast, got {other:?}"),
        }

        set(&tx, &actor_id, "k", Value::Text("second".into()))
            .await
            .unwrap();
        match outbound.recv().await.unwrap() {
            BroadcastMessage::Text(ServerMessage::Set { revision, .. }) => assert_eq!(revision, 1),
            other => panic!("expected a Set broadcast, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn revision_counter_is_shared_across_keys() {
        let registry = Arc::new(Registry::open_in_memory().unwrap());
        let actor_id = ActorId::new("writer-1");
        registry
            .grant("inst-1", &actor_id, PermissionLevel::Write)
            .unwrap();
        let (tx, outbound) =
            InstanceActor::spawn(InstanceId::new("inst-1"), writer(), registry);
        let mut outbound = outbound.subscribe();

        set(&tx, &actor_id, "a", Value::Text("1".into())).await.unwrap();
        match outbound.recv().await.unwrap() {
            BroadcastMessage::Text(ServerMessage::Set { revision, .. }) => assert_eq!(revision, 0),
            other => panic!("expected a Set broadcast, got {other:?}"),
        }

        set(&tx, &actor_id, "b", Value::Text("1".into())).await.unwrap();
        match outbound.recv().await.unwrap() {
            BroadcastMessage::Text(ServerMessage::Set { revision, .. }) => assert_eq!(revision, 1),
            other => panic!("expected a Set broadcast, got {other:?}"),
        }

        set(&tx, &actor_id, "a", Value::Text("2".into())).await.unwrap();
        match outbound.recv().await.unwrap() {
            BroadcastMessage::Text(ServerMessage::Set { revision, .. }) => assert_eq!(revision, 2),
            other => panic!("expected a Set broadcast, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn changing_system_tags_requires_system_permission() {
        let registry = Arc::new(Registry::open_in_memory().unwrap());
        let actor_id = ActorId::new("writer-1");
        registry
            .grant("inst-1", &actor_id, PermissionLevel::Write)
            .unwrap();
        let (tx, outbound) =
            InstanceActor::spawn(InstanceId::new("inst-1"), writer(), registry);
        let mut outbound = outbound.subscribe();

        set(&tx, &actor_id, "k", Value::Text("first".into()))
            .await
            .unwrap();
        outbound.recv().await.unwrap();

        let (reply, rx) = oneshot::channel();
        let mut attrs = Attributes::new(mindcache_core::ValueKind::Text);
        attrs.system_tags.insert(mindcache_core::SystemTag::SystemPrompt);
        tx.send(ActorMessage::Set {
            actor_id: actor_id.clone(),
            key: "k".to_string(),
            value: Value::Text("second".into()),
            attributes: Some(attrs),
            reply,
        })
        .await
        .unwrap();
        match rx.await.unwrap() {
            Err(ServerMessage::Error { kind, .. }) => assert_eq!(kind, ErrorKind::Unauthorized),
            other => panic!("expected unauthorized error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unchanged_system_tags_do_not_require_system_permission() {
        let registry = Arc::new(Registry::open_in_memory().unwrap());
        let actor_id = ActorId::new("writer-1");
        registry
            .grant("inst-1", &actor_id, PermissionLevel::Write)
            .unwrap();
        let (tx, outbound) =
            InstanceActor::spawn(InstanceId::new("inst-1"), writer(), registry);
        let mut outbound = outbound.subscribe();

        set(&tx, &actor_id, "k", Value::Text("first".into()))
            .await
            .unwrap();
        outbound.recv().await.unwrap();

        let (reply, rx) = oneshot::channel();
        let mut attrs = Attributes::new(mindcache_core::ValueKind::Text);
        attrs.z_index = 3;
        tx.send(ActorMessage::Set {
            actor_id: actor_id.clone(),
            key: "k".to_string(),
            value: Value::Text("second".into()),
            attributes: Some(attrs),
            reply,
        })
        .await
        .unwrap();
        rx.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn protected_entry_requires_system_permission() {
        let registry = Arc::new(Registry::open_in_memory().unwrap());
        let actor_id = ActorId::new("writer-1");
        registry
            .grant("inst-1", &actor_id, PermissionLevel::Write)
            .unwrap();
        let (tx, outbound) =
            InstanceActor::spawn(InstanceId::new("inst-1"), writer(), registry);
        let mut outbound = outbound.subscribe();

        set(&tx, &actor_id, "k", Value::Text("first".into()))
            .await
            .unwrap();
        outbound.recv().await.unwrap();

        let (reply, rx) = oneshot::channel();
        let mut attrs = Attributes::new(mindcache_core::ValueKind::Text);
        attrs.protected = true;
        tx.send(ActorMessage::Set {
            actor_id: actor_id.clone(),
            key: "k".to_string(),
            value: Value::Text("first".into()),
            attributes: Some(attrs),
            reply,
        })
        .await
        .unwrap();
        rx.await.unwrap().unwrap();
        outbound.recv().await.unwrap();

        let result = set(&tx, &actor_id, "k", Value::Text("second".into())).await;
        match result {
            Err(ServerMessage::Error { kind, .. }) => assert_eq!(kind, ErrorKind::Unauthorized),
            other => panic!("expected unauthorized error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn doc_update_materializes_and_broadcasts_binary() {
        let registry = Arc::new(Registry::open_in_memory().unwrap());
        let actor_id = ActorId::new("writer-1");
        registry
            .grant("inst-1", &actor_id, PermissionLevel::Write)
            .unwrap();
        let (tx, outbound) =
            InstanceActor::spawn(InstanceId::new("inst-1"), writer(), registry);
        let mut outbound = outbound.subscribe();

        let mut doc = DocCrdt::new();
        let op = doc.local_insert(0, 'h', &actor_id);
        let op_bytes = bincode::serialize(&op).unwrap();

        let (reply, rx) = oneshot::channel();
        tx.send(ActorMessage::DocUpdate {
            actor_id: actor_id.clone(),
            key: "notes".to_string(),
            op_bytes: op_bytes.clone(),
            reply,
        })
        .await
        .unwrap();
        rx.await.unwrap().unwrap();

        match outbound.recv().await.unwrap() {
            BroadcastMessage::Binary { key, op_bytes: bytes } => {
                assert_eq!(key, "notes");
                assert_eq!(bytes, op_bytes);
            }
            other => panic!("expected a binary broadcast, got {other:?}"),
        }

        let (reply, rx) = oneshot::channel();
        tx.send(ActorMessage::Snapshot { reply }).await.unwrap();
        let snapshot = rx.await.unwrap();
        assert_eq!(snapshot["notes"]["value"]["type"], "document");
        assert_eq!(snapshot["notes"]["value"]["data"], "h");
    }
}
