use crate::auth::Credential;
use crate::queue::{OutboundQueue, WireOp};
use crate::reconnect::ReconnectPolicy;
use crate::transport::ServerMessage;
use mindcache_core::errors::{CloudError, StoreError};
use mindcache_core::{ActorId, Attributes, CloudConfig, Value, ValueKind};
use mindcache_crdt::DocCrdt;
use mindcache_store::Store;
use std::collections::HashMap;
use tracing::{info, warn};

/// Client-side connection state machine (§4.3.3), distinct from the
/// teacher's `CloudStatus` enum: this one has a dedicated `Authenticating`
/// step between opening the socket and receiving the first snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Authenticating,
    Ready,
    Error,
}

/// The L3 Cloud Adapter. Owns the `Store` it is attached to; attaching a
/// second adapter to the same store is rejected by `Store::mark_attached`.
pub struct CloudAdapter {
    store: Store,
    state: ConnectionState,
    queue: OutboundQueue,
    policy: ReconnectPolicy,
    credential: Credential,
    config: CloudConfig,
    loaded: bool,
    last_error: Option<CloudError>,
    /// One `DocCrdt` per document-kind key this adapter has touched, kept
    /// just so `set()` can diff against the prior state rather than
    /// discarding CRDT history on every plain write.
    documents: HashMap<String, DocCrdt>,
    /// Snapshot of a key's entry immediately before the most recent local
    /// `set`/`delete` touched it, so an `Unauthorized`/`Conflict` reply
    /// naming that key can be rolled back to exactly that prior state
    /// (§8 scenario 4: "local state reverts k to its pre-write value").
    /// `None` means the key didn't exist before the pending write.
    pre_write: HashMap<String, Option<(Value, Attributes)>>,
}

impl CloudAdapter {
    pub fn attach(mut store: Store, config: CloudConfig, credential: Credential) -> Result<Self, StoreError> {
        store.mark_attached()?;
        let queue = OutboundQueue::new(config.outbound_queue_cap);
        let policy = ReconnectPolicy::new(&config);
        Ok(Self {
            store,
            state: ConnectionState::Disconnected,
            queue,
            policy,
            credential,
            config,
            loaded: false,
            last_error: None,
            documents: HashMap::new(),
            pre_write: HashMap::new(),
        })
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_cloud(&self) -> bool {
        true
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn pending_writes(&self) -> Vec<&WireOp> {
        self.queue.iter().collect()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn begin_connecting(&mut self) {
        self.state = ConnectionState::Connecting;
    }

    pub fn begin_authenticating(&mut self) {
        self.state = ConnectionState::Authenticating;
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Mutates the local store first, notifies subscribers (the store does
    /// this internally), then either sends immediately or enqueues,
    /// exactly the ordering §4.3.3 requires. A `set` on a document-kind
    /// key is diffed against its `DocCrdt` and queued as `DocUpdate` ops
    /// rather than a whole-value `Set`, so casual callers that just call
    /// `set` still get convergent document edits.
    pub fn set(&mut self, key: &str, value: Value, attributes: Option<Attributes>) -> Result<(), CloudError> {
        if let Value::Document(text) = &value {
            return self.set_document(key, text, attributes);
        }

        self.snapshot_pre_write(key);
        self.store
            .set(key, value.clone(), attributes.clone())
            .map_err(|e| CloudError::Fatal { reason: e.to_string() })?;
        let op = WireOp::Set {
            key: key.to_string(),
            value,
            attributes: attributes.unwrap_or_else(|| {
                self.store
                    .get_attributes(key)
                    .unwrap_or_else(|| Attributes::new(ValueKind::Text))
            }),
        };
        self.dispatch(op)
    }

    fn set_document(
        &mut self,
        key: &str,
        text: &str,
        attributes: Option<Attributes>,
    ) -> Result<(), CloudError> {
        self.snapshot_pre_write(key);
        let actor = ActorId::new(self.store.writer_id());
        let doc = self.documents.entry(key.to_string()).or_default();
        let ops = doc.diff_for_set(text, &actor);
        let materialized = doc.materialize();

        self.store
            .set(key, Value::Document(materialized), attributes)
            .map_err(|e| CloudError::Fatal { reason: e.to_string() })?;

        for op in ops {
            let op_bytes = bincode::serialize(&op).map_err(|e| CloudError::Fatal {
                reason: e.to_string(),
            })?;
            self.dispatch(WireOp::DocUpdate {
                key: key.to_string(),
                op_bytes,
            })?;
        }
        Ok(())
    }

    pub fn delete(&mut self, key: &str) -> Result<(), CloudError> {
        self.snapshot_pre_write(key);
        self.store
            .delete(key)
            .map_err(|e| CloudError::Fatal { reason: e.to_string() })?;
        self.dispatch(WireOp::Delete { key: key.to_string() })
    }

    /// Records `key`'s current value+attributes (or their absence) before a
    /// local mutation touches it, so a later `Unauthorized`/`Conflict` reply
    /// naming this key can restore exactly this state.
    fn snapshot_pre_write(&mut self, key: &str) {
        let previous = self
            .store
            .get(key)
            .zip(self.store.get_attributes(key));
        self.pre_write.insert(key.to_string(), previous);
    }

    /// Restores `key` to the state captured by `snapshot_pre_write` just
    /// before the write that the authority just rejected.
    fn rollback(&mut self, key: &str) {
        match self.pre_write.remove(key) {
            Some(Some((value, attributes))) => {
                let _ = self.store.set(key, value, Some(attributes));
            }
            Some(None) => {
                let _ = self.store.delete(key);
            }
            None => {}
        }
    }

    /// Enqueues `op`. When `Ready`, the caller's next `flush` drains it
    /// immediately; in any other state it waits there until reconnect.
    fn dispatch(&mut self, op: WireOp) -> Result<(), CloudError> {
        self.queue.push(op)
    }

    /// Drains the outbound queue, handing each op to `send`. Stops at the
    /// first failure, leaving the remainder queued.
    pub async fn flush<F, Fut>(&mut self, mut send: F) -> Result<(), CloudError>
    where
        F: FnMut(WireOp) -> Fut,
        Fut: std::future::Future<Output = Result<(), CloudError>>,
    {
        while let Some(op) = self.queue.pop() {
            if let Err(e) = send(op.clone()).await {
                self.queue.push(op).ok();
                return Err(e);
            }
        }
        Ok(())
    }

    /// The §4.3.3 transition table for inbound server messages.
    pub fn on_message(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::AuthSuccess { snapshot } => {
                if let Err(e) = self.store.from_json(snapshot) {
                    warn!(error = %e, "failed to apply snapshot");
                    self.state = ConnectionState::Error;
                    self.last_error = Some(CloudError::Fatal { reason: e.to_string() });
                    return;
                }
                self.loaded = true;
                self.state = ConnectionState::Ready;
                self.policy.reset();
                info!("authenticated, snapshot applied");
            }
            ServerMessage::AuthFailure { reason } => {
                self.state = ConnectionState::Error;
                self.last_error = Some(CloudError::Unauthenticated { reason });
            }
            ServerMessage::Sync { snapshot } => {
                if let Err(e) = self.store.from_json(snapshot) {
                    warn!(error = %e, "failed to apply sync snapshot");
                }
            }
            ServerMessage::Set {
                key,
                value,
                attributes,
                ..
            } => {
                let _ = self.store.set(&key, value, Some(attributes));
            }
            ServerMessage::Delete { key, .. } => {
                let _ = self.store.delete(&key);
            }
            ServerMessage::Error { kind, message, key } => {
                self.handle_error(kind, message, key);
            }
        }
    }

    /// Applies a remote `doc_update` binary frame: the counterpart to
    /// `set_document` for ops arriving from the server rather than
    /// originating locally.
    pub fn apply_doc_update(&mut self, key: &str, op_bytes: &[u8]) -> Result<(), CloudError> {
        let op = bincode::deserialize(op_bytes).map_err(|e| CloudError::Fatal {
            reason: e.to_string(),
        })?;
        let doc = self.documents.entry(key.to_string()).or_default();
        doc.apply(op);
        let materialized = doc.materialize();
        self.store
            .set(key, Value::Document(materialized), None)
            .map_err(|e| CloudError::Fatal { reason: e.to_string() })
    }

    fn handle_error(&mut self, kind: mindcache_core::errors::ErrorKind, message: String, key: Option<String>) {
        use mindcache_core::errors::ErrorKind;
        match kind {
            ErrorKind::Unauthenticated => {
                self.state = ConnectionState::Error;
                self.last_error = Some(CloudError::Unauthenticated { reason: message });
            }
            ErrorKind::Unauthorized | ErrorKind::Conflict => {
                if let Some(key) = &key {
                    self.rollback(key);
                }
                self.last_error = Some(if kind == ErrorKind::Unauthorized {
                    CloudError::Unauthorized { action: message }
                } else {
                    CloudError::Conflict {
                        key: key.unwrap_or_default(),
                        reason: message,
                    }
                });
            }
            ErrorKind::Transient => {
                self.state = ConnectionState::Disconnected;
                self.last_error = Some(CloudError::Transient { reason: message });
            }
            _ => {
                self.last_error = Some(CloudError::Fatal { reason: message });
            }
        }
    }

    pub fn last_error(&self) -> Option<&CloudError> {
        self.last_error.as_ref()
    }

    pub fn next_reconnect_delay(&mut self) -> std::time::Duration {
        self.policy.next_delay()
    }

    /// Closes the connection and stops reconnecting. Queued writes remain
    /// introspectable via `pending_writes`.
    pub fn disconnect(&mut self) {
        self.state = ConnectionState::Disconnected;
    }
}
