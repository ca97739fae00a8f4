use super::broadcast::BroadcastMessage;
use super::instance_actor::InstanceActor;
use super::messages::ActorMessage;
use mindcache_core::InstanceId;
use mindcache_registry::Registry;
use mindcache_storage::WriteConnection;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::info;

type ActorHandle = (mpsc::Sender<ActorMessage>, broadcast::Sender<BroadcastMessage>);

/// Process-wide map from instance to its running actor handle. Not to be
/// confused with `mindcache_registry::Registry`, the control-plane store
/// of users/instances/delegates/permissions — this is purely in-memory
/// bookkeeping of which instances currently have a live actor task.
#[derive(Clone)]
pub struct InstanceRegistry {
    writer: Arc<WriteConnection>,
    registry: Arc<Registry>,
    actors: Arc<Mutex<HashMap<String, (ActorHandle, usize)>>>,
}

impl InstanceRegistry {
    pub fn new(writer: Arc<WriteConnection>, registry: Arc<Registry>) -> Self {
        Self {
            writer,
            registry,
            actors: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the running actor for `instance_id`, spinning one up lazily
    /// on first connection. Every call must be paired with a later call to
    /// [`Self::detach`] once that client disconnects.
    pub async fn get_or_spawn(&self, instance_id: &str) -> ActorHandle {
        let mut actors = self.actors.lock().await;
        if let Some((handle, count)) = actors.get_mut(instance_id) {
            *count += 1;
            return handle.clone();
        }
        let handle = InstanceActor::spawn(
            InstanceId::new(instance_id),
            self.writer.clone(),
            self.registry.clone(),
        );
        actors.insert(instance_id.to_string(), (handle.clone(), 1));
        handle
    }

    /// Releases one client's hold on `instance_id`'s actor. Once the last
    /// client detaches, the entry is dropped: this drops the registry's own
    /// `mpsc::Sender`, and since the caller has already dropped its own
    /// clone by the time it calls `detach`, the actor task's receive loop
    /// sees the channel close and winds down on its own.
    pub async fn detach(&self, instance_id: &str) {
        let mut actors = self.actors.lock().await;
        let Some((_, count)) = actors.get_mut(instance_id) else {
            return;
        };
        *count -= 1;
        if *count == 0 {
            actors.remove(instance_id);
            info!(instance_id, "instance actor torn down, last client detached");
        }
    }
}
