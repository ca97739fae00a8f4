use mindcache_cloud::transport::ServerMessage;
use mindcache_core::{ActorId, Attributes, Value};
use tokio::sync::oneshot;

/// One unit of work handed to an `InstanceActor`. Processed one at a time
/// by the actor's single task, giving single-writer-per-instance
/// semantics without any lock in the hot path.
pub enum ActorMessage {
    Set {
        actor_id: ActorId,
        key: String,
        value: Value,
        attributes: Option<Attributes>,
        reply: oneshot::Sender<Result<(), ServerMessage>>,
    },
    Delete {
        actor_id: ActorId,
        key: String,
        reply: oneshot::Sender<Result<(), ServerMessage>>,
    },
    DocUpdate {
        actor_id: ActorId,
        key: String,
        op_bytes: Vec<u8>,
        reply: oneshot::Sender<Result<(), ServerMessage>>,
    },
    Snapshot {
        reply: oneshot::Sender<serde_json::Value>,
    },
}
