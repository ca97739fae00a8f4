use mindcache_authority::actor::{ActorMessage, BroadcastMessage, InstanceActor};
use mindcache_cloud::transport::ServerMessage;
use mindcache_core::{ActorId, InstanceId, Value};
use mindcache_registry::{PermissionLevel, Registry};
use mindcache_storage::WriteConnection;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

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

/// Two independent clients attached to the same instance: a write from one
/// is visible to the other over the shared broadcast channel, and a reader
/// without write permission is rejected rather than silently ignored.
#[tokio::test]
async fn a_write_from_one_client_is_broadcast_to_another_attached_client() {
    let registry = Arc::new(Registry::open_in_memory().unwrap());
    let alice = ActorId::new("alice");
    let bob = ActorId::new("bob");
    registry.grant("inst-1", &alice, PermissionLevel::Write).unwrap();
    registry.grant("inst-1", &bob, PermissionLevel::Read).unwrap();

    let (tx, outbound) = InstanceActor::spawn(InstanceId::new("inst-1"), writer(), registry);
    let mut bob_feed = outbound.subscribe();
    let mut alice_feed = outbound.subscribe();

    set(&tx, &alice, "k", Value::Text("from alice".into()))
        .await
        .unwrap();

    match bob_feed.recv().await.unwrap() {
        BroadcastMessage::Text(ServerMessage::Set { key, value, .. }) => {
            assert_eq!(key, "k");
            assert_eq!(value, Value::Text("from alice".into()));
        }
        other => panic!("expected a Set broadcast, got {other:?}"),
    }
    match alice_feed.recv().await.unwrap() {
        BroadcastMessage::Text(ServerMessage::Set { key, .. }) => assert_eq!(key, "k"),
        other => panic!("expected a Set broadcast, got {other:?}"),
    }

    let result = set(&tx, &bob, "k", Value::Text("from bob".into())).await;
    match result {
        Err(ServerMessage::Error { kind, key, .. }) => {
            assert_eq!(kind, mindcache_core::errors::ErrorKind::Unauthorized);
            assert_eq!(key.as_deref(), Some("k"));
        }
        other => panic!("expected unauthorized error, got {other:?}"),
    }
}

/// Revisions are assigned from a single counter shared by every writer on
/// the instance, regardless of which client issued the write.
#[tokio::test]
async fn concurrent_writers_share_one_monotonic_revision_counter() {
    let registry = Arc::new(Registry::open_in_memory().unwrap());
    let alice = ActorId::new("alice");
    let bob = ActorId::new("bob");
    registry.grant("inst-1", &alice, PermissionLevel::Write).unwrap();
    registry.grant("inst-1", &bob, PermissionLevel::Write).unwrap();

    let (tx, outbound) = InstanceActor::spawn(InstanceId::new("inst-1"), writer(), registry);
    let mut feed = outbound.subscribe();

    set(&tx, &alice, "a", Value::Text("1".into())).await.unwrap();
    set(&tx, &bob, "b", Value::Text("2".into())).await.unwrap();
    set(&tx, &alice, "a", Value::Text("3".into())).await.unwrap();

    let mut revisions = Vec::new();
    for _ in 0..3 {
        match feed.recv().await.unwrap() {
            BroadcastMessage::Text(ServerMessage::Set { revision, .. }) => revisions.push(revision),
            other => panic!("expected a Set broadcast, got {other:?}"),
        }
    }
    assert_eq!(revisions, vec![0, 1, 2]);
}
