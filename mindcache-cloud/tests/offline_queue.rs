use mindcache_cloud::auth::Credential;
use mindcache_cloud::{CloudAdapter, ConnectionState, WireOp};
use mindcache_core::{CloudConfig, Value};
use mindcache_store::{Store, StoreConfig};

fn adapter(queue_cap: usize) -> CloudAdapter {
    let store = Store::new(StoreConfig::default(), "client-1");
    let config = CloudConfig {
        instance_id: "inst-1".into(),
        base_url: "ws://localhost".into(),
        outbound_queue_cap: queue_cap,
        ..Default::default()
    };
    CloudAdapter::attach(
        store,
        config,
        Credential::Bearer {
            token: "token".into(),
        },
    )
    .unwrap()
}

/// §8 "Offline queue" scenario: mutations made while disconnected are
/// retained in arrival order and drained once the connection comes back.
#[test]
fn writes_made_while_disconnected_are_queued_in_arrival_order() {
    let mut a = adapter(10);
    assert_eq!(a.connection_state(), ConnectionState::Disconnected);

    a.set("x", Value::Text("1".into()), None).unwrap();
    a.set("y", Value::Text("2".into()), None).unwrap();
    a.delete("x").unwrap();

    assert_eq!(a.store().get("x"), None);
    assert_eq!(a.store().get("y"), Some(Value::Text("2".into())));

    let pending = a.pending_writes();
    assert_eq!(pending.len(), 3);
    assert!(matches!(pending[0], WireOp::Set { key, .. } if key == "x"));
    assert!(matches!(pending[1], WireOp::Set { key, .. } if key == "y"));
    assert!(matches!(pending[2], WireOp::Delete { key } if key == "x"));
}

#[tokio::test]
async fn flush_drains_the_queue_in_order_and_stops_at_the_first_send_failure() {
    let mut a = adapter(10);
    a.set("x", Value::Text("1".into()), None).unwrap();
    a.set("y", Value::Text("2".into()), None).unwrap();
    assert!(a.has_pending_writes());

    let mut sent = Vec::new();
    a.flush(|op| {
        sent.push(op);
        async { Ok(()) }
    })
    .await
    .unwrap();

    assert!(!a.has_pending_writes());
    assert_eq!(sent.len(), 2);
    assert!(matches!(&sent[0], WireOp::Set { key, .. } if key == "x"));
    assert!(matches!(&sent[1], WireOp::Set { key, .. } if key == "y"));
}

/// Overflowing the outbound queue classifies the write as `Transient`
/// rather than silently dropping it or blocking.
#[test]
fn outbound_queue_overflow_is_a_transient_error() {
    let mut a = adapter(2);
    a.set("a", Value::Text("1".into()), None).unwrap();
    a.set("b", Value::Text("2".into()), None).unwrap();
    let result = a.set("c", Value::Text("3".into()), None);
    assert!(result.is_err());
}
