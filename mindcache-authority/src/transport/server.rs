use crate::actor::{ActorMessage, BroadcastMessage, InstanceRegistry};
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use mindcache_cloud::transport::{ClientMessage, ServerMessage};
use mindcache_core::{ActorId, Attributes};
use mindcache_registry::{Credential as RegistryCredential, Registry};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info, warn};

pub const CLOSE_AUTH_FAILED: u16 = 4401;
pub const CLOSE_PERMISSION_DENIED: u16 = 4403;
pub const CLOSE_NORMAL: u16 = 1000;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub instances: InstanceRegistry,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/sync/:instance_id", get(sync_handler))
        .with_state(state)
}

async fn sync_handler(
    Path(instance_id): Path<String>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, instance_id, state))
}

async fn handle_connection(mut socket: WebSocket, instance_id: String, state: AppState) {
    let actor_id = match authenticate(&mut socket, &state).await {
        Some(actor_id) => actor_id,
        None => return,
    };

    let (actor_tx, mut broadcast_rx) = state.instances.get_or_spawn(&instance_id).await;

    let (reply_tx, reply_rx) = oneshot::channel();
    if actor_tx
        .send(ActorMessage::Snapshot { reply: reply_tx })
        .await
        .is_err()
    {
        close(&mut socket, CLOSE_AUTH_FAILED, "instance unavailable").await;
        return;
    }
    let Ok(snapshot) = reply_rx.await else {
        close(&mut socket, CLOSE_AUTH_FAILED, "instance unavailable").await;
        return;
    };
    if send_text(&mut socket, &ServerMessage::AuthSuccess { snapshot }).await.is_err() {
        return;
    }

    info!(instance_id, actor = %actor_id, "client attached");

    run_sync_loop(&mut socket, &actor_id, &actor_tx, &mut broadcast_rx).await;

    drop(actor_tx);
    drop(broadcast_rx);
    state.instances.detach(&instance_id).await;

    close(&mut socket, CLOSE_NORMAL, "normal shutdown").await;
}

async fn run_sync_loop(
    socket: &mut WebSocket,
    actor_id: &ActorId,
    actor_tx: &tokio::sync::mpsc::Sender<ActorMessage>,
    broadcast_rx: &mut tokio::sync::broadcast::Receiver<BroadcastMessage>,
) {
    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if handle_client_text(&text, actor_id, actor_tx, socket).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        if handle_doc_update(bytes, actor_id, actor_tx, socket).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "websocket error");
                        break;
                    }
                }
            }
            broadcast_msg = broadcast_rx.recv() => {
                match broadcast_msg {
                    Ok(BroadcastMessage::Text(msg)) => {
                        if send_text(socket, &msg).await.is_err() {
                            break;
                        }
                    }
                    Ok(BroadcastMessage::Binary { op_bytes, .. }) => {
                        if socket.send(Message::Binary(op_bytes)).await.is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        }
    }
}

async fn authenticate(socket: &mut WebSocket, state: &AppState) -> Option<ActorId> {
    let first = socket.recv().await?;
    let Ok(Message::Text(text)) = first else {
        close(socket, CLOSE_AUTH_FAILED, "expected auth frame").await;
        return None;
    };
    let Ok(ClientMessage::Auth { credential }) = serde_json::from_str::<ClientMessage>(&text) else {
        close(socket, CLOSE_AUTH_FAILED, "malformed auth frame").await;
        return None;
    };
    let Ok(credential) = serde_json::from_value::<RegistryCredential>(credential) else {
        close(socket, CLOSE_AUTH_FAILED, "malformed credential").await;
        return None;
    };
    match state.registry.authenticate(&credential) {
        Ok(actor_id) => Some(actor_id),
        Err(e) => {
            let _ = send_text(
                socket,
                &ServerMessage::AuthFailure {
                    reason: e.to_string(),
                },
            )
            .await;
            close(socket, CLOSE_AUTH_FAILED, "authentication failed").await;
            None
        }
    }
}

async fn handle_client_text(
    text: &str,
    actor_id: &ActorId,
    actor_tx: &tokio::sync::mpsc::Sender<ActorMessage>,
    socket: &mut WebSocket,
) -> Result<(), ()> {
    let Ok(msg) = serde_json::from_str::<ClientMessage>(text) else {
        return Ok(());
    };
    match msg {
        ClientMessage::Set { key, value, attributes } => {
            let attributes = attributes.or_else(|| Some(Attributes::new(value.kind())));
            dispatch_and_reply(actor_tx, socket, |reply| ActorMessage::Set {
                actor_id: actor_id.clone(),
                key,
                value,
                attributes,
                reply,
            })
            .await
        }
        ClientMessage::Delete { key } => {
            dispatch_and_reply(actor_tx, socket, |reply| ActorMessage::Delete {
                actor_id: actor_id.clone(),
                key,
                reply,
            })
            .await
        }
        ClientMessage::Auth { .. } => Ok(()),
    }
}

async fn handle_doc_update(
    bytes: Vec<u8>,
    actor_id: &ActorId,
    actor_tx: &tokio::sync::mpsc::Sender<ActorMessage>,
    socket: &mut WebSocket,
) -> Result<(), ()> {
    // The framed key is carried as a length-prefixed prefix ahead of the
    // opaque CRDT bytes: [u16 key_len][key bytes][op bytes].
    if bytes.len() < 2 {
        return Ok(());
    }
    let key_len = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
    if bytes.len() < 2 + key_len {
        return Ok(());
    }
    let key = String::from_utf8_lossy(&bytes[2..2 + key_len]).to_string();
    let op_bytes = bytes[2 + key_len..].to_vec();
    dispatch_and_reply(actor_tx, socket, |reply| ActorMessage::DocUpdate {
        actor_id: actor_id.clone(),
        key,
        op_bytes,
        reply,
    })
    .await
}

async fn dispatch_and_reply(
    actor_tx: &tokio::sync::mpsc::Sender<ActorMessage>,
    socket: &mut WebSocket,
    build: impl FnOnce(oneshot::Sender<Result<(), ServerMessage>>) -> ActorMessage,
) -> Result<(), ()> {
    let (reply_tx, reply_rx) = oneshot::channel();
    if actor_tx.send(build(reply_tx)).await.is_err() {
        return Err(());
    }
    match reply_rx.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(server_err)) => {
            send_text(socket, &server_err).await.ok();
            if let ServerMessage::Error {
                kind: mindcache_core::errors::ErrorKind::Unauthorized,
                ..
            } = &server_err
            {
                close(socket, CLOSE_PERMISSION_DENIED, "permission denied").await;
                return Err(());
            }
            Ok(())
        }
        Err(_) => Err(()),
    }
}

async fn send_text(socket: &mut WebSocket, msg: &ServerMessage) -> Result<(), ()> {
    let text = serde_json::to_string(msg).map_err(|_| ())?;
    socket.send(Message::Text(text)).await.map_err(|_| ())
}

async fn close(socket: &mut WebSocket, code: u16, reason: &str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.to_string().into(),
        })))
        .await;
}
