use mindcache_cloud::transport::ServerMessage;

/// What the actor fans out to every attached client after a successful
/// mutation. `Binary` carries a document CRDT delta exactly as produced by
/// `mindcache_crdt::DocCrdt`, routed as a websocket binary frame; every
/// other mutation is a JSON `ServerMessage` text frame.
#[derive(Debug, Clone)]
pub enum BroadcastMessage {
    Text(ServerMessage),
    Binary { key: String, op_bytes: Vec<u8> },
}
