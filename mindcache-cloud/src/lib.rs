mod adapter;
pub mod auth;
mod queue;
mod reconnect;
pub mod transport;

pub use adapter::{CloudAdapter, ConnectionState};
pub use queue::{OutboundQueue, WireOp};
pub use reconnect::ReconnectPolicy;
