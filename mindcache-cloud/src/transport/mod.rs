pub mod protocol;
mod socket;

pub use protocol::{ClientMessage, DocUpdate, ServerMessage};
pub use socket::Socket;
