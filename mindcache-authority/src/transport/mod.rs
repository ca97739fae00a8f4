mod server;

pub use server::{router, AppState, CLOSE_AUTH_FAILED, CLOSE_NORMAL, CLOSE_PERMISSION_DENIED};
