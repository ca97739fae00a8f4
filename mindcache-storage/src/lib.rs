pub mod pool;
pub mod queries;
pub mod schema;

pub use pool::{ConnectionPool, ReadPool, WriteConnection};

/// Wraps a rusqlite error in a form that converts cleanly into
/// `mindcache_core::errors::StoreError`-adjacent call sites.
pub fn to_storage_err(message: impl Into<String>) -> rusqlite::Error {
    rusqlite::Error::InvalidParameterName(message.into())
}
