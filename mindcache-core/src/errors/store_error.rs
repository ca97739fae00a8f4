use thiserror::Error;

/// Errors raised directly by the L1 store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid key: {key}")]
    InvalidKey { key: String },

    #[error("invalid value: {reason}")]
    InvalidValue { reason: String },

    #[error("invalid attributes: {reason}")]
    InvalidAttributes { reason: String },

    #[error("key not found: {key}")]
    NotFound { key: String },

    #[error("an adapter is already attached to this store")]
    AlreadyAttached,
}
