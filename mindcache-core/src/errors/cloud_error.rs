use thiserror::Error;

/// Errors surfaced by the client-side cloud adapter and the authority's
/// wire protocol.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("unauthenticated: {reason}")]
    Unauthenticated { reason: String },

    #[error("unauthorized: {action}")]
    Unauthorized { action: String },

    #[error("conflict on {key}: {reason}")]
    Conflict { key: String, reason: String },

    #[error("transient: {reason}")]
    Transient { reason: String },

    #[error("fatal: {reason}")]
    Fatal { reason: String },
}
