use thiserror::Error;

/// Errors raised by the global registry (L4').
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("delegate expired: {id}")]
    DelegateExpired { id: String },

    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },

    #[error("invalid credential")]
    InvalidCredential,
}
