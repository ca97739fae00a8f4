mod cloud_error;
mod config_error;
mod registry_error;
mod store_error;

pub use cloud_error::CloudError;
pub use config_error::ConfigError;
pub use registry_error::RegistryError;
pub use store_error::StoreError;

use thiserror::Error;

/// The error kinds named in the wire protocol's `error` message and used to
/// pick an HTTP status on the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidKey,
    InvalidValue,
    InvalidAttributes,
    NotFound,
    Unauthenticated,
    Unauthorized,
    Conflict,
    Transient,
    Fatal,
}

/// Crate-spanning error type every subsystem's leaf error converts into.
#[derive(Debug, Error)]
pub enum MindCacheError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Cloud(#[from] CloudError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type MindCacheResult<T> = Result<T, MindCacheError>;

impl MindCacheError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MindCacheError::Store(StoreError::InvalidKey { .. }) => ErrorKind::InvalidKey,
            MindCacheError::Store(StoreError::InvalidValue { .. }) => ErrorKind::InvalidValue,
            MindCacheError::Store(StoreError::InvalidAttributes { .. }) => {
                ErrorKind::InvalidAttributes
            }
            MindCacheError::Store(StoreError::NotFound { .. }) => ErrorKind::NotFound,
            MindCacheError::Store(StoreError::AlreadyAttached) => ErrorKind::Fatal,
            MindCacheError::Cloud(CloudError::Unauthenticated { .. }) => ErrorKind::Unauthenticated,
            MindCacheError::Cloud(CloudError::Unauthorized { .. }) => ErrorKind::Unauthorized,
            MindCacheError::Cloud(CloudError::Conflict { .. }) => ErrorKind::Conflict,
            MindCacheError::Cloud(CloudError::Transient { .. }) => ErrorKind::Transient,
            MindCacheError::Cloud(CloudError::Fatal { .. }) => ErrorKind::Fatal,
            MindCacheError::Registry(RegistryError::NotFound { .. }) => ErrorKind::NotFound,
            MindCacheError::Registry(RegistryError::DelegateExpired { .. }) => {
                ErrorKind::Unauthenticated
            }
            MindCacheError::Registry(RegistryError::AlreadyExists { .. }) => ErrorKind::Conflict,
            MindCacheError::Registry(RegistryError::InvalidCredential) => {
                ErrorKind::Unauthenticated
            }
            MindCacheError::Serialization(_) => ErrorKind::Fatal,
        }
    }
}
