use thiserror::Error;

/// Errors loading an [`crate::AuthorityConfig`] from a TOML file or the
/// environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid config at {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("invalid environment variable {var}: {message}")]
    InvalidEnv { var: String, message: String },
}
