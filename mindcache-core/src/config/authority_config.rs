use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Server-side configuration, read once at authority start.
///
/// Resolution order (highest priority first): environment variables
/// (`MINDCACHE_*`), a TOML file, compiled defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorityConfig {
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub identity_provider_jwks_url: Option<String>,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("mindcache.sqlite3"),
            bind_addr: "0.0.0.0:7420".parse().expect("valid default bind addr"),
            identity_provider_jwks_url: None,
        }
    }
}

impl AuthorityConfig {
    /// Loads configuration starting from compiled defaults, then applying
    /// `MINDCACHE_DB_PATH` / `MINDCACHE_BIND_ADDR` / `MINDCACHE_JWKS_URL`
    /// overrides from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        Self::apply_env_overrides(&mut config)?;
        Ok(config)
    }

    /// Loads a TOML config file, then applies any `MINDCACHE_*` environment
    /// overrides on top of it.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        let mut config = Self::from_toml(&content, path)?;
        Self::apply_env_overrides(&mut config)?;
        Ok(config)
    }

    /// Parses a TOML string directly (used by `from_file` and by tests).
    fn from_toml(toml_str: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn apply_env_overrides(config: &mut Self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("MINDCACHE_DB_PATH") {
            config.db_path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("MINDCACHE_BIND_ADDR") {
            config.bind_addr = val.parse().map_err(|e: std::net::AddrParseError| {
                ConfigError::InvalidEnv {
                    var: "MINDCACHE_BIND_ADDR".to_string(),
                    message: e.to_string(),
                }
            })?;
        }
        if let Ok(val) = std::env::var("MINDCACHE_JWKS_URL") {
            config.identity_provider_jwks_url = Some(val);
        }
        Ok(())
    }
}
