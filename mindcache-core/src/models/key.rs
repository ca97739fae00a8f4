use crate::constants::RESERVED_PREFIX;
use crate::errors::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A store key. Keys beginning with `$` are reserved and resolved on read
/// rather than stored (`$date`, `$time`, `$now`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryKey(String);

impl EntryKey {
    pub fn new(key: impl Into<String>) -> Result<Self, StoreError> {
        let key = key.into();
        if key.is_empty() {
            return Err(StoreError::InvalidKey { key });
        }
        Ok(Self(key))
    }

    pub fn is_reserved(&self) -> bool {
        self.0.starts_with(RESERVED_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
