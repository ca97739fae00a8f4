pub mod config;
pub mod constants;
pub mod errors;
pub mod models;

pub use config::{AuthorityConfig, CloudConfig, StoreConfig};
pub use errors::{MindCacheError, MindCacheResult};
pub use models::{
    ActorId, Attributes, BinaryKind, Entry, EntryKey, EntryMeta, InstanceId, SystemTag, Value,
    ValueKind,
};
