mod attributes;
mod ids;
mod key;
mod value;

pub use attributes::{Attributes, Entry, EntryMeta, SystemTag};
pub use ids::{ActorId, InstanceId};
pub use key::EntryKey;
pub use value::{BinaryKind, Value, ValueKind};
