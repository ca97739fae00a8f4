use mindcache_core::{Entry, EntryKey};
use std::sync::Arc;

/// Identifies one `subscribe`/`subscribe_to_all` registration. `unsubscribe`
/// removes the matching callback wherever it's registered, whether it was a
/// per-key or a global subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

pub type Callback = Arc<dyn Fn(&EntryKey, Option<&Entry>) + Send + Sync>;

/// An opaque handle returned by `subscribe`/`subscribe_to_all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionHandle(pub SubscriptionId);
