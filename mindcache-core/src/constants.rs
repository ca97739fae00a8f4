//! Crate-wide constants.

use std::time::Duration;

/// Every key beginning with this character is a reserved key.
pub const RESERVED_PREFIX: char = '$';

/// Default cap on an adapter's outbound write queue before overflow is
/// classified as a transient error.
pub const MAX_OUTBOUND_QUEUE: usize = 10_000;

/// Template expansion is single-pass: expanded values are not themselves
/// re-scanned for further placeholders.
pub const TEMPLATE_MAX_DEPTH: usize = 1;

/// Default reconnect backoff base delay.
pub const RECONNECT_BASE: Duration = Duration::from_millis(500);

/// Default reconnect backoff cap.
pub const RECONNECT_CAP: Duration = Duration::from_secs(30);

/// Jitter fraction applied to each backoff delay.
pub const RECONNECT_JITTER: f64 = 0.20;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
