use crate::constants::{MAX_OUTBOUND_QUEUE, RECONNECT_BASE, RECONNECT_CAP, RECONNECT_JITTER};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the client-side cloud adapter (L3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    pub instance_id: String,
    pub base_url: String,
    #[serde(with = "duration_millis")]
    pub reconnect_base: Duration,
    #[serde(with = "duration_millis")]
    pub reconnect_cap: Duration,
    pub reconnect_jitter: f64,
    pub outbound_queue_cap: usize,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            instance_id: String::new(),
            base_url: String::new(),
            reconnect_base: RECONNECT_BASE,
            reconnect_cap: RECONNECT_CAP,
            reconnect_jitter: RECONNECT_JITTER,
            outbound_queue_cap: MAX_OUTBOUND_QUEUE,
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}
