use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last-writer-wins register, ties broken by `agent_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LWWRegister<T> {
    value: T,
    timestamp: DateTime<Utc>,
    agent_id: String,
}

/// A delta that can be merged into a remote replica of an `LWWRegister`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LWWDelta<T> {
    pub value: T,
    pub timestamp: DateTime<Utc>,
    pub agent_id: String,
}

impl<T: Clone> LWWRegister<T> {
    pub fn new(value: T, agent_id: impl Into<String>) -> Self {
        Self {
            value,
            timestamp: Utc::now(),
            agent_id: agent_id.into(),
        }
    }

    pub fn set(&mut self, value: T, timestamp: DateTime<Utc>, agent_id: impl Into<String>) {
        self.value = value;
        self.timestamp = timestamp;
        self.agent_id = agent_id.into();
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Merges a remote delta in, keeping whichever write is later, breaking
    /// ties by `agent_id` so both replicas converge on the same winner.
    pub fn merge(&mut self, delta: &LWWDelta<T>) {
        if delta.timestamp > self.timestamp
            || (delta.timestamp == self.timestamp && delta.agent_id > self.agent_id)
        {
            self.value = delta.value.clone();
            self.timestamp = delta.timestamp;
            self.agent_id = delta.agent_id.clone();
        }
    }

    pub fn delta_since(&self, _since: DateTime<Utc>) -> LWWDelta<T> {
        LWWDelta {
            value: self.value.clone(),
            timestamp: self.timestamp,
            agent_id: self.agent_id.clone(),
        }
    }
}
