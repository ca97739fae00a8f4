use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Grow-only counter, one slot per agent, merged by per-agent maximum.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GCounter {
    counts: HashMap<String, u64>,
}

impl GCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, agent_id: &str, amount: u64) {
        *self.counts.entry(agent_id.to_string()).or_insert(0) += amount;
    }

    pub fn value(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn agent_value(&self, agent_id: &str) -> u64 {
        self.counts.get(agent_id).copied().unwrap_or(0)
    }

    pub fn merge(&mut self, other: &GCounter) {
        for (agent, &count) in &other.counts {
            let entry = self.counts.entry(agent.clone()).or_insert(0);
            *entry = (*entry).max(count);
        }
    }

    pub fn delta_since(&self, _since: &GCounter) -> GCounter {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_takes_per_agent_max() {
        let mut a = GCounter::new();
        a.increment("x", 3);
        let mut b = GCounter::new();
        b.increment("x", 5);
        a.merge(&b);
        assert_eq!(a.agent_value("x"), 5);
        assert_eq!(a.value(), 5);
    }
}
