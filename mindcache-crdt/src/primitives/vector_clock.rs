use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A vector clock, one counter per agent, used to order concurrent writes
/// for the primitives that need causal comparison rather than plain
/// last-writer-wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorClock {
    entries: HashMap<String, u64>,
}

impl VectorClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, agent: &str) -> u64 {
        self.entries.get(agent).copied().unwrap_or(0)
    }

    pub fn increment(&mut self, agent: &str) {
        *self.entries.entry(agent.to_string()).or_insert(0) += 1;
    }

    pub fn agents(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// True if `self` causally dominates `other` (happened at or after it
    /// on every agent, and strictly after on at least one).
    pub fn dominates(&self, other: &VectorClock) -> bool {
        let mut strictly_greater = false;
        let agents: std::collections::HashSet<&String> =
            self.entries.keys().chain(other.entries.keys()).collect();
        for agent in agents {
            let mine = self.get(agent);
            let theirs = other.get(agent);
            if mine < theirs {
                return false;
            }
            if mine > theirs {
                strictly_greater = true;
            }
        }
        strictly_greater
    }

    pub fn merge(&mut self, other: &VectorClock) {
        for (agent, &count) in &other.entries {
            let entry = self.entries.entry(agent.clone()).or_insert(0);
            *entry = (*entry).max(count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dominates_when_strictly_ahead() {
        let mut a = VectorClock::new();
        a.increment("x");
        a.increment("x");
        let mut b = VectorClock::new();
        b.increment("x");
        assert!(a.dominates(&b));
        assert!(!b.dominates(&a));
    }

    #[test]
    fn concurrent_clocks_dominate_neither_way() {
        let mut a = VectorClock::new();
        a.increment("x");
        let mut b = VectorClock::new();
        b.increment("y");
        assert!(!a.dominates(&b));
        assert!(!b.dominates(&a));
    }
}
