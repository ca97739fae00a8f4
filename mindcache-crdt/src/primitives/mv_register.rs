use super::vector_clock::VectorClock;
use serde::{Deserialize, Serialize};

/// Multi-value register: keeps every concurrently-written value until a
/// later write causally dominates them all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MVRegister<T> {
    entries: Vec<(T, VectorClock)>,
}

impl<T: Clone> MVRegister<T> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Sets a new value at `clock`, pruning any existing entry it
    /// causally dominates.
    pub fn set(&mut self, value: T, clock: VectorClock) {
        self.entries.retain(|(_, c)| !clock.dominates(c));
        self.entries.push((value, clock));
    }

    pub fn get(&self) -> Vec<&T> {
        self.entries.iter().map(|(v, _)| v).collect()
    }

    pub fn is_conflicted(&self) -> bool {
        self.entries.len() > 1
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Collapses a conflicted register down to a single value, e.g. after
    /// the caller applies an application-level resolution rule.
    pub fn resolve(&mut self, value: T, clock: VectorClock) {
        self.entries.clear();
        self.entries.push((value, clock));
    }

    pub fn merge(&mut self, other: &MVRegister<T>) {
        for (value, clock) in &other.entries {
            if self.entries.iter().any(|(_, c)| c == clock) {
                continue;
            }
            if self.entries.iter().any(|(_, c)| c.dominates(clock)) {
                continue;
            }
            self.entries.retain(|(_, c)| !clock.dominates(c));
            self.entries.push((value.clone(), clock.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrent_sets_both_survive() {
        let mut a = MVRegister::new();
        let mut ca = VectorClock::new();
        ca.increment("a");
        a.set("from-a", ca);

        let mut b = MVRegister::new();
        let mut cb = VectorClock::new();
        cb.increment("b");
        b.set("from-b", cb);

        a.merge(&b);
        assert!(a.is_conflicted());
        assert_eq!(a.get().len(), 2);
    }

    #[test]
    fn dominating_write_prunes_earlier() {
        let mut a = MVRegister::new();
        let mut c1 = VectorClock::new();
        c1.increment("a");
        a.set("first", c1.clone());

        let mut c2 = c1.clone();
        c2.increment("a");
        a.set("second", c2);

        assert!(!a.is_conflicted());
        assert_eq!(a.get(), vec![&"second"]);
    }
}
