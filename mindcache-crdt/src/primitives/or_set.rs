use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::Hash;

/// A unique tag identifying one add-operation, so the same element added
/// twice by different agents (or removed and re-added) is tracked
/// independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniqueTag {
    pub agent_id: String,
    pub seq: u64,
}

/// Observed-remove set: an element is present iff it has at least one add
/// tag that hasn't been observed-removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ORSet<T: Eq + Hash> {
    adds: HashSet<(T, UniqueTag)>,
    removes: HashSet<UniqueTag>,
}

impl<T: Eq + Hash + Clone> ORSet<T> {
    pub fn new() -> Self {
        Self {
            adds: HashSet::new(),
            removes: HashSet::new(),
        }
    }

    pub fn add(&mut self, element: T, agent_id: impl Into<String>, seq: u64) {
        self.adds.insert((
            element,
            UniqueTag {
                agent_id: agent_id.into(),
                seq,
            },
        ));
    }

    /// Removes every currently-visible tag for `element`.
    pub fn remove(&mut self, element: &T) {
        for (e, tag) in &self.adds {
            if e == element {
                self.removes.insert(tag.clone());
            }
        }
    }

    pub fn contains(&self, element: &T) -> bool {
        self.adds
            .iter()
            .any(|(e, tag)| e == element && !self.removes.contains(tag))
    }

    pub fn elements(&self) -> HashSet<&T> {
        self.adds
            .iter()
            .filter(|(_, tag)| !self.removes.contains(tag))
            .map(|(e, _)| e)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.elements().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn merge(&mut self, other: &ORSet<T>) {
        self.adds.extend(other.adds.iter().cloned());
        self.removes.extend(other.removes.iter().cloned());
    }
}
