//! A Replicated Growable Array for `document`-kind entries.
//!
//! Deletions are tombstones rather than physical removal, which gives
//! idempotent re-application for free: applying the same insert or delete
//! twice is a no-op keyed by `ElementId`. Concurrent inserts anchored at the
//! same position converge by sorting on `(actor, seq)`, which preserves the
//! intention of each insert without reordering anything causally prior to
//! it.

use mindcache_core::ActorId;
use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};

/// A Lamport-style identifier, unique per `(actor, seq)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementId {
    pub actor: String,
    pub seq: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocElement {
    id: ElementId,
    origin: Option<ElementId>,
    visible: bool,
    ch: char,
}

/// A single insert or delete operation, broadcast to other replicas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DocOp {
    Insert {
        id: ElementId,
        origin: Option<ElementId>,
        ch: char,
    },
    Delete {
        id: ElementId,
    },
}

/// The replicated document structure. `mindcache-store` caches
/// `materialize()` on the entry; this struct is the source of truth the
/// cache is derived from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocCrdt {
    elements: Vec<DocElement>,
    next_seq: u64,
}

impl DocCrdt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: &str, actor: &ActorId) -> Self {
        let mut doc = Self::new();
        for (i, ch) in text.chars().enumerate() {
            doc.local_insert(i, ch, actor);
        }
        doc
    }

    fn visible_index_to_array_index(&self, pos: usize) -> usize {
        let mut seen = 0;
        for (i, el) in self.elements.iter().enumerate() {
            if el.visible {
                if seen == pos {
                    return i;
                }
                seen += 1;
            }
        }
        self.elements.len()
    }

    fn visible_id_before(&self, pos: usize) -> Option<ElementId> {
        if pos == 0 {
            return None;
        }
        let idx = self.visible_index_to_array_index(pos - 1);
        self.elements.get(idx).map(|e| e.id.clone())
    }

    /// Inserts `ch` at visible position `pos`, returning the op to
    /// broadcast to other replicas.
    pub fn local_insert(&mut self, pos: usize, ch: char, actor: &ActorId) -> DocOp {
        let id = ElementId {
            actor: actor.as_str().to_string(),
            seq: self.next_seq,
        };
        self.next_seq += 1;
        let origin = self.visible_id_before(pos);
        self.insert_after(origin.clone(), id.clone(), ch);
        DocOp::Insert { id, origin, ch }
    }

    /// Tombstones the visible element at `pos`, returning the delete op to
    /// broadcast, or `None` if `pos` is out of range.
    pub fn local_delete(&mut self, pos: usize) -> Option<DocOp> {
        let idx = self.visible_index_to_array_index(pos);
        let el = self.elements.get_mut(idx)?;
        el.visible = false;
        Some(DocOp::Delete { id: el.id.clone() })
    }

    fn insert_after(&mut self, origin: Option<ElementId>, id: ElementId, ch: char) {
        let start = match &origin {
            None => 0,
            Some(origin_id) => match self.elements.iter().position(|e| &e.id == origin_id) {
                Some(i) => i + 1,
                None => self.elements.len(),
            },
        };
        // Skip forward past any existing elements anchored at the same
        // origin that sort ahead of `id` — the standard RGA tie-break that
        // keeps concurrent inserts at one anchor in a deterministic order.
        let mut insert_at = start;
        while let Some(el) = self.elements.get(insert_at) {
            if el.origin == origin && el.id > id {
                insert_at += 1;
            } else {
                break;
            }
        }
        self.elements.insert(
            insert_at,
            DocElement {
                id,
                origin,
                visible: true,
                ch,
            },
        );
    }

    /// Idempotently applies a remote op. Re-applying an already-known
    /// insert or delete is a no-op.
    pub fn apply(&mut self, op: DocOp) {
        match op {
            DocOp::Insert { id, origin, ch } => {
                if self.elements.iter().any(|e| e.id == id) {
                    return;
                }
                if id.seq >= self.next_seq {
                    self.next_seq = id.seq + 1;
                }
                self.insert_after(origin, id, ch);
            }
            DocOp::Delete { id } => {
                if let Some(el) = self.elements.iter_mut().find(|e| e.id == id) {
                    el.visible = false;
                }
            }
        }
    }

    pub fn materialize(&self) -> String {
        self.elements
            .iter()
            .filter(|e| e.visible)
            .map(|e| e.ch)
            .collect()
    }

    pub fn encode(&self) -> Vec<u8> {
        bincode::serialize(self).expect("DocCrdt serializes without recursion or unsized fields")
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    /// Computes the minimal set of ops that turn the current
    /// materialization into `new_text`, so a plain `Store::set` on a
    /// document key still produces character-level ops instead of a full
    /// replace.
    pub fn diff_for_set(&mut self, new_text: &str, actor: &ActorId) -> Vec<DocOp> {
        let old_text = self.materialize();
        let diff = TextDiff::configure().diff_chars(&old_text, new_text);
        let mut ops = Vec::new();
        let mut pos = 0usize;
        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Equal => {
                    pos += change.value().chars().count();
                }
                ChangeTag::Delete => {
                    for _ in change.value().chars() {
                        if let Some(op) = self.local_delete(pos) {
                            ops.push(op);
                        }
                    }
                }
                ChangeTag::Insert => {
                    for ch in change.value().chars() {
                        let op = self.local_insert(pos, ch, actor);
                        ops.push(op);
                        pos += 1;
                    }
                }
            }
        }
        ops
    }
}
