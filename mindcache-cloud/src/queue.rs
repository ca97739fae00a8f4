use mindcache_core::errors::CloudError;
use mindcache_core::{Attributes, Value};
use std::collections::VecDeque;

/// A mutation waiting to be sent once the adapter reaches `Ready`.
#[derive(Debug, Clone)]
pub enum WireOp {
    Set {
        key: String,
        value: Value,
        attributes: Attributes,
    },
    Delete {
        key: String,
    },
    DocUpdate {
        key: String,
        op_bytes: Vec<u8>,
    },
}

/// A bounded queue of outbound writes. Overflow is classified `Transient`
/// (§9 "no unbounded queue") rather than silently dropping writes or
/// blocking the caller.
pub struct OutboundQueue {
    items: VecDeque<WireOp>,
    cap: usize,
}

impl OutboundQueue {
    pub fn new(cap: usize) -> Self {
        Self {
            items: VecDeque::new(),
            cap,
        }
    }

    pub fn push(&mut self, op: WireOp) -> Result<(), CloudError> {
        if self.items.len() >= self.cap {
            return Err(CloudError::Transient {
                reason: format!("outbound queue is full (cap {})", self.cap),
            });
        }
        self.items.push_back(op);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<WireOp> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WireOp> {
        self.items.iter()
    }
}
