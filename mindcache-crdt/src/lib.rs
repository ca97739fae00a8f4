pub mod document;
pub mod primitives;

pub use document::{DocCrdt, DocOp, ElementId};
pub use primitives::{GCounter, LWWRegister, MVRegister, ORSet, UniqueTag, VectorClock};
