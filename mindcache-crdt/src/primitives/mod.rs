mod gcounter;
mod lww_register;
mod mv_register;
mod or_set;
mod vector_clock;

pub use gcounter::GCounter;
pub use lww_register::{LWWDelta, LWWRegister};
pub use mv_register::MVRegister;
pub use or_set::{ORSet, UniqueTag};
pub use vector_clock::VectorClock;
