pub mod actor;
pub mod transport;
