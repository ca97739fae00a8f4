mod models;
mod registry;
mod schema;

pub use models::{Credential, Delegate, Instance, PermissionLevel, User};
pub use registry::Registry;
