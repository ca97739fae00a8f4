mod authority_config;
mod cloud_config;
mod store_config;

pub use authority_config::AuthorityConfig;
pub use cloud_config::CloudConfig;
pub use store_config::StoreConfig;
