use mindcache_authority::actor::InstanceRegistry;
use mindcache_authority::transport::{router, AppState};
use mindcache_core::AuthorityConfig;
use mindcache_registry::Registry;
use mindcache_storage::WriteConnection;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match std::env::var("MINDCACHE_CONFIG_FILE") {
        Ok(path) => AuthorityConfig::from_file(std::path::Path::new(&path))
            .expect("failed to read authority config file"),
        Err(_) => AuthorityConfig::from_env().expect("failed to read authority config"),
    };

    let writer = Arc::new(
        WriteConnection::open(&config.db_path).expect("failed to open entry store"),
    );
    writer
        .with_conn(mindcache_storage::schema::migrate)
        .expect("failed to run entry store migrations");

    let registry_path = config.db_path.with_extension("registry.sqlite3");
    let registry = Arc::new(Registry::open(&registry_path).expect("failed to open registry"));

    let instances = InstanceRegistry::new(writer, registry.clone());
    let state = AppState { registry, instances };

    tracing::info!(bind_addr = %config.bind_addr, "starting mindcached");
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, router(state))
        .await
        .expect("server error");
}
