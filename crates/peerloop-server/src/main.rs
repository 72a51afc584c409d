//! Peerloop Server — Application entry point.

use peerloop_db::{DbConfig, DbManager};
use tracing_subscriber::EnvFilter;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn db_config_from_env() -> DbConfig {
    let defaults = DbConfig::default();
    DbConfig {
        url: env_or("PEERLOOP_DB_URL", &defaults.url),
        namespace: env_or("PEERLOOP_DB_NAMESPACE", &defaults.namespace),
        database: env_or("PEERLOOP_DB_DATABASE", &defaults.database),
        username: env_or("PEERLOOP_DB_USERNAME", &defaults.username),
        password: env_or("PEERLOOP_DB_PASSWORD", &defaults.password),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("peerloop=info".parse().unwrap()),
        )
        .json()
        .init();

    tracing::info!("Starting Peerloop server...");

    let config = db_config_from_env();
    let manager = match DbManager::connect(&config).await {
        Ok(manager) => manager,
        Err(err) => {
            tracing::error!(error = %err, "Failed to connect to SurrealDB");
            std::process::exit(1);
        }
    };

    if let Err(err) = peerloop_db::run_migrations(manager.client()).await {
        tracing::error!(error = %err, "Failed to run migrations");
        std::process::exit(1);
    }

    // TODO: mount the HTTP routing layer on top of the engine services
    tracing::info!("Peerloop server stopped.");
}
