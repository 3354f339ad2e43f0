//! TBI patient registry server.
//!
//! Selects one storage backend from the configured credentials, prepares
//! its schema and serves the registry API.

#[cfg(not(feature = "sqlite"))]
compile_error!("tbi-registry needs the 'sqlite' feature: SQLite is the fallback backend");

use clap::Parser;
use tbi_persistence::core::Backend;
use tbi_persistence::select_backend;
use tbi_rest::{ServerConfig, create_app_with_config, init_logging};
use tracing::{info, warn};

/// Starts the Axum HTTP server.
async fn serve(app: axum::Router, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr();
    info!(address = %addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    let settings = config.storage_settings()?;
    let backend = select_backend(settings)
        .map_err(|e| anyhow::anyhow!("Invalid storage backend configuration: {}", e))?;
    let description = backend.describe();

    info!(
        port = config.port,
        host = %config.host,
        backend = %description.kind,
        "Starting TBI patient registry"
    );

    // A schema that cannot be prepared is not fatal; operations report
    // their own failures.
    if let Err(e) = backend.initialize().await {
        warn!(backend = %description.label, error = %e, "Schema initialization failed");
    }

    let app = create_app_with_config(backend, config.clone());
    serve(app, &config).await
}
