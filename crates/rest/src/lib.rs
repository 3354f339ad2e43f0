//! # tbi-rest - HTTP API for the TBI patient registry
//!
//! This crate exposes the Patient Record Service of `tbi-persistence` as a
//! JSON API: registering patients, recording evolutions, reading the
//! evolution log, cohort statistics and CSV export.
//!
//! ## Backend Support
//!
//! Storage backends are configured through feature flags (all default):
//!
//! - `sqlite` - Local SQLite file, the fallback backend
//! - `sheets` - Google Sheets
//! - `supabase` - Supabase hosted PostgreSQL
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tbi_persistence::backends::sqlite::SqliteBackend;
//! use tbi_persistence::core::Backend;
//! use tbi_rest::{ServerConfig, create_app_with_config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SqliteBackend::open("pacientes.db")?;
//!     backend.initialize().await?;
//!
//!     let config = ServerConfig::default();
//!     let listener = tokio::net::TcpListener::bind(config.socket_addr()).await?;
//!     axum::serve(listener, create_app_with_config(backend, config)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Error Responses
//!
//! Errors carry a JSON body `{"error": "<code>", "message": "<details>"}`;
//! see [`error`] for the status mapping.

// Enforce documentation
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod routing;
pub mod state;

// Re-export commonly used types
pub use config::ServerConfig;
pub use error::{RestError, RestResult};
pub use state::AppState;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tbi_persistence::core::PatientStorage;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Creates the Axum application with default configuration.
pub fn create_app<S>(storage: S) -> Router
where
    S: PatientStorage + Send + Sync + 'static,
{
    create_app_with_config(storage, ServerConfig::default())
}

/// Creates the Axum application with custom configuration.
///
/// # Arguments
///
/// * `storage` - The storage backend, already initialized
/// * `config` - Server configuration
pub fn create_app_with_config<S>(storage: S, config: ServerConfig) -> Router
where
    S: PatientStorage + Send + Sync + 'static,
{
    info!(
        backend = %storage.kind(),
        label = storage.kind().label(),
        "Creating registry API"
    );

    let state = AppState::new(storage, config.clone());
    let router = routing::create_routes(state);

    let service_builder = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            std::time::Duration::from_secs(config.request_timeout),
        ));

    let router = router.layer(DefaultBodyLimit::max(config.max_body_size));

    let router = if config.enable_cors {
        router.layer(build_cors_layer(&config))
    } else {
        router
    };

    router.layer(service_builder)
}

/// Builds the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let mut cors = CorsLayer::new();

    if config.cors_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    if config.cors_methods == "*" {
        cors = cors.allow_methods(Any);
    } else {
        let methods: Vec<_> = config
            .cors_methods
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_methods(methods);
    }

    if config.cors_headers == "*" {
        cors = cors.allow_headers(Any);
    } else {
        let headers: Vec<_> = config
            .cors_headers
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_headers(headers);
    }

    cors
}

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` takes precedence over `level` when set. Call once at startup.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "tbi_registry={level},tbi_rest={level},tbi_persistence={level},tower_http=debug"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
