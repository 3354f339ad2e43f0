//! Registry route configuration.

use axum::{
    Router,
    routing::{get, post},
};
use tbi_persistence::core::PatientStorage;

use crate::handlers;
use crate::state::AppState;

/// Creates all registry API routes.
///
/// # Routes
///
/// ## Service
/// - `GET /health` - Health check
/// - `GET /_readiness` - Backend reachability
/// - `GET /backend` - Active backend description
///
/// ## Patients
/// - `GET /patients` - List (filters: `sex`, `icp`, `ventilation`)
/// - `POST /patients` - Register
/// - `GET /patients/{record_id}` - Read
/// - `DELETE /patients/{record_id}` - Remove
/// - `POST /patients/{record_id}/evolutions` - Record an evolution
/// - `GET /patients/{record_id}/evolutions` - Evolution log
///
/// ## Reports
/// - `GET /statistics` - Cohort statistics
/// - `GET /export` - CSV export
pub fn create_routes<S>(state: AppState<S>) -> Router
where
    S: PatientStorage + Send + Sync + 'static,
{
    Router::new()
        // Service routes
        .route("/health", get(handlers::health_handler::<S>))
        .route("/_readiness", get(handlers::readiness_handler::<S>))
        .route("/backend", get(handlers::backend_handler::<S>))
        // Patient routes
        .route(
            "/patients",
            get(handlers::list_handler::<S>).post(handlers::create_handler::<S>),
        )
        .route(
            "/patients/{record_id}",
            get(handlers::read_handler::<S>).delete(handlers::delete_handler::<S>),
        )
        .route(
            "/patients/{record_id}/evolutions",
            post(handlers::evolve_handler::<S>).get(handlers::history_handler::<S>),
        )
        // Report routes
        .route("/statistics", get(handlers::statistics_handler::<S>))
        .route("/export", get(handlers::export_handler::<S>))
        // State
        .with_state(state)
}
