//! Health and backend description endpoints.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tbi_persistence::core::{Backend, PatientStorage};
use tracing::{debug, warn};

use crate::error::RestResult;
use crate::state::AppState;

/// Description of the active backend.
#[derive(Debug, Serialize)]
pub struct BackendInfo {
    /// Short backend kind (`sqlite`, `sheets`, `supabase`).
    pub kind: String,
    /// Human-readable label.
    pub label: String,
    /// Capability names the backend supports.
    pub capabilities: Vec<String>,
}

impl BackendInfo {
    fn of<B: Backend + ?Sized>(backend: &B) -> Self {
        let kind = backend.kind();
        Self {
            kind: kind.to_string(),
            label: kind.label().to_string(),
            capabilities: backend
                .capabilities()
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Handler for the health check endpoint.
///
/// Always answers while the process is up; the backend is not contacted.
///
/// # HTTP Request
///
/// `GET [base]/health`
pub async fn health_handler<S>(State(state): State<AppState<S>>) -> RestResult<Response>
where
    S: PatientStorage + Send + Sync,
{
    debug!("Processing health check request");

    let health_response = serde_json::json!({
        "status": "healthy",
        "backend": state.storage().kind().to_string(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    });

    Ok((StatusCode::OK, Json(health_response)).into_response())
}

/// Handler for a readiness probe.
///
/// Contacts the backend and answers `503 Service Unavailable` when it
/// cannot be reached.
///
/// # HTTP Request
///
/// `GET [base]/_readiness`
pub async fn readiness_handler<S>(State(state): State<AppState<S>>) -> Response
where
    S: PatientStorage + Send + Sync,
{
    let backend = state.storage();
    match backend.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ready",
                "backend": backend.kind().to_string(),
            })),
        )
            .into_response(),
        Err(e) => {
            warn!(backend = %backend.kind(), error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unavailable",
                    "backend": backend.kind().to_string(),
                    "message": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// Handler describing the active backend.
///
/// # HTTP Request
///
/// `GET [base]/backend`
pub async fn backend_handler<S>(State(state): State<AppState<S>>) -> Json<BackendInfo>
where
    S: PatientStorage + Send + Sync,
{
    Json(BackendInfo::of(state.storage()))
}
