//! Evolution handlers.
//!
//! - `POST [base]/patients/{record_id}/evolutions` - Record an evolution
//! - `GET [base]/patients/{record_id}/evolutions` - Evolution log, newest first

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tbi_persistence::core::PatientStorage;
use tbi_persistence::types::{Evolution, PatientUpdate};
use tracing::debug;

use crate::error::RestResult;
use crate::state::AppState;

/// Body of an evolution request.
///
/// ```json
/// {"note": "improving", "changes": {"glasgow_current": 11}}
/// ```
#[derive(Debug, Deserialize)]
pub struct EvolveRequest {
    /// Free-text note appended to the patient's notes; required.
    pub note: String,

    /// Sparse set of changed fields.
    #[serde(default)]
    pub changes: PatientUpdate,
}

/// Handler for recording an evolution.
///
/// # Response
///
/// - `204 No Content` - Update applied
/// - `400 Bad Request` - Missing note or invalid values
/// - `404 Not Found` - No such patient
pub async fn evolve_handler<S>(
    State(state): State<AppState<S>>,
    Path(record_id): Path<String>,
    Json(request): Json<EvolveRequest>,
) -> RestResult<StatusCode>
where
    S: PatientStorage + Send + Sync,
{
    debug!(record_id = %record_id, "Processing evolve request");

    state
        .service()
        .evolve(&record_id, request.changes, &request.note)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for the evolution log.
///
/// An unknown record id yields an empty list.
pub async fn history_handler<S>(
    State(state): State<AppState<S>>,
    Path(record_id): Path<String>,
) -> RestResult<Json<Vec<Evolution>>>
where
    S: PatientStorage + Send + Sync,
{
    debug!(record_id = %record_id, "Processing history request");

    Ok(Json(state.service().evolutions(&record_id).await?))
}
