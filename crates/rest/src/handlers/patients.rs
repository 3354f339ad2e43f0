//! Patient record handlers.
//!
//! - `GET [base]/patients` - List, optionally filtered
//! - `POST [base]/patients` - Register a new patient
//! - `GET [base]/patients/{record_id}` - Read one patient
//! - `DELETE [base]/patients/{record_id}` - Remove a patient (SQLite only)

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tbi_persistence::core::PatientStorage;
use tbi_persistence::types::{FlagFilter, Patient, PatientDraft, PatientFilter, Sex};
use tracing::debug;

use crate::error::{RestError, RestResult};
use crate::state::AppState;

/// Query parameters for the listing.
///
/// ```text
/// GET /patients?sex=female,male&icp=yes&ventilation=any
/// ```
#[derive(Debug, Deserialize, Default)]
pub struct PatientQuery {
    /// Comma-separated sexes to keep; absent keeps all.
    pub sex: Option<String>,

    /// Filter on intracranial pressure monitoring.
    pub icp: Option<FlagFilter>,

    /// Filter on mechanical ventilation.
    pub ventilation: Option<FlagFilter>,
}

impl PatientQuery {
    /// Converts the query into a [`PatientFilter`].
    pub fn into_filter(self) -> RestResult<PatientFilter> {
        let sexes = match self.sex.as_deref() {
            None => Vec::new(),
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<Sex>().map_err(|e| RestError::BadRequest {
                        message: e.to_string(),
                    })
                })
                .collect::<RestResult<Vec<_>>>()?,
        };

        Ok(PatientFilter {
            sexes,
            icp: self.icp.unwrap_or_default(),
            ventilation: self.ventilation.unwrap_or_default(),
        })
    }
}

/// Handler for the patient listing, newest admission first.
pub async fn list_handler<S>(
    State(state): State<AppState<S>>,
    Query(query): Query<PatientQuery>,
) -> RestResult<Json<Vec<Patient>>>
where
    S: PatientStorage + Send + Sync,
{
    let filter = query.into_filter()?;
    debug!(filter = ?filter, "Processing list request");

    let patients = state.service().list_filtered(&filter).await?;
    Ok(Json(patients))
}

/// Handler for registering a patient.
///
/// # Response
///
/// - `201 Created` - Patient stored; body is the stored record
/// - `400 Bad Request` - Validation failed
/// - `409 Conflict` - The record id is already taken
pub async fn create_handler<S>(
    State(state): State<AppState<S>>,
    Json(draft): Json<PatientDraft>,
) -> RestResult<Response>
where
    S: PatientStorage + Send + Sync,
{
    debug!(record_id = %draft.record_id, "Processing create request");

    let patient = state.service().register(draft).await?;
    let location = format!("/patients/{}", patient.record_id);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(patient),
    )
        .into_response())
}

/// Handler for reading one patient.
pub async fn read_handler<S>(
    State(state): State<AppState<S>>,
    Path(record_id): Path<String>,
) -> RestResult<Json<Patient>>
where
    S: PatientStorage + Send + Sync,
{
    debug!(record_id = %record_id, "Processing read request");

    state
        .service()
        .get(&record_id)
        .await?
        .map(Json)
        .ok_or(RestError::NotFound { record_id })
}

/// Handler for removing a patient.
///
/// # Response
///
/// - `204 No Content` - Patient and evolution log removed
/// - `404 Not Found` - No such patient
/// - `501 Not Implemented` - The active backend cannot delete
pub async fn delete_handler<S>(
    State(state): State<AppState<S>>,
    Path(record_id): Path<String>,
) -> RestResult<StatusCode>
where
    S: PatientStorage + Send + Sync,
{
    debug!(record_id = %record_id, "Processing delete request");

    state.service().remove(&record_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_keeps_all() {
        let filter = PatientQuery::default().into_filter().unwrap();
        assert_eq!(filter, PatientFilter::default());
    }

    #[test]
    fn test_sex_list_parsed() {
        let query = PatientQuery {
            sex: Some("female, male".to_string()),
            icp: Some(FlagFilter::Yes),
            ventilation: None,
        };
        let filter = query.into_filter().unwrap();
        assert_eq!(filter.sexes, vec![Sex::Female, Sex::Male]);
        assert_eq!(filter.icp, FlagFilter::Yes);
        assert_eq!(filter.ventilation, FlagFilter::Any);
    }

    #[test]
    fn test_unknown_sex_rejected() {
        let query = PatientQuery {
            sex: Some("other".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            query.into_filter(),
            Err(RestError::BadRequest { .. })
        ));
    }
}
