//! Statistics and CSV export handlers.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tbi_persistence::CohortStatistics;
use tbi_persistence::core::PatientStorage;
use tbi_persistence::export::export_file_name;
use tracing::{debug, info};

use crate::error::RestResult;
use crate::state::AppState;

/// Handler for cohort statistics.
///
/// # HTTP Request
///
/// `GET [base]/statistics`
pub async fn statistics_handler<S>(
    State(state): State<AppState<S>>,
) -> RestResult<Json<CohortStatistics>>
where
    S: PatientStorage + Send + Sync,
{
    debug!("Processing statistics request");

    Ok(Json(state.service().statistics().await?))
}

/// Handler for the CSV export of the full listing.
///
/// Answers with a `text/csv` attachment named
/// `pacientes_tec_YYYYMMDD_HHMMSS.csv`.
///
/// # HTTP Request
///
/// `GET [base]/export`
pub async fn export_handler<S>(State(state): State<AppState<S>>) -> RestResult<Response>
where
    S: PatientStorage + Send + Sync,
{
    let mut body = Vec::new();
    let count = state.service().export_csv(&mut body).await?;
    let file_name = export_file_name(chrono::Utc::now());

    info!(patients = count, file = %file_name, "Exported patient listing");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        body,
    )
        .into_response())
}
