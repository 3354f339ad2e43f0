//! Error types for the registry API.
//!
//! Storage errors from the persistence layer map to HTTP status codes:
//!
//! | Storage Error | HTTP Status | Error Code |
//! |--------------|-------------|-----------------|
//! | Record NotFound | 404 | not-found |
//! | Record AlreadyExists | 409 | duplicate |
//! | Validation | 400 | invalid |
//! | Backend UnsupportedCapability | 501 | not-supported |
//! | Backend Unavailable / ConnectionFailed / PoolExhausted | 503 | unavailable |
//! | Any other backend error | 500 | exception |
//!
//! Every error response carries a JSON body of the form
//! `{"error": "<code>", "message": "<details>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tbi_persistence::error::{BackendError, RecordError, StorageError};
use thiserror::Error;

/// The primary error type for API operations.
#[derive(Debug, Error)]
pub enum RestError {
    /// No patient with this record id (HTTP 404).
    #[error("Patient {record_id} not found")]
    NotFound {
        /// The record id.
        record_id: String,
    },

    /// A patient with this record id already exists (HTTP 409).
    #[error("Patient {record_id} already exists")]
    Duplicate {
        /// The record id.
        record_id: String,
    },

    /// Bad request, usually a validation error (HTTP 400).
    #[error("Bad request: {message}")]
    BadRequest {
        /// Error message.
        message: String,
    },

    /// The active backend cannot perform the operation (HTTP 501).
    #[error("Not implemented: {feature}")]
    NotImplemented {
        /// Description of what's not implemented.
        feature: String,
    },

    /// The backend cannot be reached (HTTP 503).
    #[error("Service unavailable: {message}")]
    ServiceUnavailable {
        /// Error message.
        message: String,
    },

    /// Internal server error (HTTP 500).
    #[error("Internal error: {message}")]
    InternalError {
        /// Error message.
        message: String,
    },
}

impl RestError {
    /// The HTTP status and machine-readable code of this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            RestError::NotFound { .. } => (StatusCode::NOT_FOUND, "not-found"),
            RestError::Duplicate { .. } => (StatusCode::CONFLICT, "duplicate"),
            RestError::BadRequest { .. } => (StatusCode::BAD_REQUEST, "invalid"),
            RestError::NotImplemented { .. } => (StatusCode::NOT_IMPLEMENTED, "not-supported"),
            RestError::ServiceUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
            }
            RestError::InternalError { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "exception")
            }
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        }
        let body = serde_json::json!({
            "error": code,
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for RestError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Record(e) => e.into(),
            StorageError::Validation(e) => RestError::BadRequest {
                message: e.to_string(),
            },
            StorageError::Backend(e) => e.into(),
        }
    }
}

impl From<RecordError> for RestError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::NotFound { record_id } => RestError::NotFound { record_id },
            RecordError::AlreadyExists { record_id } => RestError::Duplicate { record_id },
        }
    }
}

impl From<BackendError> for RestError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::UnsupportedCapability { .. } => RestError::NotImplemented {
                feature: err.to_string(),
            },
            BackendError::Unavailable { .. }
            | BackendError::ConnectionFailed { .. }
            | BackendError::PoolExhausted { .. } => RestError::ServiceUnavailable {
                message: err.to_string(),
            },
            _ => RestError::InternalError {
                message: err.to_string(),
            },
        }
    }
}

/// Result type for API handlers.
pub type RestResult<T> = Result<T, RestError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tbi_persistence::error::ValidationError;

    #[test]
    fn test_not_found_display() {
        let err = RestError::NotFound {
            record_id: "HC-001".to_string(),
        };
        assert_eq!(err.to_string(), "Patient HC-001 not found");
    }

    #[test]
    fn test_record_errors_map() {
        let err: RestError = StorageError::from(RecordError::AlreadyExists {
            record_id: "HC-001".to_string(),
        })
        .into();
        assert_eq!(err.status_and_code(), (StatusCode::CONFLICT, "duplicate"));
    }

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err: RestError = StorageError::from(ValidationError::InconsistentDrain).into();
        assert_eq!(err.status_and_code().0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_backend_errors_map() {
        let unsupported: RestError = BackendError::UnsupportedCapability {
            backend_name: "sheets".to_string(),
            capability: "delete".to_string(),
        }
        .into();
        assert_eq!(unsupported.status_and_code().0, StatusCode::NOT_IMPLEMENTED);

        let unavailable: RestError = BackendError::Unavailable {
            backend_name: "supabase".to_string(),
            message: "401".to_string(),
        }
        .into();
        assert_eq!(
            unavailable.status_and_code().0,
            StatusCode::SERVICE_UNAVAILABLE
        );

        let other: RestError = BackendError::SerializationError {
            message: "bad".to_string(),
        }
        .into();
        assert_eq!(
            other.status_and_code().0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
