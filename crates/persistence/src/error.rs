//! Error types for the persistence layer.
//!
//! Errors are split into three categories: record state errors (duplicate
//! or unknown clinical record identifiers), validation errors caught before
//! any persistence call, and backend errors raised while talking to the
//! selected storage backend.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all storage and record-service operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Record state errors
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl StorageError {
    /// Returns true if this error is a duplicate record identifier.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StorageError::Record(RecordError::AlreadyExists { .. }))
    }

    /// Returns true if this error reports an unknown record identifier.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::Record(RecordError::NotFound { .. }))
    }

    /// Returns true if this error was raised before reaching the backend.
    pub fn is_validation(&self) -> bool {
        matches!(self, StorageError::Validation(_))
    }
}

/// Errors related to patient record state.
#[derive(Error, Debug)]
pub enum RecordError {
    /// No patient exists with the given clinical record identifier.
    #[error("patient not found: {record_id}")]
    NotFound { record_id: String },

    /// A patient with the given clinical record identifier already exists.
    #[error("patient already exists: {record_id}")]
    AlreadyExists { record_id: String },
}

/// Errors raised by field validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was empty.
    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },

    /// A numeric field was outside its allowed range.
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: String,
        value: i64,
        min: i64,
        max: i64,
    },

    /// Drain presence and drain type disagree.
    #[error("drain_type must be set if and only if has_drain is true")]
    InconsistentDrain,

    /// A field value could not be interpreted.
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Errors originating from the storage backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend could not be reached (network or credential failure).
    #[error("backend unavailable: {backend_name}: {message}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Connection pool exhausted.
    #[error("connection pool exhausted for {backend_name}")]
    PoolExhausted { backend_name: String },

    /// The requested capability is not supported by this backend.
    #[error("capability '{capability}' not supported by {backend_name}")]
    UnsupportedCapability {
        backend_name: String,
        capability: String,
    },

    /// The backend rejected a request.
    #[error("request to {backend_name} failed with status {status}: {message}")]
    RequestFailed {
        backend_name: String,
        status: u16,
        message: String,
    },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },

    /// Invalid backend configuration.
    #[error("invalid configuration for {backend_name}: {message}")]
    Configuration {
        backend_name: String,
        message: String,
    },
}

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

impl From<csv::Error> for StorageError {
    fn from(err: csv::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Internal {
            backend_name: "unknown".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for StorageError {
    fn from(_err: r2d2::Error) -> Self {
        StorageError::Backend(BackendError::PoolExhausted {
            backend_name: "sqlite".to_string(),
        })
    }
}

#[cfg(any(feature = "sheets", feature = "supabase"))]
impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        let backend_name = "remote".to_string();
        if err.is_connect() || err.is_timeout() {
            StorageError::Backend(BackendError::Unavailable {
                backend_name,
                message: err.to_string(),
            })
        } else if err.is_decode() {
            StorageError::Backend(BackendError::SerializationError {
                message: err.to_string(),
            })
        } else {
            StorageError::Backend(BackendError::Internal {
                backend_name,
                message: err.to_string(),
                source: Some(Box::new(err)),
            })
        }
    }
}
