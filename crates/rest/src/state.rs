//! Application state for the registry API.
//!
//! Handlers reach storage only through the [`PatientService`] held here.

use std::sync::Arc;

use tbi_persistence::PatientService;
use tbi_persistence::core::PatientStorage;

use crate::config::ServerConfig;

/// Shared application state for the API.
///
/// # Type Parameters
///
/// * `S` - The storage backend type (must implement [`PatientStorage`])
///
/// # Example
///
/// ```rust,ignore
/// use tbi_rest::{AppState, ServerConfig};
/// use tbi_persistence::backends::sqlite::SqliteBackend;
///
/// let backend = SqliteBackend::in_memory()?;
/// let state = AppState::new(backend, ServerConfig::default());
/// ```
pub struct AppState<S> {
    /// The record service wrapping the storage backend.
    service: Arc<PatientService<S>>,

    /// Server configuration.
    config: Arc<ServerConfig>,
}

// S itself does not need to be Clone
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S: PatientStorage> AppState<S> {
    /// Creates a new AppState around the given backend.
    pub fn new(storage: S, config: ServerConfig) -> Self {
        Self {
            service: Arc::new(PatientService::new(storage)),
            config: Arc::new(config),
        }
    }

    /// Returns the record service.
    pub fn service(&self) -> &PatientService<S> {
        &self.service
    }

    /// Returns the storage backend.
    pub fn storage(&self) -> &S {
        self.service.storage()
    }

    /// Returns a reference to the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
