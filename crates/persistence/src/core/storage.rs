//! Patient storage contract.
//!
//! This module defines the [`PatientStorage`] trait implemented by every
//! backend. The record service and the HTTP layer only ever talk to this
//! trait, so they never branch on which backend is active.

use async_trait::async_trait;

use crate::error::{BackendError, StorageError, StorageResult};
use crate::types::{Evolution, Patient, PatientUpdate};

use super::backend::Backend;

/// Persistence contract for patients and their evolution log.
///
/// # Duplicate and unknown identifiers
///
/// `insert_patient` and `update_patient` report a duplicate or unknown
/// `record_id` as `Ok(false)`, not as an error. Errors are reserved for the
/// backend itself failing (unreachable service, bad credentials, corrupt
/// database).
///
/// # History coupling
///
/// When an update carries any of the tracked fields (see
/// [`TrackedField`](crate::types::TrackedField)), the backend appends
/// exactly one [`Evolution`] as part of the same call. The entry is built
/// by [`evolution_for_update`](super::history::evolution_for_update).
///
/// # Example
///
/// ```ignore
/// use tbi_persistence::core::PatientStorage;
/// use tbi_persistence::types::{Patient, PatientUpdate};
///
/// async fn example<S: PatientStorage>(storage: &S, patient: Patient) -> StorageResult<()> {
///     assert!(storage.insert_patient(&patient).await?);
///
///     let update = PatientUpdate {
///         glasgow_current: Some(11),
///         ..Default::default()
///     };
///     assert!(storage.update_patient(&patient.record_id, &update).await?);
///
///     let history = storage.fetch_evolutions(&patient.record_id).await?;
///     assert_eq!(history.len(), 1);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait PatientStorage: Backend {
    /// Inserts a new patient.
    ///
    /// # Returns
    ///
    /// `true` if the row was written, `false` if a patient with the same
    /// `record_id` already exists. The existing row is never modified.
    ///
    /// # Errors
    ///
    /// * `StorageError::Backend` - If the backend could not be reached
    async fn insert_patient(&self, patient: &Patient) -> StorageResult<bool>;

    /// Returns every patient, newest admission first.
    ///
    /// An empty table yields an empty vector.
    async fn fetch_all(&self) -> StorageResult<Vec<Patient>>;

    /// Returns the patient with the given record identifier, if any.
    async fn fetch_by_record_id(&self, record_id: &str) -> StorageResult<Option<Patient>>;

    /// Applies a sparse update and stamps `updated_at`.
    ///
    /// # Returns
    ///
    /// `false` if no patient has this `record_id`; no evolution is written
    /// in that case.
    async fn update_patient(&self, record_id: &str, update: &PatientUpdate)
    -> StorageResult<bool>;

    /// Returns the evolution log for a patient, newest first.
    async fn fetch_evolutions(&self, record_id: &str) -> StorageResult<Vec<Evolution>>;

    /// Permanently deletes a patient and its evolutions.
    ///
    /// Backends without the `Delete` capability report
    /// `BackendError::UnsupportedCapability`.
    ///
    /// # Returns
    ///
    /// `false` if no patient has this `record_id`.
    async fn delete_patient(&self, record_id: &str) -> StorageResult<bool> {
        let _ = record_id;
        Err(StorageError::Backend(BackendError::UnsupportedCapability {
            backend_name: self.name().to_string(),
            capability: "delete".to_string(),
        }))
    }
}
