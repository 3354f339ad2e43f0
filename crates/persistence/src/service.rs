//! Patient record service.
//!
//! [`PatientService`] is the validated surface over a [`PatientStorage`]:
//! it rejects bad input before any persistence call and turns the
//! backend's `false` outcomes into [`RecordError`]s. Record ids are trimmed
//! here, on the way in, for every operation.

use std::io::Write;

use chrono::Utc;
use tracing::{debug, info};

use crate::core::{PatientStorage, append_note};
use crate::error::{RecordError, StorageResult, ValidationError};
use crate::export::write_csv;
use crate::stats::CohortStatistics;
use crate::types::{
    Evolution, Patient, PatientDraft, PatientFilter, PatientUpdate, normalize_record_id,
};

/// Validated operations on patient records.
///
/// The service owns its storage handle; it keeps no state of its own, so
/// every read goes to the backend.
#[derive(Debug)]
pub struct PatientService<S> {
    storage: S,
}

impl<S: PatientStorage> PatientService<S> {
    /// Creates a service over `storage`.
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Returns the underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Registers a new patient.
    ///
    /// # Errors
    ///
    /// * `StorageError::Validation` - If a required field is empty, a value
    ///   is out of range, or the drain pairing is inconsistent
    /// * `StorageError::Record(AlreadyExists)` - If the record id is taken
    pub async fn register(&self, draft: PatientDraft) -> StorageResult<Patient> {
        draft.validate()?;
        let patient = Patient::from_draft(draft, Utc::now());

        if !self.storage.insert_patient(&patient).await? {
            return Err(RecordError::AlreadyExists {
                record_id: patient.record_id,
            }
            .into());
        }

        info!(record_id = %patient.record_id, "Registered patient");
        Ok(patient)
    }

    /// Applies `update` to a patient and appends `note` to its narrative.
    ///
    /// The note is stamped and appended after the stored notes; any `notes`
    /// value carried by `update` is ignored. When the update touches a
    /// tracked field, the backend also writes one evolution entry carrying
    /// `note`.
    ///
    /// # Errors
    ///
    /// * `StorageError::Validation` - If `note` is empty, a supplied value is
    ///   invalid, or the result would pair a drain flag with a mismatched
    ///   drain type
    /// * `StorageError::Record(NotFound)` - If no patient has `record_id`
    pub async fn evolve(
        &self,
        record_id: &str,
        mut update: PatientUpdate,
        note: &str,
    ) -> StorageResult<()> {
        let record_id = normalize_record_id(record_id);
        if note.trim().is_empty() {
            return Err(ValidationError::MissingRequiredField {
                field: "note".to_string(),
            }
            .into());
        }
        update.validate()?;

        let current = self
            .storage
            .fetch_by_record_id(record_id)
            .await?
            .ok_or_else(|| RecordError::NotFound {
                record_id: record_id.to_string(),
            })?;

        let mut merged = current.clone();
        update.apply_to(&mut merged);
        if merged.has_drain != merged.drain_type.is_some() {
            return Err(ValidationError::InconsistentDrain.into());
        }

        update.notes = Some(append_note(&current.notes, note, Utc::now()));
        update.evolution_note = Some(note.trim().to_string());

        if !self.storage.update_patient(record_id, &update).await? {
            return Err(RecordError::NotFound {
                record_id: record_id.to_string(),
            }
            .into());
        }

        debug!(
            record_id = %record_id,
            tracked = update.tracked_fields().len(),
            "Evolved patient"
        );
        Ok(())
    }

    /// Every patient, newest admission first.
    pub async fn list(&self) -> StorageResult<Vec<Patient>> {
        self.storage.fetch_all().await
    }

    /// Patients matching `filter`, newest admission first.
    pub async fn list_filtered(&self, filter: &PatientFilter) -> StorageResult<Vec<Patient>> {
        Ok(filter.apply(self.storage.fetch_all().await?))
    }

    /// The patient with `record_id`, if any.
    pub async fn get(&self, record_id: &str) -> StorageResult<Option<Patient>> {
        self.storage
            .fetch_by_record_id(normalize_record_id(record_id))
            .await
    }

    /// The evolution log of a patient, newest first.
    pub async fn evolutions(&self, record_id: &str) -> StorageResult<Vec<Evolution>> {
        self.storage
            .fetch_evolutions(normalize_record_id(record_id))
            .await
    }

    /// Deletes a patient where the backend supports it.
    ///
    /// # Errors
    ///
    /// * `StorageError::Backend(UnsupportedCapability)` - If the backend
    ///   cannot delete
    /// * `StorageError::Record(NotFound)` - If no patient has `record_id`
    pub async fn remove(&self, record_id: &str) -> StorageResult<()> {
        let record_id = normalize_record_id(record_id);
        if !self.storage.delete_patient(record_id).await? {
            return Err(RecordError::NotFound {
                record_id: record_id.to_string(),
            }
            .into());
        }
        info!(record_id = %record_id, "Removed patient");
        Ok(())
    }

    /// Descriptive statistics over the whole cohort.
    pub async fn statistics(&self) -> StorageResult<CohortStatistics> {
        let patients = self.storage.fetch_all().await?;
        Ok(CohortStatistics::from_patients(&patients))
    }

    /// Writes the full listing as CSV; returns the number of patients.
    pub async fn export_csv<W: Write>(&self, writer: W) -> StorageResult<usize> {
        let patients = self.storage.fetch_all().await?;
        write_csv(&patients, writer)
    }
}
