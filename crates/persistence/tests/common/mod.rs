//! Shared fixtures for the persistence integration tests.

#![allow(dead_code)]

use chrono::NaiveDate;

use tbi_persistence::backends::sqlite::SqliteBackend;
use tbi_persistence::types::{InjuryOrigin, PatientDraft, Sex};

/// A fresh in-memory SQLite backend with its schema.
pub fn sqlite_backend() -> SqliteBackend {
    let backend = SqliteBackend::in_memory().expect("Failed to create SQLite backend");
    backend.init_schema().expect("Failed to initialize schema");
    backend
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

/// A minimal valid draft admitted on `admission_date`.
pub fn draft(record_id: &str, admission_date: NaiveDate) -> PatientDraft {
    PatientDraft::new(record_id, 40, Sex::Female, admission_date, "Diffuse axonal injury")
}

/// The motorcycle case used across the scenario tests.
pub fn hc001() -> PatientDraft {
    let mut draft = PatientDraft::new("HC-001", 34, Sex::Male, date(2024, 3, 1), "Severe TBI");
    draft.injury_origin = InjuryOrigin::MOTORCYCLE_ACCIDENT.to_string();
    draft.helmet_use = Some(false);
    draft.glasgow_on_admission = 8;
    draft.glasgow_current = 8;
    draft.requires_icp = true;
    draft.notes = "Admitted from the emergency room".to_string();
    draft
}
