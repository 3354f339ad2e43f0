//! Patient record types.
//!
//! A [`Patient`] is one row per clinical record identifier. A
//! [`PatientDraft`] is what a clinician submits on admission: every patient
//! attribute except the two system-maintained timestamps.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::vocabulary::{DrainType, PostIcuDestination, Sex};

/// Inclusive bounds of the Glasgow Coma Scale.
pub const GLASGOW_RANGE: (u8, u8) = (3, 15);

/// Inclusive bounds accepted for patient age.
pub const AGE_RANGE: (u8, u8) = (0, 120);

/// A registered TBI patient.
///
/// Field names double as column and header names in every backend and in
/// the CSV export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    /// Clinical chart number. Unique across all patients.
    pub record_id: String,

    /// Age in years.
    pub age: u8,

    /// Patient sex.
    pub sex: Sex,

    /// Date of ICU admission.
    pub admission_date: NaiveDate,

    /// Free-text diagnosis.
    pub diagnosis: String,

    /// Mechanism of injury, from [`InjuryOrigin`](super::InjuryOrigin) or free text.
    pub injury_origin: String,

    /// Whether a helmet was worn. Only meaningful for motorcycle incidents.
    pub helmet_use: Option<bool>,

    /// Injuries associated with the TBI.
    pub associated_injuries: String,

    /// Intracranial pressure monitoring.
    pub requires_icp: bool,

    /// Mechanical ventilation.
    pub requires_ventilation: bool,

    /// Decompressive craniectomy.
    pub requires_craniectomy: bool,

    /// Whether a drain was placed.
    pub has_drain: bool,

    /// Drain type; set iff `has_drain` is true.
    pub drain_type: Option<DrainType>,

    /// Days spent in the ICU so far.
    pub icu_days_elapsed: u32,

    /// Glasgow score at admission.
    pub glasgow_on_admission: u8,

    /// Most recent Glasgow score.
    pub glasgow_current: u8,

    /// Destination after the ICU stay.
    pub post_icu_destination: PostIcuDestination,

    /// Motor sequelae.
    pub sequelae_motor: bool,

    /// Neurological sequelae.
    pub sequelae_neurological: bool,

    /// Cognitive sequelae.
    pub sequelae_cognitive: bool,

    /// Append-only clinical narrative.
    pub notes: String,

    /// When the patient was registered.
    pub created_at: DateTime<Utc>,

    /// When the patient was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    /// Builds a stored patient from a draft, stamping both timestamps with `now`.
    pub fn from_draft(draft: PatientDraft, now: DateTime<Utc>) -> Self {
        Self {
            record_id: normalize_record_id(&draft.record_id).to_string(),
            age: draft.age,
            sex: draft.sex,
            admission_date: draft.admission_date,
            diagnosis: draft.diagnosis,
            injury_origin: draft.injury_origin,
            helmet_use: draft.helmet_use,
            associated_injuries: draft.associated_injuries,
            requires_icp: draft.requires_icp,
            requires_ventilation: draft.requires_ventilation,
            requires_craniectomy: draft.requires_craniectomy,
            has_drain: draft.has_drain,
            drain_type: draft.drain_type,
            icu_days_elapsed: draft.icu_days_elapsed,
            glasgow_on_admission: draft.glasgow_on_admission,
            glasgow_current: draft.glasgow_current,
            post_icu_destination: draft.post_icu_destination,
            sequelae_motor: draft.sequelae_motor,
            sequelae_neurological: draft.sequelae_neurological,
            sequelae_cognitive: draft.sequelae_cognitive,
            notes: draft.notes,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the clinician-entered attributes, dropping system timestamps.
    pub fn draft(&self) -> PatientDraft {
        PatientDraft {
            record_id: self.record_id.clone(),
            age: self.age,
            sex: self.sex,
            admission_date: self.admission_date,
            diagnosis: self.diagnosis.clone(),
            injury_origin: self.injury_origin.clone(),
            helmet_use: self.helmet_use,
            associated_injuries: self.associated_injuries.clone(),
            requires_icp: self.requires_icp,
            requires_ventilation: self.requires_ventilation,
            requires_craniectomy: self.requires_craniectomy,
            has_drain: self.has_drain,
            drain_type: self.drain_type,
            icu_days_elapsed: self.icu_days_elapsed,
            glasgow_on_admission: self.glasgow_on_admission,
            glasgow_current: self.glasgow_current,
            post_icu_destination: self.post_icu_destination,
            sequelae_motor: self.sequelae_motor,
            sequelae_neurological: self.sequelae_neurological,
            sequelae_cognitive: self.sequelae_cognitive,
            notes: self.notes.clone(),
        }
    }
}

/// A patient as submitted for registration.
///
/// Fields carry the same meaning as on [`Patient`].
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientDraft {
    pub record_id: String,
    pub age: u8,
    pub sex: Sex,
    pub admission_date: NaiveDate,
    pub diagnosis: String,
    #[serde(default)]
    pub injury_origin: String,
    #[serde(default)]
    pub helmet_use: Option<bool>,
    #[serde(default)]
    pub associated_injuries: String,
    #[serde(default)]
    pub requires_icp: bool,
    #[serde(default)]
    pub requires_ventilation: bool,
    #[serde(default)]
    pub requires_craniectomy: bool,
    #[serde(default)]
    pub has_drain: bool,
    #[serde(default)]
    pub drain_type: Option<DrainType>,
    #[serde(default)]
    pub icu_days_elapsed: u32,
    #[serde(default = "default_glasgow")]
    pub glasgow_on_admission: u8,
    #[serde(default = "default_glasgow")]
    pub glasgow_current: u8,
    #[serde(default)]
    pub post_icu_destination: PostIcuDestination,
    #[serde(default)]
    pub sequelae_motor: bool,
    #[serde(default)]
    pub sequelae_neurological: bool,
    #[serde(default)]
    pub sequelae_cognitive: bool,
    #[serde(default)]
    pub notes: String,
}

fn default_glasgow() -> u8 {
    GLASGOW_RANGE.1
}

impl PatientDraft {
    /// Creates a draft with the required attributes and neutral defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use tbi_persistence::types::{PatientDraft, Sex};
    ///
    /// let draft = PatientDraft::new(
    ///     "HC-001",
    ///     34,
    ///     Sex::Male,
    ///     NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
    ///     "Severe TBI",
    /// );
    /// assert!(draft.validate().is_ok());
    /// assert_eq!(draft.glasgow_current, 15);
    /// ```
    pub fn new(
        record_id: impl Into<String>,
        age: u8,
        sex: Sex,
        admission_date: NaiveDate,
        diagnosis: impl Into<String>,
    ) -> Self {
        Self {
            record_id: record_id.into(),
            age,
            sex,
            admission_date,
            diagnosis: diagnosis.into(),
            injury_origin: String::new(),
            helmet_use: None,
            associated_injuries: String::new(),
            requires_icp: false,
            requires_ventilation: false,
            requires_craniectomy: false,
            has_drain: false,
            drain_type: None,
            icu_days_elapsed: 0,
            glasgow_on_admission: default_glasgow(),
            glasgow_current: default_glasgow(),
            post_icu_destination: PostIcuDestination::default(),
            sequelae_motor: false,
            sequelae_neurological: false,
            sequelae_cognitive: false,
            notes: String::new(),
        }
    }

    /// Checks required fields, ranges and the drain pairing.
    ///
    /// The record id is checked after trimming, the form in which it is
    /// stored.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_record_id(&self.record_id)?;
        require_text("diagnosis", &self.diagnosis)?;
        if self.sex == Sex::Unknown {
            return Err(ValidationError::InvalidValue {
                field: "sex".to_string(),
                message: "must be male or female".to_string(),
            });
        }
        check_range("age", self.age, AGE_RANGE)?;
        check_range("glasgow_on_admission", self.glasgow_on_admission, GLASGOW_RANGE)?;
        check_range("glasgow_current", self.glasgow_current, GLASGOW_RANGE)?;
        if self.has_drain != self.drain_type.is_some() {
            return Err(ValidationError::InconsistentDrain);
        }
        Ok(())
    }
}

/// Trims surrounding whitespace from a record id.
///
/// Every backend matches record ids in this form.
pub fn normalize_record_id(record_id: &str) -> &str {
    record_id.trim()
}

fn check_record_id(record_id: &str) -> Result<(), ValidationError> {
    require_text("record_id", record_id)?;
    if normalize_record_id(record_id).chars().any(char::is_control) {
        return Err(ValidationError::InvalidValue {
            field: "record_id".to_string(),
            message: "must not contain control characters".to_string(),
        });
    }
    Ok(())
}

pub(crate) fn require_text(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingRequiredField {
            field: field.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn check_range(field: &str, value: u8, (min, max): (u8, u8)) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value: i64::from(value),
            min: i64::from(min),
            max: i64::from(max),
        });
    }
    Ok(())
}
