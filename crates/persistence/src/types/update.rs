//! Sparse patient updates.
//!
//! A [`PatientUpdate`] carries only the fields a caller wants to change.
//! Omitted fields are left untouched by every backend. Nullable columns use
//! `Option<Option<_>>` so that clearing a value is distinct from not
//! touching it.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

use super::patient::{AGE_RANGE, GLASGOW_RANGE, Patient, check_range, require_text};
use super::vocabulary::{DrainType, PostIcuDestination, Sex};

/// Fields whose change is recorded in the evolution log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedField {
    /// `icu_days_elapsed`
    IcuDaysElapsed,
    /// `glasgow_current`
    GlasgowCurrent,
    /// `requires_icp`
    RequiresIcp,
    /// `requires_ventilation`
    RequiresVentilation,
    /// `requires_craniectomy`
    RequiresCraniectomy,
}

impl TrackedField {
    /// All tracked fields.
    pub const ALL: [TrackedField; 5] = [
        TrackedField::IcuDaysElapsed,
        TrackedField::GlasgowCurrent,
        TrackedField::RequiresIcp,
        TrackedField::RequiresVentilation,
        TrackedField::RequiresCraniectomy,
    ];

    /// Column name of the field.
    pub fn name(&self) -> &'static str {
        match self {
            TrackedField::IcuDaysElapsed => "icu_days_elapsed",
            TrackedField::GlasgowCurrent => "glasgow_current",
            TrackedField::RequiresIcp => "requires_icp",
            TrackedField::RequiresVentilation => "requires_ventilation",
            TrackedField::RequiresCraniectomy => "requires_craniectomy",
        }
    }
}

/// A sparse set of field changes for one patient.
///
/// # Examples
///
/// ```
/// use tbi_persistence::types::{PatientUpdate, TrackedField};
///
/// let update = PatientUpdate {
///     glasgow_current: Some(11),
///     ..Default::default()
/// };
/// assert_eq!(update.tracked_fields(), vec![TrackedField::GlasgowCurrent]);
/// ```
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<Sex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admission_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injury_origin: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub helmet_use: Option<Option<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associated_injuries: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_icp: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_ventilation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_craniectomy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_drain: Option<bool>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub drain_type: Option<Option<DrainType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icu_days_elapsed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glasgow_on_admission: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glasgow_current: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_icu_destination: Option<PostIcuDestination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequelae_motor: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequelae_neurological: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequelae_cognitive: Option<bool>,

    /// Full replacement value of the notes column.
    ///
    /// The record service fills this with the existing narrative plus the
    /// new timestamped entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Note written to the evolution entry, never to the patient row.
    #[serde(skip)]
    pub evolution_note: Option<String>,
}

/// Keeps an explicit `null` distinct from an absent field.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl PatientUpdate {
    /// Returns the tracked fields present in this update.
    pub fn tracked_fields(&self) -> Vec<TrackedField> {
        TrackedField::ALL
            .into_iter()
            .filter(|field| match field {
                TrackedField::IcuDaysElapsed => self.icu_days_elapsed.is_some(),
                TrackedField::GlasgowCurrent => self.glasgow_current.is_some(),
                TrackedField::RequiresIcp => self.requires_icp.is_some(),
                TrackedField::RequiresVentilation => self.requires_ventilation.is_some(),
                TrackedField::RequiresCraniectomy => self.requires_craniectomy.is_some(),
            })
            .collect()
    }

    /// Returns true if no column would change.
    pub fn is_empty(&self) -> bool {
        let stripped = PatientUpdate {
            evolution_note: None,
            ..self.clone()
        };
        stripped == PatientUpdate::default()
    }

    /// Validates the supplied fields only.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(diagnosis) = &self.diagnosis {
            require_text("diagnosis", diagnosis)?;
        }
        if self.sex == Some(Sex::Unknown) {
            return Err(ValidationError::InvalidValue {
                field: "sex".to_string(),
                message: "must be male or female".to_string(),
            });
        }
        if let Some(age) = self.age {
            check_range("age", age, AGE_RANGE)?;
        }
        if let Some(glasgow) = self.glasgow_on_admission {
            check_range("glasgow_on_admission", glasgow, GLASGOW_RANGE)?;
        }
        if let Some(glasgow) = self.glasgow_current {
            check_range("glasgow_current", glasgow, GLASGOW_RANGE)?;
        }
        if let (Some(has_drain), Some(drain_type)) = (self.has_drain, self.drain_type) {
            if has_drain != drain_type.is_some() {
                return Err(ValidationError::InconsistentDrain);
            }
        }
        Ok(())
    }

    /// Applies the supplied fields to `patient` in place.
    ///
    /// Timestamps are not touched.
    pub fn apply_to(&self, patient: &mut Patient) {
        macro_rules! assign {
            ($source:ident => $target:ident: $($field:ident),* $(,)?) => {
                $(
                    if let Some(value) = &$source.$field {
                        $target.$field = value.clone();
                    }
                )*
            };
        }
        let source = self;
        assign!(
            source => patient:
            age,
            sex,
            admission_date,
            diagnosis,
            injury_origin,
            helmet_use,
            associated_injuries,
            requires_icp,
            requires_ventilation,
            requires_craniectomy,
            has_drain,
            drain_type,
            icu_days_elapsed,
            glasgow_on_admission,
            glasgow_current,
            post_icu_destination,
            sequelae_motor,
            sequelae_neurological,
            sequelae_cognitive,
            notes,
        );
    }
}
