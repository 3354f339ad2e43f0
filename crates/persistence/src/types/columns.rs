//! Column layout shared by every backend.
//!
//! The patient and evolution tables have the same columns in the embedded
//! database, the spreadsheet and the hosted service. This module fixes their
//! order and converts records into backend-neutral [`FieldValue`] cells.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use super::evolution::Evolution;
use super::patient::Patient;
use super::update::PatientUpdate;

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Text, dates and timestamps.
    Text(String),
    /// Integers.
    Integer(i64),
    /// Booleans.
    Bool(bool),
    /// An absent optional value.
    Null,
}

impl FieldValue {
    /// Converts to JSON for the hosted service.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Integer(i) => Value::from(*i),
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Null => Value::Null,
        }
    }

    /// Converts to a spreadsheet cell. Absent values become empty cells.
    pub fn to_cell(&self) -> Value {
        match self {
            FieldValue::Null => Value::String(String::new()),
            other => other.to_json(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<u8> for FieldValue {
    fn from(value: u8) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// Formats a timestamp the way every backend stores it.
pub fn timestamp_text(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

macro_rules! columns {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $column:literal),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[allow(missing_docs)]
        pub enum $name {
            $($variant),*
        }

        impl $name {
            /// Every column in table order.
            pub const ALL: &'static [$name] = &[$($name::$variant),*];

            /// Column (and header) name.
            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $column),*
                }
            }

            /// Zero-based position in table order.
            pub fn index(&self) -> usize {
                *self as usize
            }

            /// Header row in table order.
            pub fn headers() -> Vec<&'static str> {
                Self::ALL.iter().map(|c| c.name()).collect()
            }
        }
    };
}

columns! {
    /// Columns of the patient table.
    PatientColumn {
        RecordId => "record_id",
        Age => "age",
        Sex => "sex",
        AdmissionDate => "admission_date",
        Diagnosis => "diagnosis",
        InjuryOrigin => "injury_origin",
        HelmetUse => "helmet_use",
        AssociatedInjuries => "associated_injuries",
        RequiresIcp => "requires_icp",
        RequiresVentilation => "requires_ventilation",
        RequiresCraniectomy => "requires_craniectomy",
        HasDrain => "has_drain",
        DrainType => "drain_type",
        IcuDaysElapsed => "icu_days_elapsed",
        GlasgowOnAdmission => "glasgow_on_admission",
        GlasgowCurrent => "glasgow_current",
        PostIcuDestination => "post_icu_destination",
        SequelaeMotor => "sequelae_motor",
        SequelaeNeurological => "sequelae_neurological",
        SequelaeCognitive => "sequelae_cognitive",
        Notes => "notes",
        CreatedAt => "created_at",
        UpdatedAt => "updated_at",
    }
}

columns! {
    /// Columns of the evolution table.
    EvolutionColumn {
        RecordId => "record_id",
        RecordedAt => "recorded_at",
        IcuDaysElapsed => "icu_days_elapsed",
        GlasgowCurrent => "glasgow_current",
        RequiresIcp => "requires_icp",
        RequiresVentilation => "requires_ventilation",
        RequiresCraniectomy => "requires_craniectomy",
        Note => "note",
    }
}

impl Patient {
    /// Cell values in [`PatientColumn::ALL`] order.
    pub fn row_values(&self) -> Vec<FieldValue> {
        vec![
            self.record_id.as_str().into(),
            self.age.into(),
            self.sex.as_str().into(),
            self.admission_date.to_string().into(),
            self.diagnosis.as_str().into(),
            self.injury_origin.as_str().into(),
            self.helmet_use.into(),
            self.associated_injuries.as_str().into(),
            self.requires_icp.into(),
            self.requires_ventilation.into(),
            self.requires_craniectomy.into(),
            self.has_drain.into(),
            self.drain_type.map(|d| d.as_str()).into(),
            self.icu_days_elapsed.into(),
            self.glasgow_on_admission.into(),
            self.glasgow_current.into(),
            self.post_icu_destination.as_str().into(),
            self.sequelae_motor.into(),
            self.sequelae_neurological.into(),
            self.sequelae_cognitive.into(),
            self.notes.as_str().into(),
            timestamp_text(&self.created_at).into(),
            timestamp_text(&self.updated_at).into(),
        ]
    }
}

impl Evolution {
    /// Cell values in [`EvolutionColumn::ALL`] order.
    pub fn row_values(&self) -> Vec<FieldValue> {
        vec![
            self.record_id.as_str().into(),
            timestamp_text(&self.recorded_at).into(),
            self.icu_days_elapsed.into(),
            self.glasgow_current.into(),
            self.requires_icp.into(),
            self.requires_ventilation.into(),
            self.requires_craniectomy.into(),
            self.note.as_str().into(),
        ]
    }
}

impl PatientUpdate {
    /// The columns this update writes, with their new values.
    ///
    /// `updated_at` is not included; backends stamp it themselves.
    pub fn assignments(&self) -> Vec<(PatientColumn, FieldValue)> {
        let mut out = Vec::new();
        let mut push = |column: PatientColumn, value: Option<FieldValue>| {
            if let Some(value) = value {
                out.push((column, value));
            }
        };
        push(PatientColumn::Age, self.age.map(Into::into));
        push(PatientColumn::Sex, self.sex.map(|s| s.as_str().into()));
        push(
            PatientColumn::AdmissionDate,
            self.admission_date.map(|d| d.to_string().into()),
        );
        push(PatientColumn::Diagnosis, self.diagnosis.clone().map(Into::into));
        push(
            PatientColumn::InjuryOrigin,
            self.injury_origin.clone().map(Into::into),
        );
        push(PatientColumn::HelmetUse, self.helmet_use.map(Into::into));
        push(
            PatientColumn::AssociatedInjuries,
            self.associated_injuries.clone().map(Into::into),
        );
        push(PatientColumn::RequiresIcp, self.requires_icp.map(Into::into));
        push(
            PatientColumn::RequiresVentilation,
            self.requires_ventilation.map(Into::into),
        );
        push(
            PatientColumn::RequiresCraniectomy,
            self.requires_craniectomy.map(Into::into),
        );
        push(PatientColumn::HasDrain, self.has_drain.map(Into::into));
        push(
            PatientColumn::DrainType,
            self.drain_type.map(|d| d.map(|d| d.as_str()).into()),
        );
        push(
            PatientColumn::IcuDaysElapsed,
            self.icu_days_elapsed.map(Into::into),
        );
        push(
            PatientColumn::GlasgowOnAdmission,
            self.glasgow_on_admission.map(Into::into),
        );
        push(
            PatientColumn::GlasgowCurrent,
            self.glasgow_current.map(Into::into),
        );
        push(
            PatientColumn::PostIcuDestination,
            self.post_icu_destination.map(|d| d.as_str().into()),
        );
        push(PatientColumn::SequelaeMotor, self.sequelae_motor.map(Into::into));
        push(
            PatientColumn::SequelaeNeurological,
            self.sequelae_neurological.map(Into::into),
        );
        push(
            PatientColumn::SequelaeCognitive,
            self.sequelae_cognitive.map(Into::into),
        );
        push(PatientColumn::Notes, self.notes.clone().map(Into::into));
        out
    }
}
