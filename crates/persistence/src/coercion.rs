//! Lenient decoding of rows from the remote backends.
//!
//! Spreadsheets and PostgREST hand back loosely typed JSON: booleans arrive
//! as `"TRUE"`, numbers as strings, empty cells as `""`. The functions here
//! never fail on malformed input. Booleans default to `false`, numbers to
//! `0`, and enumerations to their default or `None`.
//!
//! [`patient_from_row`] and [`evolution_from_row`] are the single decoders
//! used by both the Sheets and Supabase backends.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use tracing::warn;

use crate::types::{
    DrainType, Evolution, EvolutionColumn, Patient, PatientColumn, PostIcuDestination, Sex,
};

/// Normalizes a boolean-like value.
///
/// `true`, `"TRUE"`, `"True"` and `"true"` are true, as is a non-zero number.
/// Everything else, including `null` and `""`, is false.
pub fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

/// Like [`coerce_bool`], but `null` and empty strings stay absent.
pub fn coerce_optional_bool(value: &Value) -> Option<bool> {
    if is_blank(value) {
        None
    } else {
        Some(coerce_bool(value))
    }
}

/// Parses an integer, defaulting to `0` on anything unparseable.
pub fn coerce_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
                .unwrap_or(0)
        }
        Value::Bool(b) => i64::from(*b),
        _ => 0,
    }
}

/// Like [`coerce_int`], but `null` and empty strings stay absent.
pub fn coerce_optional_int(value: &Value) -> Option<i64> {
    if is_blank(value) {
        None
    } else {
        Some(coerce_int(value))
    }
}

/// Returns the value as text; `null` becomes the empty string.
pub fn coerce_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Parses a calendar date.
///
/// Accepts `YYYY-MM-DD`, a timestamp whose date part is `YYYY-MM-DD`, and
/// `DD/MM/YYYY` as entered in spreadsheets by hand.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    let text = coerce_text(value);
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    if let Some(prefix) = text.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Some(date);
        }
    }
    NaiveDate::parse_from_str(text, "%d/%m/%Y").ok()
}

/// Parses a timestamp, defaulting to the Unix epoch.
///
/// Accepts RFC 3339 and naive `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DDTHH:MM:SS`
/// forms, the latter read as UTC.
pub fn parse_timestamp(value: &Value) -> DateTime<Utc> {
    let text = coerce_text(value);
    let text = text.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return at.with_timezone(&Utc);
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return naive.and_utc();
        }
    }
    DateTime::<Utc>::default()
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn small_int<T: TryFrom<i64> + Default>(value: &Value) -> T {
    T::try_from(coerce_int(value)).unwrap_or_default()
}

fn small_optional_int<T: TryFrom<i64>>(value: &Value) -> Option<T> {
    coerce_optional_int(value).and_then(|n| T::try_from(n).ok())
}

struct Row<'a>(&'a Map<String, Value>);

impl Row<'_> {
    fn get(&self, column: &str) -> &Value {
        self.0.get(column).unwrap_or(&Value::Null)
    }
}

/// Decodes a patient row.
///
/// Returns `None` only for rows without a `record_id`, for example a row
/// cleared by a rejected duplicate append. An unreadable `sex` decodes as
/// [`Sex::Unknown`] and an unreadable `admission_date` falls back to the
/// registration date, both with a warning, so the patient stays in the
/// listing.
pub fn patient_from_row(map: &Map<String, Value>) -> Option<Patient> {
    let row = Row(map);
    let record_id = coerce_text(row.get(PatientColumn::RecordId.name()))
        .trim()
        .to_string();
    if record_id.is_empty() {
        return None;
    }

    let created_at = parse_timestamp(row.get(PatientColumn::CreatedAt.name()));
    let sex = coerce_text(row.get(PatientColumn::Sex.name()))
        .parse::<Sex>()
        .unwrap_or_else(|e| {
            warn!(record_id = %record_id, error = %e, "Unreadable sex, keeping patient as unknown");
            Sex::Unknown
        });
    let admission_date = parse_date(row.get(PatientColumn::AdmissionDate.name()))
        .unwrap_or_else(|| {
            warn!(record_id = %record_id, "Unreadable admission_date, using registration date");
            created_at.date_naive()
        });

    let drain_text = coerce_text(row.get(PatientColumn::DrainType.name()));
    let drain_type = if drain_text.trim().is_empty() {
        None
    } else {
        match drain_text.parse::<DrainType>() {
            Ok(drain) => Some(drain),
            Err(e) => {
                warn!(record_id = %record_id, error = %e, "Ignoring unreadable drain_type");
                None
            }
        }
    };

    let post_icu_destination = coerce_text(row.get(PatientColumn::PostIcuDestination.name()))
        .parse::<PostIcuDestination>()
        .unwrap_or_default();

    Some(Patient {
        age: small_int(row.get(PatientColumn::Age.name())),
        sex,
        admission_date,
        diagnosis: coerce_text(row.get(PatientColumn::Diagnosis.name())),
        injury_origin: coerce_text(row.get(PatientColumn::InjuryOrigin.name())),
        helmet_use: coerce_optional_bool(row.get(PatientColumn::HelmetUse.name())),
        associated_injuries: coerce_text(row.get(PatientColumn::AssociatedInjuries.name())),
        requires_icp: coerce_bool(row.get(PatientColumn::RequiresIcp.name())),
        requires_ventilation: coerce_bool(row.get(PatientColumn::RequiresVentilation.name())),
        requires_craniectomy: coerce_bool(row.get(PatientColumn::RequiresCraniectomy.name())),
        has_drain: coerce_bool(row.get(PatientColumn::HasDrain.name())),
        drain_type,
        icu_days_elapsed: small_int(row.get(PatientColumn::IcuDaysElapsed.name())),
        glasgow_on_admission: small_int(row.get(PatientColumn::GlasgowOnAdmission.name())),
        glasgow_current: small_int(row.get(PatientColumn::GlasgowCurrent.name())),
        post_icu_destination,
        sequelae_motor: coerce_bool(row.get(PatientColumn::SequelaeMotor.name())),
        sequelae_neurological: coerce_bool(row.get(PatientColumn::SequelaeNeurological.name())),
        sequelae_cognitive: coerce_bool(row.get(PatientColumn::SequelaeCognitive.name())),
        notes: coerce_text(row.get(PatientColumn::Notes.name())),
        created_at,
        updated_at: parse_timestamp(row.get(PatientColumn::UpdatedAt.name())),
        record_id,
    })
}

/// Decodes an evolution row. Rows without a `record_id` are skipped.
pub fn evolution_from_row(map: &Map<String, Value>) -> Option<Evolution> {
    let row = Row(map);
    let record_id = coerce_text(row.get(EvolutionColumn::RecordId.name()))
        .trim()
        .to_string();
    if record_id.is_empty() {
        return None;
    }
    Some(Evolution {
        recorded_at: parse_timestamp(row.get(EvolutionColumn::RecordedAt.name())),
        icu_days_elapsed: small_optional_int(row.get(EvolutionColumn::IcuDaysElapsed.name())),
        glasgow_current: small_optional_int(row.get(EvolutionColumn::GlasgowCurrent.name())),
        requires_icp: coerce_optional_bool(row.get(EvolutionColumn::RequiresIcp.name())),
        requires_ventilation: coerce_optional_bool(
            row.get(EvolutionColumn::RequiresVentilation.name()),
        ),
        requires_craniectomy: coerce_optional_bool(
            row.get(EvolutionColumn::RequiresCraniectomy.name()),
        ),
        note: coerce_text(row.get(EvolutionColumn::Note.name())),
        record_id,
    })
}
