//! CSV export of the patient listing.
//!
//! One row per patient, with a header row of column names. Values are
//! written the way they are stored: booleans as `true`/`false`, absent
//! optional values as empty fields.

use std::io::Write;

use chrono::{DateTime, Utc};

use crate::error::StorageResult;
use crate::types::{FieldValue, Patient, PatientColumn};

/// Writes `patients` as CSV and returns the number of data rows.
pub fn write_csv<W: Write>(patients: &[Patient], writer: W) -> StorageResult<usize> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(PatientColumn::headers())?;
    for patient in patients {
        csv.write_record(patient.row_values().iter().map(field_text))?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(patients.len())
}

fn field_text(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(s) => s.clone(),
        FieldValue::Integer(i) => i.to_string(),
        FieldValue::Bool(b) => b.to_string(),
        FieldValue::Null => String::new(),
    }
}

/// Suggested download name, e.g. `pacientes_tec_20240302_091500.csv`.
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("pacientes_tec_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    use crate::types::{PatientDraft, Sex};

    #[test]
    fn test_export_file_name() {
        let now = Utc.with_ymd_and_hms(2024, 3, 2, 9, 15, 0).unwrap();
        assert_eq!(export_file_name(now), "pacientes_tec_20240302_091500.csv");
    }

    #[test]
    fn test_write_csv() {
        let mut draft = PatientDraft::new(
            "HC-001",
            34,
            Sex::Male,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            "Severe TBI, left",
        );
        draft.notes = "line one\nline two".to_string();
        let patient = Patient::from_draft(draft, Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap());

        let mut out = Vec::new();
        assert_eq!(write_csv(&[patient], &mut out).unwrap(), 1);

        let mut reader = csv::Reader::from_reader(out.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 23);
        assert_eq!(&headers[0], "record_id");
        assert_eq!(&headers[22], "updated_at");

        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "HC-001");
        assert_eq!(&rows[0][4], "Severe TBI, left");
        assert_eq!(&rows[0][6], "");
        assert_eq!(&rows[0][8], "false");
        assert_eq!(&rows[0][20], "line one\nline two");
    }

    #[test]
    fn test_write_csv_empty() {
        let mut out = Vec::new();
        assert_eq!(write_csv(&[], &mut out).unwrap(), 0);
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("record_id,age,sex,admission_date"));
        assert_eq!(text.lines().count(), 1);
    }
}
