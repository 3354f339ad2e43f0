//! PatientStorage implementation for SQLite.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{ToSqlOutput, Type, Value as SqlValue, ValueRef};
use rusqlite::{ErrorCode, OptionalExtension, Row, ToSql, params, params_from_iter};
use tracing::{debug, info};

use crate::core::{PatientStorage, evolution_for_update};
use crate::error::{BackendError, StorageError, StorageResult};
use crate::types::{
    DrainType, Evolution, EvolutionColumn, FieldValue, Patient, PatientColumn, PatientUpdate,
    timestamp_text,
};

use super::SqliteBackend;

fn internal_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::Internal {
        backend_name: "sqlite".to_string(),
        message,
        source: None,
    })
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            FieldValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            FieldValue::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            FieldValue::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            FieldValue::Null => ToSqlOutput::Owned(SqlValue::Null),
        })
    }
}

fn column_list<T>(columns: &[T], name: impl Fn(&T) -> &'static str) -> String {
    columns.iter().map(name).collect::<Vec<_>>().join(", ")
}

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn patient_select() -> String {
    format!(
        "SELECT {} FROM patients",
        column_list(PatientColumn::ALL, PatientColumn::name)
    )
}

fn evolution_select() -> String {
    format!(
        "SELECT {} FROM evolutions",
        column_list(EvolutionColumn::ALL, EvolutionColumn::name)
    )
}

fn conversion_error<E>(index: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
}

fn parsed<T>(row: &Row<'_>, column: PatientColumn) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(column.index())?;
    text.parse::<T>()
        .map_err(|e| conversion_error(column.index(), e))
}

fn timestamp(row: &Row<'_>, index: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(index)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| conversion_error(index, e))
}

fn read_patient(row: &Row<'_>) -> rusqlite::Result<Patient> {
    let drain_type: Option<String> = row.get(PatientColumn::DrainType.index())?;
    let drain_type = drain_type
        .map(|text| {
            text.parse::<DrainType>()
                .map_err(|e| conversion_error(PatientColumn::DrainType.index(), e))
        })
        .transpose()?;

    Ok(Patient {
        record_id: row.get(PatientColumn::RecordId.index())?,
        age: row.get(PatientColumn::Age.index())?,
        sex: parsed(row, PatientColumn::Sex)?,
        admission_date: parsed::<NaiveDate>(row, PatientColumn::AdmissionDate)?,
        diagnosis: row.get(PatientColumn::Diagnosis.index())?,
        injury_origin: row.get(PatientColumn::InjuryOrigin.index())?,
        helmet_use: row.get(PatientColumn::HelmetUse.index())?,
        associated_injuries: row.get(PatientColumn::AssociatedInjuries.index())?,
        requires_icp: row.get(PatientColumn::RequiresIcp.index())?,
        requires_ventilation: row.get(PatientColumn::RequiresVentilation.index())?,
        requires_craniectomy: row.get(PatientColumn::RequiresCraniectomy.index())?,
        has_drain: row.get(PatientColumn::HasDrain.index())?,
        drain_type,
        icu_days_elapsed: row.get(PatientColumn::IcuDaysElapsed.index())?,
        glasgow_on_admission: row.get(PatientColumn::GlasgowOnAdmission.index())?,
        glasgow_current: row.get(PatientColumn::GlasgowCurrent.index())?,
        post_icu_destination: parsed(row, PatientColumn::PostIcuDestination)?,
        sequelae_motor: row.get(PatientColumn::SequelaeMotor.index())?,
        sequelae_neurological: row.get(PatientColumn::SequelaeNeurological.index())?,
        sequelae_cognitive: row.get(PatientColumn::SequelaeCognitive.index())?,
        notes: row.get(PatientColumn::Notes.index())?,
        created_at: timestamp(row, PatientColumn::CreatedAt.index())?,
        updated_at: timestamp(row, PatientColumn::UpdatedAt.index())?,
    })
}

fn read_evolution(row: &Row<'_>) -> rusqlite::Result<Evolution> {
    Ok(Evolution {
        record_id: row.get(EvolutionColumn::RecordId.index())?,
        recorded_at: timestamp(row, EvolutionColumn::RecordedAt.index())?,
        icu_days_elapsed: row.get(EvolutionColumn::IcuDaysElapsed.index())?,
        glasgow_current: row.get(EvolutionColumn::GlasgowCurrent.index())?,
        requires_icp: row.get(EvolutionColumn::RequiresIcp.index())?,
        requires_ventilation: row.get(EvolutionColumn::RequiresVentilation.index())?,
        requires_craniectomy: row.get(EvolutionColumn::RequiresCraniectomy.index())?,
        note: row.get(EvolutionColumn::Note.index())?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

fn insert_evolution(conn: &rusqlite::Connection, evolution: &Evolution) -> StorageResult<()> {
    let sql = format!(
        "INSERT INTO evolutions ({}) VALUES ({})",
        column_list(EvolutionColumn::ALL, EvolutionColumn::name),
        placeholders(EvolutionColumn::ALL.len())
    );
    conn.execute(&sql, params_from_iter(evolution.row_values()))
        .map_err(|e| internal_error(format!("Failed to insert evolution: {}", e)))?;
    Ok(())
}

#[async_trait]
impl PatientStorage for SqliteBackend {
    async fn insert_patient(&self, patient: &Patient) -> StorageResult<bool> {
        let conn = self.get_connection()?;

        let sql = format!(
            "INSERT INTO patients ({}) VALUES ({})",
            column_list(PatientColumn::ALL, PatientColumn::name),
            placeholders(PatientColumn::ALL.len())
        );

        match conn.execute(&sql, params_from_iter(patient.row_values())) {
            Ok(_) => {
                info!(record_id = %patient.record_id, "Inserted patient");
                Ok(true)
            }
            Err(e) if is_unique_violation(&e) => {
                debug!(record_id = %patient.record_id, "Duplicate record_id rejected by UNIQUE constraint");
                Ok(false)
            }
            Err(e) => Err(internal_error(format!("Failed to insert patient: {}", e))),
        }
    }

    async fn fetch_all(&self) -> StorageResult<Vec<Patient>> {
        let conn = self.get_connection()?;
        let sql = format!("{} ORDER BY admission_date DESC, id DESC", patient_select());

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| internal_error(format!("Failed to prepare query: {}", e)))?;
        let patients = stmt
            .query_map([], read_patient)
            .map_err(|e| internal_error(format!("Failed to query patients: {}", e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| internal_error(format!("Failed to read patient row: {}", e)))?;

        Ok(patients)
    }

    async fn fetch_by_record_id(&self, record_id: &str) -> StorageResult<Option<Patient>> {
        let conn = self.get_connection()?;
        let sql = format!("{} WHERE record_id = ?1", patient_select());

        conn.query_row(&sql, params![record_id], read_patient)
            .optional()
            .map_err(|e| internal_error(format!("Failed to read patient: {}", e)))
    }

    async fn update_patient(
        &self,
        record_id: &str,
        update: &PatientUpdate,
    ) -> StorageResult<bool> {
        let mut conn = self.get_connection()?;
        let now = Utc::now();

        let mut assignments = update.assignments();
        assignments.push((PatientColumn::UpdatedAt, timestamp_text(&now).into()));

        let set_clause = assignments
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = ?{}", column.name(), i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE patients SET {} WHERE record_id = ?{}",
            set_clause,
            assignments.len() + 1
        );

        let mut values: Vec<FieldValue> = assignments.into_iter().map(|(_, v)| v).collect();
        values.push(record_id.into());

        let tx = conn
            .transaction()
            .map_err(|e| internal_error(format!("Failed to begin transaction: {}", e)))?;

        let changed = tx
            .execute(&sql, params_from_iter(values.iter()))
            .map_err(|e| internal_error(format!("Failed to update patient: {}", e)))?;

        if changed == 0 {
            debug!(record_id = %record_id, "Update target not found");
            return Ok(false);
        }

        if let Some(evolution) = evolution_for_update(record_id, update, now) {
            insert_evolution(&tx, &evolution)?;
            debug!(record_id = %record_id, "Appended evolution");
        }

        tx.commit()
            .map_err(|e| internal_error(format!("Failed to commit transaction: {}", e)))?;

        info!(record_id = %record_id, "Updated patient");
        Ok(true)
    }

    async fn fetch_evolutions(&self, record_id: &str) -> StorageResult<Vec<Evolution>> {
        let conn = self.get_connection()?;
        let sql = format!(
            "{} WHERE record_id = ?1 ORDER BY recorded_at DESC, id DESC",
            evolution_select()
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| internal_error(format!("Failed to prepare query: {}", e)))?;
        let evolutions = stmt
            .query_map(params![record_id], read_evolution)
            .map_err(|e| internal_error(format!("Failed to query evolutions: {}", e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| internal_error(format!("Failed to read evolution row: {}", e)))?;

        Ok(evolutions)
    }

    async fn delete_patient(&self, record_id: &str) -> StorageResult<bool> {
        let mut conn = self.get_connection()?;
        let tx = conn
            .transaction()
            .map_err(|e| internal_error(format!("Failed to begin transaction: {}", e)))?;

        let deleted = tx
            .execute("DELETE FROM patients WHERE record_id = ?1", params![record_id])
            .map_err(|e| internal_error(format!("Failed to delete patient: {}", e)))?;
        if deleted == 0 {
            return Ok(false);
        }

        let evolutions = tx
            .execute("DELETE FROM evolutions WHERE record_id = ?1", params![record_id])
            .map_err(|e| internal_error(format!("Failed to delete evolutions: {}", e)))?;

        tx.commit()
            .map_err(|e| internal_error(format!("Failed to commit transaction: {}", e)))?;

        info!(record_id = %record_id, evolutions, "Deleted patient");
        Ok(true)
    }
}
