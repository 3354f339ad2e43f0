//! PatientStorage implementation for Google Sheets.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::coercion::{coerce_text, evolution_from_row, patient_from_row};
use crate::core::{PatientStorage, evolution_for_update};
use crate::error::StorageResult;
use crate::types::{
    Evolution, FieldValue, Patient, PatientColumn, PatientUpdate, sort_newest_first,
    timestamp_text,
};

use super::SheetsBackend;
use super::backend::SheetTable;

/// A sheet's contents split into its header row and data rows.
#[derive(Debug, Default)]
pub(crate) struct SheetRows {
    headers: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl SheetRows {
    pub(crate) fn from_values(mut values: Vec<Vec<Value>>) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let headers = values
            .remove(0)
            .iter()
            .map(|cell| coerce_text(cell).trim().to_string())
            .collect();
        Self {
            headers,
            rows: values,
        }
    }

    /// Position of a named column, falling back to its canonical position
    /// when the header row does not name it.
    fn column_position(&self, name: &str, fallback: usize) -> usize {
        self.headers
            .iter()
            .position(|h| h == name)
            .unwrap_or(fallback)
    }

    /// Data rows keyed by header, each paired with its sheet row number.
    pub(crate) fn records(&self) -> impl Iterator<Item = (usize, Map<String, Value>)> + '_ {
        self.rows.iter().enumerate().map(|(i, row)| {
            let map = self
                .headers
                .iter()
                .zip(row.iter())
                .map(|(header, cell)| (header.clone(), cell.clone()))
                .collect();
            (i + 2, map)
        })
    }

    /// Sheet row numbers whose key column holds `record_id`, in sheet order.
    ///
    /// The key column is found by header, as for every other column.
    pub(crate) fn rows_with_key(&self, key: &str, record_id: &str) -> Vec<usize> {
        let position = self.column_position(key, 0);
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| {
                row.get(position)
                    .is_some_and(|cell| coerce_text(cell).trim() == record_id)
            })
            .map(|(i, _)| i + 2)
            .collect()
    }
}

fn cells(values: Vec<FieldValue>) -> Vec<Value> {
    values.iter().map(FieldValue::to_cell).collect()
}

impl SheetsBackend {
    async fn read_table(&self, table: &SheetTable) -> StorageResult<SheetRows> {
        Ok(SheetRows::from_values(
            self.read_range(&table.full_range()).await?,
        ))
    }

    async fn key_rows(&self, table: &SheetTable, record_id: &str) -> StorageResult<Vec<usize>> {
        let rows = self.read_table(table).await?;
        Ok(rows.rows_with_key(PatientColumn::RecordId.name(), record_id))
    }
}

#[async_trait]
impl PatientStorage for SheetsBackend {
    async fn insert_patient(&self, patient: &Patient) -> StorageResult<bool> {
        if !self.key_rows(&self.patients, &patient.record_id).await?.is_empty() {
            debug!(record_id = %patient.record_id, "Patient already exists");
            return Ok(false);
        }

        let appended = self
            .append_row(&self.patients, cells(patient.row_values()))
            .await?;

        // Sheets has no unique constraint: if another writer appended the same
        // id first, withdraw our row so the earlier one stays authoritative.
        if let Some(row) = appended {
            let matches = self.key_rows(&self.patients, &patient.record_id).await?;
            if matches.first().is_some_and(|first| *first < row) {
                warn!(record_id = %patient.record_id, row, "Insert lost race on record_id; clearing row");
                self.clear_range(&self.patients.row_range(row)).await?;
                return Ok(false);
            }
        }

        info!(record_id = %patient.record_id, "Inserted patient");
        Ok(true)
    }

    async fn fetch_all(&self) -> StorageResult<Vec<Patient>> {
        let table = self.read_table(&self.patients).await?;
        let mut patients: Vec<Patient> = table
            .records()
            .filter_map(|(_, row)| patient_from_row(&row))
            .collect();
        patients.sort_by(|a, b| b.admission_date.cmp(&a.admission_date));
        Ok(patients)
    }

    async fn fetch_by_record_id(&self, record_id: &str) -> StorageResult<Option<Patient>> {
        let table = self.read_table(&self.patients).await?;
        Ok(table
            .records()
            .filter_map(|(_, row)| patient_from_row(&row))
            .find(|p| p.record_id == record_id))
    }

    async fn update_patient(
        &self,
        record_id: &str,
        update: &PatientUpdate,
    ) -> StorageResult<bool> {
        let table = self.read_table(&self.patients).await?;
        let Some(row) = table
            .rows_with_key(PatientColumn::RecordId.name(), record_id)
            .first()
            .copied()
        else {
            debug!(record_id = %record_id, "Update target not found");
            return Ok(false);
        };

        let now = Utc::now();
        let mut data: Vec<(String, Value)> = update
            .assignments()
            .into_iter()
            .map(|(column, value)| {
                let position = table.column_position(column.name(), column.index());
                (self.patients.cell_range(position, row), value.to_cell())
            })
            .collect();
        let updated_at = PatientColumn::UpdatedAt;
        data.push((
            self.patients.cell_range(
                table.column_position(updated_at.name(), updated_at.index()),
                row,
            ),
            Value::String(timestamp_text(&now)),
        ));
        self.batch_write(data).await?;

        if let Some(evolution) = evolution_for_update(record_id, update, now) {
            if let Err(e) = self
                .append_row(&self.evolutions, cells(evolution.row_values()))
                .await
            {
                warn!(record_id = %record_id, error = %e, "Patient updated but evolution append failed");
                return Err(e);
            }
            debug!(record_id = %record_id, "Appended evolution");
        }

        info!(record_id = %record_id, row, "Updated patient");
        Ok(true)
    }

    async fn fetch_evolutions(&self, record_id: &str) -> StorageResult<Vec<Evolution>> {
        let table = self.read_table(&self.evolutions).await?;
        let mut evolutions: Vec<Evolution> = table
            .records()
            .filter_map(|(_, row)| evolution_from_row(&row))
            .filter(|e| e.record_id == record_id)
            .collect();
        // Later appends win ties on recorded_at.
        evolutions.reverse();
        sort_newest_first(&mut evolutions);
        Ok(evolutions)
    }
}
