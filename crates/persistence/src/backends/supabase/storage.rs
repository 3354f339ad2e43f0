//! PatientStorage implementation for Supabase.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, StatusCode};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::coercion::{evolution_from_row, patient_from_row};
use crate::core::{PatientStorage, evolution_for_update};
use crate::error::StorageResult;
use crate::types::{
    Evolution, EvolutionColumn, FieldValue, Patient, PatientColumn, PatientUpdate,
    sort_newest_first, timestamp_text,
};

use super::SupabaseBackend;
use super::backend::status_error;

fn json_row<C: Copy>(
    columns: &[C],
    name: impl Fn(&C) -> &'static str,
    values: Vec<FieldValue>,
) -> Map<String, Value> {
    columns
        .iter()
        .zip(values)
        .map(|(column, value)| (name(column).to_string(), value.to_json()))
        .collect()
}

impl SupabaseBackend {
    async fn insert_evolution(&self, evolution: &Evolution) -> StorageResult<()> {
        let row = json_row(
            EvolutionColumn::ALL,
            EvolutionColumn::name,
            evolution.row_values(),
        );
        let response = self
            .request(Method::POST, self.table_url(&self.config().evolutions_table))
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await?;
        self.check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl PatientStorage for SupabaseBackend {
    async fn insert_patient(&self, patient: &Patient) -> StorageResult<bool> {
        let table = &self.config().patients_table;

        let mut url = self.record_url(table, &patient.record_id);
        url.query_pairs_mut().append_pair("select", "record_id");
        if !self.fetch_rows(url).await?.is_empty() {
            debug!(record_id = %patient.record_id, "Patient already exists");
            return Ok(false);
        }

        let row = json_row(PatientColumn::ALL, PatientColumn::name, patient.row_values());
        let response = self
            .request(Method::POST, self.table_url(table))
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await?;

        // A concurrent insert that won the race trips the UNIQUE constraint.
        if response.status() == StatusCode::CONFLICT {
            warn!(record_id = %patient.record_id, "Insert lost race on record_id");
            return Ok(false);
        }
        self.check(response).await?;

        info!(record_id = %patient.record_id, "Inserted patient");
        Ok(true)
    }

    async fn fetch_all(&self) -> StorageResult<Vec<Patient>> {
        let mut url = self.table_url(&self.config().patients_table);
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("order", "admission_date.desc");

        let rows = self.fetch_rows(url).await?;
        let mut patients: Vec<Patient> = rows.iter().filter_map(patient_from_row).collect();
        // Dates stored as text by older deployments do not sort server-side.
        patients.sort_by(|a, b| b.admission_date.cmp(&a.admission_date));
        Ok(patients)
    }

    async fn fetch_by_record_id(&self, record_id: &str) -> StorageResult<Option<Patient>> {
        let mut url = self.record_url(&self.config().patients_table, record_id);
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("limit", "1");

        let rows = self.fetch_rows(url).await?;
        Ok(rows.iter().find_map(patient_from_row))
    }

    async fn update_patient(
        &self,
        record_id: &str,
        update: &PatientUpdate,
    ) -> StorageResult<bool> {
        let now = Utc::now();
        let mut body: Map<String, Value> = update
            .assignments()
            .into_iter()
            .map(|(column, value)| (column.name().to_string(), value.to_json()))
            .collect();
        body.insert(
            PatientColumn::UpdatedAt.name().to_string(),
            Value::String(timestamp_text(&now)),
        );

        let mut url = self.record_url(&self.config().patients_table, record_id);
        url.query_pairs_mut().append_pair("select", "record_id");
        let response = self
            .request(Method::PATCH, url)
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(status_error(status, message));
        }

        let updated: Vec<Value> = response.json().await?;
        if updated.is_empty() {
            debug!(record_id = %record_id, "Update target not found");
            return Ok(false);
        }

        if let Some(evolution) = evolution_for_update(record_id, update, now) {
            if let Err(e) = self.insert_evolution(&evolution).await {
                warn!(record_id = %record_id, error = %e, "Patient updated but evolution append failed");
                return Err(e);
            }
            debug!(record_id = %record_id, "Appended evolution");
        }

        info!(record_id = %record_id, "Updated patient");
        Ok(true)
    }

    async fn fetch_evolutions(&self, record_id: &str) -> StorageResult<Vec<Evolution>> {
        let mut url = self.record_url(&self.config().evolutions_table, record_id);
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("order", "recorded_at.desc");

        let rows = self.fetch_rows(url).await?;
        let mut evolutions: Vec<Evolution> = rows.iter().filter_map(evolution_from_row).collect();
        sort_newest_first(&mut evolutions);
        Ok(evolutions)
    }
}
