//! Google Sheets backend implementation.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};
use url::Url;

use crate::core::{Backend, BackendCapability, BackendKind};
use crate::error::{BackendError, StorageError, StorageResult};
use crate::types::{EvolutionColumn, PatientColumn};

use super::auth::{SheetsAuth, TokenProvider};

/// Configuration for the Google Sheets backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    /// Spreadsheet identifier (the long key in the sheet's URL).
    pub spreadsheet_id: String,

    /// How requests are authenticated.
    pub auth: SheetsAuth,

    /// Patient sheet title (default: `"pacientes"`).
    #[serde(default = "default_patients_sheet")]
    pub patients_sheet: String,

    /// Evolution sheet title (default: `"evoluciones"`).
    #[serde(default = "default_evolutions_sheet")]
    pub evolutions_sheet: String,

    /// Sheets API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Request timeout in milliseconds (default: 30000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_patients_sheet() -> String {
    "pacientes".to_string()
}

fn default_evolutions_sheet() -> String {
    "evoluciones".to_string()
}

fn default_api_base() -> String {
    "https://sheets.googleapis.com/v4/spreadsheets".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30000
}

impl SheetsConfig {
    /// Creates a configuration with default sheet titles and API base.
    pub fn new(spreadsheet_id: impl Into<String>, auth: SheetsAuth) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            auth,
            patients_sheet: default_patients_sheet(),
            evolutions_sheet: default_evolutions_sheet(),
            api_base: default_api_base(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }

    /// Overrides the API base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

/// Returns the A1 column letters for a zero-based column index.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// A sheet and the width of its table.
#[derive(Debug, Clone)]
pub(crate) struct SheetTable {
    pub(crate) title: String,
    pub(crate) headers: Vec<&'static str>,
}

impl SheetTable {
    fn last_column(&self) -> String {
        column_letter(self.headers.len().saturating_sub(1))
    }

    /// Every column of the table, e.g. `pacientes!A:W`.
    pub(crate) fn full_range(&self) -> String {
        format!("{}!A:{}", self.title, self.last_column())
    }

    /// One whole row, e.g. `pacientes!A5:W5`.
    pub(crate) fn row_range(&self, row: usize) -> String {
        format!("{}!A{}:{}{}", self.title, row, self.last_column(), row)
    }

    /// One cell.
    pub(crate) fn cell_range(&self, column: usize, row: usize) -> String {
        format!("{}!{}{}", self.title, column_letter(column), row)
    }
}

/// Google Sheets backend.
///
/// Each table is a sheet whose first row holds the column names; data rows
/// follow. A data row at zero-based position `i` lives at sheet row `i + 2`.
pub struct SheetsBackend {
    client: Client,
    tokens: TokenProvider,
    config: SheetsConfig,
    spreadsheet_url: Url,
    pub(crate) patients: SheetTable,
    pub(crate) evolutions: SheetTable,
}

impl Debug for SheetsBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsBackend")
            .field("spreadsheet_id", &self.config.spreadsheet_id)
            .field("patients_sheet", &self.patients.title)
            .field("evolutions_sheet", &self.evolutions.title)
            .finish_non_exhaustive()
    }
}

fn configuration_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::Configuration {
        backend_name: "sheets".to_string(),
        message,
    })
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    #[serde(default)]
    updates: Option<AppendUpdates>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    #[serde(default)]
    updated_range: Option<String>,
}

/// Extracts the first row number from an A1 range such as `pacientes!A5:W5`.
pub(crate) fn first_row_of_range(range: &str) -> Option<usize> {
    let cells = range.rsplit('!').next()?;
    let start = cells.split(':').next()?;
    let digits: String = start.chars().skip_while(|c| c.is_ascii_alphabetic()).collect();
    digits.parse().ok()
}

impl SheetsBackend {
    /// Creates a new Sheets backend with the given configuration.
    pub fn new(config: SheetsConfig) -> StorageResult<Self> {
        if config.spreadsheet_id.trim().is_empty() {
            return Err(configuration_error("spreadsheet_id is empty".to_string()));
        }

        let mut spreadsheet_url = Url::parse(&config.api_base).map_err(|e| {
            configuration_error(format!("invalid api_base '{}': {}", config.api_base, e))
        })?;
        spreadsheet_url
            .path_segments_mut()
            .map_err(|_| configuration_error(format!("api_base '{}' cannot be a base", config.api_base)))?
            .pop_if_empty()
            .push(&config.spreadsheet_id);

        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| {
                StorageError::Backend(BackendError::ConnectionFailed {
                    backend_name: "sheets".to_string(),
                    message: e.to_string(),
                })
            })?;

        let tokens = TokenProvider::new(config.auth.clone(), client.clone());
        let patients = SheetTable {
            title: config.patients_sheet.clone(),
            headers: PatientColumn::headers(),
        };
        let evolutions = SheetTable {
            title: config.evolutions_sheet.clone(),
            headers: EvolutionColumn::headers(),
        };

        Ok(Self {
            client,
            tokens,
            config,
            spreadsheet_url,
            patients,
            evolutions,
        })
    }

    /// Returns the backend configuration.
    pub fn config(&self) -> &SheetsConfig {
        &self.config
    }

    /// URL for `{spreadsheet}{suffix}`, where `suffix` is appended to the
    /// spreadsheet segment (e.g. `:batchUpdate`).
    fn spreadsheet_endpoint(&self, suffix: &str) -> Url {
        let mut url = self.spreadsheet_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop();
            segments.push(&format!("{}{}", self.config.spreadsheet_id, suffix));
        }
        url
    }

    /// URL for `{spreadsheet}/values/{range}{suffix}`.
    fn values_endpoint(&self, range: &str, suffix: &str) -> Url {
        let mut url = self.spreadsheet_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push("values");
            segments.push(&format!("{}{}", range, suffix));
        }
        url
    }

    async fn request(&self, method: Method, url: Url) -> StorageResult<RequestBuilder> {
        let token = self.tokens.token().await?;
        Ok(self.client.request(method, url).bearer_auth(token))
    }

    async fn check(&self, response: Response) -> StorageResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        let backend_name = "sheets".to_string();
        Err(
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                StorageError::Backend(BackendError::Unavailable {
                    backend_name,
                    message: format!("credentials rejected ({}): {}", status.as_u16(), message),
                })
            } else {
                StorageError::Backend(BackendError::RequestFailed {
                    backend_name,
                    status: status.as_u16(),
                    message,
                })
            },
        )
    }

    /// Reads a range; rows come back as they are stored, header included.
    pub(crate) async fn read_range(&self, range: &str) -> StorageResult<Vec<Vec<Value>>> {
        let url = self.values_endpoint(range, "");
        let response = self.request(Method::GET, url).await?.send().await?;
        let response = self.check(response).await?;
        Ok(response.json::<ValueRange>().await?.values)
    }

    /// Appends one row and returns its sheet row number, when reported.
    pub(crate) async fn append_row(
        &self,
        table: &SheetTable,
        row: Vec<Value>,
    ) -> StorageResult<Option<usize>> {
        let mut url = self.values_endpoint(&table.full_range(), ":append");
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        let response = self
            .request(Method::POST, url)
            .await?
            .json(&json!({ "values": [row] }))
            .send()
            .await?;
        let response = self.check(response).await?;
        let body: AppendResponse = response.json().await?;
        Ok(body
            .updates
            .and_then(|u| u.updated_range)
            .as_deref()
            .and_then(first_row_of_range))
    }

    /// Writes several single ranges in one call.
    pub(crate) async fn batch_write(&self, data: Vec<(String, Value)>) -> StorageResult<()> {
        let data: Vec<Value> = data
            .into_iter()
            .map(|(range, value)| json!({ "range": range, "values": [[value]] }))
            .collect();
        let url = self.values_endpoint_root(":batchUpdate");
        let response = self
            .request(Method::POST, url)
            .await?
            .json(&json!({ "valueInputOption": "RAW", "data": data }))
            .send()
            .await?;
        self.check(response).await?;
        Ok(())
    }

    /// Clears a range.
    pub(crate) async fn clear_range(&self, range: &str) -> StorageResult<()> {
        let url = self.values_endpoint(range, ":clear");
        let response = self
            .request(Method::POST, url)
            .await?
            .json(&json!({}))
            .send()
            .await?;
        self.check(response).await?;
        Ok(())
    }

    /// URL for `{spreadsheet}/values{suffix}`.
    fn values_endpoint_root(&self, suffix: &str) -> Url {
        let mut url = self.spreadsheet_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(&format!("values{}", suffix));
        }
        url
    }

    async fn sheet_titles(&self) -> StorageResult<Vec<String>> {
        let mut url = self.spreadsheet_url.clone();
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties.title");
        let response = self.request(Method::GET, url).await?.send().await?;
        let body: Value = self.check(response).await?.json().await?;
        Ok(body["sheets"]
            .as_array()
            .map(|sheets| {
                sheets
                    .iter()
                    .filter_map(|s| s["properties"]["title"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create_sheet(&self, table: &SheetTable) -> StorageResult<()> {
        let url = self.spreadsheet_endpoint(":batchUpdate");
        let response = self
            .request(Method::POST, url)
            .await?
            .json(&json!({
                "requests": [{ "addSheet": { "properties": { "title": table.title } } }]
            }))
            .send()
            .await?;
        self.check(response).await?;

        let mut url = self.values_endpoint(&table.row_range(1), "");
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let response = self
            .request(Method::PUT, url)
            .await?
            .json(&json!({ "values": [table.headers] }))
            .send()
            .await?;
        self.check(response).await?;

        info!(sheet = %table.title, "Created sheet with header row");
        Ok(())
    }

    async fn ensure_sheets(&self) -> StorageResult<()> {
        let titles = self.sheet_titles().await?;
        for table in [&self.patients, &self.evolutions] {
            if !titles.contains(&table.title) {
                self.create_sheet(table).await?;
            }
        }
        Ok(())
    }
}

fn into_backend_error(err: StorageError) -> BackendError {
    match err {
        StorageError::Backend(e) => e,
        other => BackendError::Internal {
            backend_name: "sheets".to_string(),
            message: other.to_string(),
            source: None,
        },
    }
}

#[async_trait]
impl Backend for SheetsBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sheets
    }

    fn name(&self) -> &'static str {
        "sheets"
    }

    fn capabilities(&self) -> Vec<BackendCapability> {
        vec![
            BackendCapability::Crud,
            BackendCapability::History,
            BackendCapability::ManagedSchema,
        ]
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        self.sheet_titles()
            .await
            .map(|_| ())
            .map_err(into_backend_error)
    }

    async fn initialize(&self) -> Result<(), BackendError> {
        if let Err(e) = self.ensure_sheets().await {
            warn!(
                spreadsheet_id = %self.config.spreadsheet_id,
                error = %e,
                "Could not prepare sheets; share the spreadsheet with the service account"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(7), "H");
        assert_eq!(column_letter(22), "W");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn test_ranges() {
        let table = SheetTable {
            title: "pacientes".to_string(),
            headers: PatientColumn::headers(),
        };
        assert_eq!(table.full_range(), "pacientes!A:W");
        assert_eq!(table.row_range(5), "pacientes!A5:W5");
        assert_eq!(
            table.cell_range(PatientColumn::GlasgowCurrent.index(), 3),
            "pacientes!P3"
        );
    }

    #[test]
    fn test_first_row_of_range() {
        assert_eq!(first_row_of_range("pacientes!A5:W5"), Some(5));
        assert_eq!(first_row_of_range("'my sheet'!A12:H12"), Some(12));
        assert_eq!(first_row_of_range("pacientes!A:W"), None);
    }

    #[test]
    fn test_endpoints() {
        let config = SheetsConfig::new("sheet-id", SheetsAuth::StaticToken("t".to_string()))
            .with_api_base("http://localhost:1234/v4/spreadsheets");
        let backend = SheetsBackend::new(config).unwrap();
        assert_eq!(
            backend.values_endpoint("pacientes!A:W", ":append").as_str(),
            "http://localhost:1234/v4/spreadsheets/sheet-id/values/pacientes!A:W:append"
        );
        assert_eq!(
            backend.spreadsheet_endpoint(":batchUpdate").as_str(),
            "http://localhost:1234/v4/spreadsheets/sheet-id:batchUpdate"
        );
        assert_eq!(
            backend.values_endpoint_root(":batchUpdate").as_str(),
            "http://localhost:1234/v4/spreadsheets/sheet-id/values:batchUpdate"
        );
    }

    #[test]
    fn test_empty_spreadsheet_id_rejected() {
        let config = SheetsConfig::new(" ", SheetsAuth::StaticToken("t".to_string()));
        assert!(SheetsBackend::new(config).is_err());
    }
}
