//! Supabase backend implementation.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};
use url::Url;

use crate::core::{Backend, BackendCapability, BackendKind};
use crate::error::{BackendError, StorageError, StorageResult};

/// Configuration for the Supabase backend.
#[derive(Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    /// Project URL (e.g. `https://xyzcompany.supabase.co`).
    pub url: String,

    /// Project API key, sent both as `apikey` and as bearer token.
    pub api_key: String,

    /// Patient table name (default: `"pacientes"`).
    #[serde(default = "default_patients_table")]
    pub patients_table: String,

    /// Evolution table name (default: `"evoluciones"`).
    #[serde(default = "default_evolutions_table")]
    pub evolutions_table: String,

    /// Request timeout in milliseconds (default: 30000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_patients_table() -> String {
    "pacientes".to_string()
}

fn default_evolutions_table() -> String {
    "evoluciones".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30000
}

impl Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .field("patients_table", &self.patients_table)
            .field("evolutions_table", &self.evolutions_table)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

impl SupabaseConfig {
    /// Creates a configuration with default table names.
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            patients_table: default_patients_table(),
            evolutions_table: default_evolutions_table(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Supabase backend, talking to the project's PostgREST endpoint.
///
/// Tables are provisioned from the Supabase dashboard; this backend never
/// creates them.
pub struct SupabaseBackend {
    client: Client,
    config: SupabaseConfig,
    rest_base: Url,
}

impl Debug for SupabaseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseBackend")
            .field("config", &self.config)
            .field("rest_base", &self.rest_base.as_str())
            .finish_non_exhaustive()
    }
}

fn configuration_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::Configuration {
        backend_name: "supabase".to_string(),
        message,
    })
}

impl SupabaseBackend {
    /// Creates a new Supabase backend with the given configuration.
    pub fn new(config: SupabaseConfig) -> StorageResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(configuration_error("api_key is empty".to_string()));
        }

        let mut rest_base = Url::parse(&config.url)
            .map_err(|e| configuration_error(format!("invalid url '{}': {}", config.url, e)))?;
        rest_base
            .path_segments_mut()
            .map_err(|_| configuration_error(format!("url '{}' cannot be a base", config.url)))?
            .pop_if_empty()
            .extend(["rest", "v1"]);

        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| {
                StorageError::Backend(BackendError::ConnectionFailed {
                    backend_name: "supabase".to_string(),
                    message: e.to_string(),
                })
            })?;

        Ok(Self {
            client,
            config,
            rest_base,
        })
    }

    /// Returns the backend configuration.
    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    /// URL of a table endpoint.
    pub(crate) fn table_url(&self, table: &str) -> Url {
        let mut url = self.rest_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(table);
        }
        url
    }

    /// URL of a table endpoint filtered by `record_id`.
    pub(crate) fn record_url(&self, table: &str, record_id: &str) -> Url {
        let mut url = self.table_url(table);
        url.query_pairs_mut()
            .append_pair("record_id", &format!("eq.{}", record_id));
        url
    }

    /// Starts an authenticated request.
    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    /// Turns a non-success response into a backend error.
    pub(crate) async fn check(&self, response: Response) -> StorageResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(status_error(status, message))
    }

    /// Sends a request and decodes a JSON array of rows.
    pub(crate) async fn fetch_rows(&self, url: Url) -> StorageResult<Vec<Map<String, Value>>> {
        let response = self.request(Method::GET, url).send().await?;
        let response = self.check(response).await?;
        Ok(response.json::<Vec<Map<String, Value>>>().await?)
    }

    async fn probe(&self, table: &str) -> StorageResult<()> {
        let mut url = self.table_url(table);
        url.query_pairs_mut()
            .append_pair("select", "record_id")
            .append_pair("limit", "1");
        self.fetch_rows(url).await.map(|_| ())
    }
}

pub(crate) fn status_error(status: StatusCode, message: String) -> StorageError {
    let backend_name = "supabase".to_string();
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
    }
}

fn into_backend_error(err: StorageError) -> BackendError {
    match err {
        StorageError::Backend(e) => e,
        other => BackendError::Internal {
            backend_name: "supabase".to_string(),
            message: other.to_string(),
            source: None,
        },
    }
}

#[async_trait]
impl Backend for SupabaseBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Supabase
    }

    fn name(&self) -> &'static str {
        "supabase"
    }

    fn capabilities(&self) -> Vec<BackendCapability> {
        vec![
            BackendCapability::Crud,
            BackendCapability::History,
            BackendCapability::UniqueConstraint,
        ]
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        self.probe(&self.config.patients_table)
            .await
            .map_err(into_backend_error)
    }

    async fn initialize(&self) -> Result<(), BackendError> {
        for table in [&self.config.patients_table, &self.config.evolutions_table] {
            match self.probe(table).await {
                Ok(()) => info!(table = %table, "Supabase table reachable"),
                Err(e) => warn!(
                    table = %table,
                    error = %e,
                    "Supabase table not reachable; create it from the Supabase dashboard \
                     with a UNIQUE constraint on record_id"
                ),
            }
        }
        Ok(())
    }
}
