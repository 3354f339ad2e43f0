//! Backend selection.
//!
//! The backend is chosen once, at startup, from whichever credentials are
//! configured: Supabase first, then Google Sheets, falling back to a local
//! SQLite database. The resulting [`SelectedBackend`] implements
//! [`PatientStorage`] by delegation, so callers never branch on which
//! backend is active.
//!
//! # Example
//!
//! ```no_run
//! use tbi_persistence::adapter::{StorageSettings, select_backend};
//! use tbi_persistence::core::Backend;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = select_backend(StorageSettings::default())?;
//! backend.initialize().await?;
//! println!("Using {}", backend.describe().label);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backends::sqlite::{SqliteBackend, SqliteBackendConfig};
#[cfg(feature = "sheets")]
use crate::backends::sheets::{SheetsBackend, SheetsConfig};
#[cfg(feature = "supabase")]
use crate::backends::supabase::{SupabaseBackend, SupabaseConfig};
use crate::core::{Backend, BackendCapability, BackendKind, PatientStorage};
use crate::error::{BackendError, StorageResult};
use crate::types::{Evolution, Patient, PatientUpdate};

/// Everything needed to pick and open a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite database path, used when no remote backend is configured.
    /// `":memory:"` opens a throwaway in-memory database.
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,

    /// SQLite pool settings.
    #[serde(default)]
    pub sqlite: SqliteBackendConfig,

    /// Google Sheets settings, when spreadsheet credentials are available.
    #[cfg(feature = "sheets")]
    #[serde(default)]
    pub sheets: Option<SheetsConfig>,

    /// Supabase settings, when a project URL and key are available.
    #[cfg(feature = "supabase")]
    #[serde(default)]
    pub supabase: Option<SupabaseConfig>,
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("pacientes.db")
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            sqlite_path: default_sqlite_path(),
            sqlite: SqliteBackendConfig::default(),
            #[cfg(feature = "sheets")]
            sheets: None,
            #[cfg(feature = "supabase")]
            supabase: None,
        }
    }
}

impl StorageSettings {
    /// Settings for a local SQLite database at `path`.
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            sqlite_path: path.into(),
            ..Default::default()
        }
    }
}

/// Which backend is active, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendDescription {
    /// Short backend name (`sqlite`, `sheets`, `supabase`).
    pub kind: String,
    /// Human-readable label.
    pub label: String,
}

/// The backend bound for the lifetime of the process.
#[derive(Debug)]
pub enum SelectedBackend {
    /// Local SQLite database.
    Sqlite(SqliteBackend),
    /// Google Sheets spreadsheet.
    #[cfg(feature = "sheets")]
    Sheets(SheetsBackend),
    /// Supabase project.
    #[cfg(feature = "supabase")]
    Supabase(SupabaseBackend),
}

macro_rules! delegate {
    ($self:ident, $backend:ident => $call:expr) => {
        match $self {
            SelectedBackend::Sqlite($backend) => $call,
            #[cfg(feature = "sheets")]
            SelectedBackend::Sheets($backend) => $call,
            #[cfg(feature = "supabase")]
            SelectedBackend::Supabase($backend) => $call,
        }
    };
}

impl SelectedBackend {
    /// Describes the active backend.
    pub fn describe(&self) -> BackendDescription {
        let kind = self.kind();
        BackendDescription {
            kind: kind.to_string(),
            label: kind.label().to_string(),
        }
    }
}

/// Opens the backend the settings point at.
///
/// Supabase wins when configured, then Google Sheets; otherwise the SQLite
/// database at `sqlite_path` is opened (and created if missing). Schema
/// preparation is left to [`Backend::initialize`].
///
/// # Errors
///
/// Returns a configuration or connection error if the chosen backend cannot
/// be constructed. No fallback to another backend is attempted.
pub fn select_backend(settings: StorageSettings) -> StorageResult<SelectedBackend> {
    #[cfg(feature = "supabase")]
    if let Some(config) = settings.supabase {
        info!(url = %config.url, "Selected Supabase backend");
        return Ok(SelectedBackend::Supabase(SupabaseBackend::new(config)?));
    }

    #[cfg(feature = "sheets")]
    if let Some(config) = settings.sheets {
        info!(spreadsheet_id = %config.spreadsheet_id, "Selected Google Sheets backend");
        return Ok(SelectedBackend::Sheets(SheetsBackend::new(config)?));
    }

    info!(path = %settings.sqlite_path.display(), "Selected SQLite backend");
    Ok(SelectedBackend::Sqlite(SqliteBackend::with_config(
        &settings.sqlite_path,
        settings.sqlite,
    )?))
}

#[async_trait]
impl Backend for SelectedBackend {
    fn kind(&self) -> BackendKind {
        delegate!(self, b => b.kind())
    }

    fn name(&self) -> &'static str {
        delegate!(self, b => b.name())
    }

    fn capabilities(&self) -> Vec<BackendCapability> {
        delegate!(self, b => b.capabilities())
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        delegate!(self, b => b.health_check().await)
    }

    async fn initialize(&self) -> Result<(), BackendError> {
        delegate!(self, b => b.initialize().await)
    }
}

#[async_trait]
impl PatientStorage for SelectedBackend {
    async fn insert_patient(&self, patient: &Patient) -> StorageResult<bool> {
        delegate!(self, b => b.insert_patient(patient).await)
    }

    async fn fetch_all(&self) -> StorageResult<Vec<Patient>> {
        delegate!(self, b => b.fetch_all().await)
    }

    async fn fetch_by_record_id(&self, record_id: &str) -> StorageResult<Option<Patient>> {
        delegate!(self, b => b.fetch_by_record_id(record_id).await)
    }

    async fn update_patient(
        &self,
        record_id: &str,
        update: &PatientUpdate,
    ) -> StorageResult<bool> {
        delegate!(self, b => b.update_patient(record_id, update).await)
    }

    async fn fetch_evolutions(&self, record_id: &str) -> StorageResult<Vec<Evolution>> {
        delegate!(self, b => b.fetch_evolutions(record_id).await)
    }

    async fn delete_patient(&self, record_id: &str) -> StorageResult<bool> {
        delegate!(self, b => b.delete_patient(record_id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_falls_back_to_sqlite() {
        let backend = select_backend(StorageSettings::sqlite(":memory:")).unwrap();
        assert_eq!(backend.kind(), BackendKind::Sqlite);
        assert_eq!(
            backend.describe(),
            BackendDescription {
                kind: "sqlite".to_string(),
                label: "SQLite (local)".to_string(),
            }
        );
    }

    #[cfg(feature = "supabase")]
    #[test]
    fn test_supabase_wins() {
        let mut settings = StorageSettings::sqlite(":memory:");
        settings.supabase = Some(SupabaseConfig::new("https://x.supabase.co", "key"));
        #[cfg(feature = "sheets")]
        {
            settings.sheets = Some(SheetsConfig::new(
                "sheet",
                crate::backends::sheets::SheetsAuth::StaticToken("t".to_string()),
            ));
        }
        let backend = select_backend(settings).unwrap();
        assert_eq!(backend.kind(), BackendKind::Supabase);
        assert_eq!(backend.describe().label, "Supabase (PostgreSQL)");
    }

    #[cfg(feature = "sheets")]
    #[test]
    fn test_sheets_before_sqlite() {
        let mut settings = StorageSettings::sqlite(":memory:");
        settings.sheets = Some(SheetsConfig::new(
            "sheet",
            crate::backends::sheets::SheetsAuth::StaticToken("t".to_string()),
        ));
        let backend = select_backend(settings).unwrap();
        assert_eq!(backend.kind(), BackendKind::Sheets);
    }

    #[cfg(feature = "supabase")]
    #[test]
    fn test_bad_remote_config_is_an_error() {
        let mut settings = StorageSettings::sqlite(":memory:");
        settings.supabase = Some(SupabaseConfig::new("not a url", "key"));
        assert!(select_backend(settings).is_err());
    }
}
