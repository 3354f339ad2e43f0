//! Server configuration for the registry API.
//!
//! Every setting can come from the command line or from the environment.
//! Backend selection follows the credential material that is present:
//! Supabase when both `SUPABASE_URL` and `SUPABASE_KEY` are set, Google
//! Sheets when both `GOOGLE_SHEETS_CREDENTIALS` and `GOOGLE_SHEETS_ID` are
//! set, the local SQLite file otherwise.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `TBI_SERVER_PORT` | 8080 | Server port |
//! | `TBI_SERVER_HOST` | 127.0.0.1 | Host to bind |
//! | `TBI_LOG_LEVEL` | info | Log level |
//! | `TBI_MAX_BODY_SIZE` | 1048576 | Max request body (bytes) |
//! | `TBI_REQUEST_TIMEOUT` | 30 | Request timeout (seconds) |
//! | `TBI_ENABLE_CORS` | true | Enable CORS |
//! | `TBI_CORS_ORIGINS` | * | Allowed origins |
//! | `TBI_CORS_METHODS` | GET,POST,DELETE,OPTIONS | Allowed methods |
//! | `TBI_CORS_HEADERS` | Content-Type,Accept | Allowed headers |
//! | `TBI_DATABASE_PATH` | pacientes.db | SQLite file (or `:memory:`) |
//! | `SUPABASE_URL` | | Supabase project URL |
//! | `SUPABASE_KEY` | | Supabase API key |
//! | `GOOGLE_SHEETS_CREDENTIALS` | | Path to a service-account JSON key |
//! | `GOOGLE_SHEETS_ID` | | Spreadsheet id |
//!
//! # Example
//!
//! ```rust
//! use tbi_rest::ServerConfig;
//!
//! let config = ServerConfig {
//!     port: 3000,
//!     host: "0.0.0.0".to_string(),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::path::PathBuf;

use clap::Parser;

/// Server configuration for the registry API.
#[derive(Debug, Clone, Parser)]
#[command(name = "tbi-registry")]
#[command(about = "Registry of traumatic brain injury patients followed in the ICU")]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(short, long, env = "TBI_SERVER_PORT", default_value = "8080")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "TBI_SERVER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "TBI_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Maximum request body size in bytes.
    #[arg(long, env = "TBI_MAX_BODY_SIZE", default_value = "1048576")]
    pub max_body_size: usize,

    /// Request timeout in seconds.
    #[arg(long, env = "TBI_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,

    /// Enable CORS.
    #[arg(long, env = "TBI_ENABLE_CORS", default_value = "true")]
    pub enable_cors: bool,

    /// Allowed CORS origins (comma-separated, or * for all).
    #[arg(long, env = "TBI_CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Allowed CORS methods (comma-separated, or * for all).
    #[arg(long, env = "TBI_CORS_METHODS", default_value = "GET,POST,DELETE,OPTIONS")]
    pub cors_methods: String,

    /// Allowed CORS headers (comma-separated, or * for all).
    #[arg(long, env = "TBI_CORS_HEADERS", default_value = "Content-Type,Accept")]
    pub cors_headers: String,

    /// SQLite database file used when no remote backend is configured.
    #[arg(long, env = "TBI_DATABASE_PATH", default_value = "pacientes.db")]
    pub database_path: PathBuf,

    /// Supabase project URL.
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Supabase API key.
    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true)]
    pub supabase_key: Option<String>,

    /// Path to the Google service-account JSON key.
    #[arg(long, env = "GOOGLE_SHEETS_CREDENTIALS")]
    pub google_sheets_credentials: Option<PathBuf>,

    /// Id of the Google spreadsheet holding the registry.
    #[arg(long, env = "GOOGLE_SHEETS_ID")]
    pub google_sheets_id: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            log_level: "info".to_string(),
            max_body_size: 1024 * 1024,
            request_timeout: 30,
            enable_cors: true,
            cors_origins: "*".to_string(),
            cors_methods: "GET,POST,DELETE,OPTIONS".to_string(),
            cors_headers: "Content-Type,Accept".to_string(),
            database_path: PathBuf::from("pacientes.db"),
            supabase_url: None,
            supabase_key: None,
            google_sheets_credentials: None,
            google_sheets_id: None,
        }
    }
}

impl ServerConfig {
    /// Creates a new ServerConfig from environment variables, falling back
    /// to defaults when parsing fails.
    pub fn from_env() -> Self {
        Self::try_parse().unwrap_or_default()
    }

    /// Returns the socket address to bind to.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// True when both Supabase settings are present.
    pub fn has_supabase(&self) -> bool {
        present(&self.supabase_url) && present(&self.supabase_key)
    }

    /// True when both Google Sheets settings are present.
    pub fn has_sheets(&self) -> bool {
        self.google_sheets_credentials.is_some() && present(&self.google_sheets_id)
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("Port cannot be 0".to_string());
        }

        if self.max_body_size == 0 {
            errors.push("Max body size cannot be 0".to_string());
        }

        if self.request_timeout == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if self.database_path.as_os_str().is_empty() {
            errors.push("Database path cannot be empty".to_string());
        }

        if present(&self.supabase_url) != present(&self.supabase_key) {
            errors.push("SUPABASE_URL and SUPABASE_KEY must be set together".to_string());
        }

        if self.google_sheets_credentials.is_some() != present(&self.google_sheets_id) {
            errors.push(
                "GOOGLE_SHEETS_CREDENTIALS and GOOGLE_SHEETS_ID must be set together".to_string(),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    ///
    /// Uses an ephemeral port and an in-memory SQLite database.
    pub fn for_testing() -> Self {
        Self {
            port: 0,
            log_level: "debug".to_string(),
            request_timeout: 5,
            enable_cors: false,
            cors_methods: "*".to_string(),
            cors_headers: "*".to_string(),
            database_path: PathBuf::from(":memory:"),
            ..Default::default()
        }
    }

    /// Builds the storage settings the backend adapter selects from.
    ///
    /// Reads the service-account key file when Google Sheets is configured
    /// and would be selected, that is when Supabase is not configured.
    #[cfg(feature = "sqlite")]
    pub fn storage_settings(&self) -> anyhow::Result<tbi_persistence::StorageSettings> {
        #[allow(unused_mut)]
        let mut settings = tbi_persistence::StorageSettings::sqlite(self.database_path.clone());

        #[cfg(feature = "supabase")]
        if let (Some(url), Some(key)) = (&self.supabase_url, &self.supabase_key)
            && self.has_supabase()
        {
            settings.supabase = Some(
                tbi_persistence::backends::supabase::SupabaseConfig::new(url.clone(), key.clone()),
            );
        }

        #[cfg(feature = "sheets")]
        if let (Some(path), Some(id)) = (&self.google_sheets_credentials, &self.google_sheets_id)
            && self.has_sheets()
            && !(cfg!(feature = "supabase") && self.has_supabase())
        {
            use anyhow::Context;
            use tbi_persistence::backends::sheets::{ServiceAccountKey, SheetsAuth, SheetsConfig};

            let key = ServiceAccountKey::from_file(path)
                .with_context(|| format!("loading Google credentials from {}", path.display()))?;
            settings.sheets = Some(SheetsConfig::new(id.clone(), SheetsAuth::ServiceAccount(key)));
        }

        Ok(settings)
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.database_path, PathBuf::from("pacientes.db"));
        assert!(config.enable_cors);
        assert!(!config.has_supabase());
        assert!(!config.has_sheets());
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            port: 3000,
            host: "0.0.0.0".to_string(),
            ..Default::default()
        };
        assert_eq!(config.socket_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_validate_valid() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_collects_errors() {
        let config = ServerConfig {
            port: 0,
            request_timeout: 0,
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_half_configured_remote_rejected() {
        let config = ServerConfig {
            supabase_url: Some("https://x.supabase.co".to_string()),
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert!(errors[0].contains("SUPABASE_KEY"));

        let config = ServerConfig {
            google_sheets_id: Some("sheet".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_values_count_as_absent() {
        let config = ServerConfig {
            supabase_url: Some("  ".to_string()),
            supabase_key: Some("key".to_string()),
            ..Default::default()
        };
        assert!(!config.has_supabase());
    }

    #[test]
    fn test_parse_from_args() {
        let config = ServerConfig::try_parse_from([
            "tbi-registry",
            "--port",
            "9000",
            "--database-path",
            "/tmp/registry.db",
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.database_path, PathBuf::from("/tmp/registry.db"));
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_storage_settings_default_to_sqlite() {
        let settings = ServerConfig::default().storage_settings().unwrap();
        assert_eq!(settings.sqlite_path, PathBuf::from("pacientes.db"));
    }

    #[cfg(feature = "supabase")]
    #[test]
    fn test_storage_settings_with_supabase() {
        let config = ServerConfig {
            supabase_url: Some("https://x.supabase.co".to_string()),
            supabase_key: Some("key".to_string()),
            ..Default::default()
        };
        let settings = config.storage_settings().unwrap();
        assert_eq!(
            settings.supabase.map(|s| s.url),
            Some("https://x.supabase.co".to_string())
        );
    }

    #[cfg(feature = "sheets")]
    #[test]
    fn test_storage_settings_missing_key_file() {
        let config = ServerConfig {
            google_sheets_credentials: Some(PathBuf::from("/nonexistent/key.json")),
            google_sheets_id: Some("sheet".to_string()),
            ..Default::default()
        };
        assert!(config.storage_settings().is_err());
    }

    #[cfg(all(feature = "sheets", feature = "supabase"))]
    #[test]
    fn test_storage_settings_skips_key_file_when_supabase_wins() {
        let config = ServerConfig {
            supabase_url: Some("https://x.supabase.co".to_string()),
            supabase_key: Some("key".to_string()),
            google_sheets_credentials: Some(PathBuf::from("/nonexistent/key.json")),
            google_sheets_id: Some("sheet".to_string()),
            ..Default::default()
        };
        let settings = config.storage_settings().unwrap();
        assert!(settings.supabase.is_some());
        assert!(settings.sheets.is_none());
    }
}
