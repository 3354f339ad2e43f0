//! Google service-account authentication.
//!
//! Access tokens are obtained with the OAuth 2.0 JWT bearer grant: a JWT
//! signed with the service account's RSA key is exchanged at the key's
//! `token_uri` for a short-lived bearer token. Tokens are cached and
//! refreshed shortly before they expire.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{BackendError, StorageError, StorageResult};

/// OAuth scope granting read/write access to spreadsheets.
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Tokens are refreshed this long before their reported expiry.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime requested for the signed assertion.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// The fields of a service-account JSON key file that are needed to sign
/// token requests. Other fields in the file are ignored.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServiceAccountKey {
    /// Service account e-mail, used as the JWT issuer.
    pub client_email: String,

    /// PEM-encoded RSA private key.
    pub private_key: String,

    /// Key identifier, sent as the JWT `kid` header.
    #[serde(default)]
    pub private_key_id: Option<String>,

    /// Token endpoint.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

fn auth_config_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::Configuration {
        backend_name: "sheets".to_string(),
        message,
    })
}

impl ServiceAccountKey {
    /// Parses a service-account key from its JSON text.
    pub fn from_json(json: &str) -> StorageResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| auth_config_error(format!("invalid service account key: {}", e)))
    }

    /// Reads a service-account key file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            auth_config_error(format!(
                "cannot read service account key {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json(&text)
    }

    /// Signs a JWT bearer assertion valid from `now`.
    pub fn sign_assertion(&self, now: DateTime<Utc>) -> StorageResult<String> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| auth_config_error(format!("invalid private key: {}", e)))?;
        encode(&header, &claims, &key)
            .map_err(|e| auth_config_error(format!("failed to sign assertion: {}", e)))
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// How requests to the Sheets API are authenticated.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetsAuth {
    /// Sign token requests with a service-account key.
    ServiceAccount(ServiceAccountKey),
    /// Use a pre-minted bearer token as is.
    StaticToken(String),
}

impl std::fmt::Debug for SheetsAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServiceAccount(key) => f.debug_tuple("ServiceAccount").field(key).finish(),
            Self::StaticToken(_) => f.debug_tuple("StaticToken").field(&"<redacted>").finish(),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    refresh_at: DateTime<Utc>,
}

/// Hands out bearer tokens, refreshing them when needed.
#[derive(Debug)]
pub(crate) struct TokenProvider {
    auth: SheetsAuth,
    client: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub(crate) fn new(auth: SheetsAuth, client: Client) -> Self {
        Self {
            auth,
            client,
            cached: Mutex::new(None),
        }
    }

    /// Returns a valid bearer token.
    pub(crate) async fn token(&self) -> StorageResult<String> {
        let key = match &self.auth {
            SheetsAuth::StaticToken(token) => return Ok(token.clone()),
            SheetsAuth::ServiceAccount(key) => key,
        };

        // Held across the exchange so concurrent callers share one refresh.
        let mut cached = self.cached.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref().filter(|t| t.refresh_at > now) {
            return Ok(token.token.clone());
        }

        let fresh = self.exchange(key, now).await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    async fn exchange(&self, key: &ServiceAccountKey, now: DateTime<Utc>) -> StorageResult<CachedToken> {
        let assertion = key.sign_assertion(now)?;
        let response = self
            .client
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Backend(BackendError::Unavailable {
                backend_name: "sheets".to_string(),
                message: format!("token exchange failed ({}): {}", status.as_u16(), message),
            }));
        }

        let body: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(body.expires_in).saturating_sub(REFRESH_MARGIN);
        let refresh_at = now + chrono::Duration::from_std(lifetime).unwrap_or_default();
        debug!(client_email = %key.client_email, expires_in = body.expires_in, "Obtained Sheets access token");

        Ok(CachedToken {
            token: body.access_token,
            refresh_at,
        })
    }
}
