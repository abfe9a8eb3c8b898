//! Native Google API client.
//!
//! Direct HTTP via reqwest; no SDK. The token file format matches what
//! Google's OAuth2 libraries write, so a token minted elsewhere keeps
//! working here.
//!
//! Modules:
//! - auth: OAuth2 browser consent flow
//! - sheets: the two Sheets calls backing the contacts table

pub mod auth;
pub mod sheets;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The one scope this tool needs: the contacts sheet.
pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/spreadsheets"];

// ============================================================================
// Token types — compatible with Google's OAuth2 token JSON
// ============================================================================

/// OAuth2 token payload persisted to the token file.
///
/// Both `token` and `access_token` are accepted on read for compatibility
/// with tokens written by other Google client libraries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleToken {
    /// The short-lived access token.
    #[serde(alias = "access_token")]
    pub token: String,
    /// The long-lived refresh token.
    pub refresh_token: Option<String>,
    /// Token endpoint URL.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    /// OAuth2 client ID.
    pub client_id: String,
    /// OAuth2 client secret (Desktop-app clients carry one).
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Authorized scopes.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Token expiry time (ISO 8601).
    #[serde(default)]
    pub expiry: Option<String>,
    /// Authenticated account email.
    #[serde(default, alias = "email")]
    pub account: Option<String>,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// OAuth2 client credentials from credentials.json (Desktop App type).
#[derive(Debug, Clone, Deserialize)]
pub struct ClientCredentials {
    pub installed: InstalledAppCredentials,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstalledAppCredentials {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub auth_uri: String,
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

// ============================================================================
// Error type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GoogleApiError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Token expired or revoked")]
    AuthExpired,
    #[error("Credentials not found at {0}")]
    CredentialsNotFound(PathBuf),
    #[error("Token not found at {0} (run `outreach auth` first)")]
    TokenNotFound(PathBuf),
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("OAuth flow cancelled")]
    FlowCancelled,
    #[error("Invalid credentials format: {0}")]
    InvalidCredentials(String),
}

// ============================================================================
// Bounded retry
// ============================================================================

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 2_000,
        }
    }
}

fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

fn retry_delay(
    attempt: u32,
    policy: &RetryPolicy,
    retry_after: Option<&reqwest::header::HeaderValue>,
) -> Duration {
    if let Some(value) = retry_after.and_then(|v| v.to_str().ok()) {
        if let Ok(secs) = value.parse::<u64>() {
            return Duration::from_secs(secs.min(30));
        }
    }

    let exponent = 2u64.saturating_pow(attempt.saturating_sub(1));
    let millis = policy
        .initial_backoff_ms
        .saturating_mul(exponent)
        .min(policy.max_backoff_ms);
    Duration::from_millis(millis)
}

/// Send a request, retrying rate limits, timeouts, and server errors with
/// exponential backoff, honoring `Retry-After` when Google sends one.
pub async fn send_with_retry(
    request: reqwest::RequestBuilder,
    policy: &RetryPolicy,
) -> Result<reqwest::Response, GoogleApiError> {
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        let Some(cloned) = request.try_clone() else {
            return request.send().await.map_err(GoogleApiError::Http);
        };

        match cloned.send().await {
            Ok(response) => {
                let status = response.status();
                if is_retryable_status(status) && attempt < attempts {
                    let delay = retry_delay(
                        attempt,
                        policy,
                        response.headers().get(reqwest::header::RETRY_AFTER),
                    );
                    log::warn!(
                        "google_api retry {}/{} after status {} (sleep {:?})",
                        attempt,
                        attempts,
                        status,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Ok(response);
            }
            Err(err) => {
                let retryable_transport = err.is_timeout() || err.is_connect();
                if retryable_transport && attempt < attempts {
                    let delay = retry_delay(attempt, policy, None);
                    log::warn!(
                        "google_api retry {}/{} after transport error: {} (sleep {:?})",
                        attempt,
                        attempts,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Err(GoogleApiError::Http(err));
            }
        }
    }

    Err(GoogleApiError::RefreshFailed(
        "request exhausted retries".to_string(),
    ))
}

// ============================================================================
// Token I/O
// ============================================================================

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".outreach")
        .join("google")
}

/// Path to the persisted OAuth token.
pub fn token_path() -> PathBuf {
    config_dir().join("token.json")
}

/// Default path to the OAuth client credentials file.
pub fn credentials_path() -> PathBuf {
    config_dir().join("credentials.json")
}

/// Load the persisted token.
pub fn load_token() -> Result<GoogleToken, GoogleApiError> {
    let path = token_path();
    if !path.exists() {
        return Err(GoogleApiError::TokenNotFound(path));
    }
    let content = std::fs::read_to_string(&path)?;
    let token: GoogleToken = serde_json::from_str(&content)?;
    Ok(token)
}

/// Persist the token: private directory, atomic replace, owner-only file.
pub fn save_token(token: &GoogleToken) -> Result<(), GoogleApiError> {
    let path = token_path();

    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))?;
            }
        }
    }

    let content = serde_json::to_string_pretty(token)?;
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(content.as_bytes())?;
    file.persist(&path).map_err(|e| e.error)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

/// Load OAuth client credentials, preferring an explicit override path.
pub fn load_credentials(path: Option<&Path>) -> Result<ClientCredentials, GoogleApiError> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(credentials_path);
    if !path.exists() {
        return Err(GoogleApiError::CredentialsNotFound(path));
    }
    let content = std::fs::read_to_string(&path)?;
    let creds: ClientCredentials = serde_json::from_str(&content)
        .map_err(|e| GoogleApiError::InvalidCredentials(format!("{}: {}", path.display(), e)))?;
    Ok(creds)
}

// ============================================================================
// Token refresh
// ============================================================================

/// Check whether a token is expired (or within 60 seconds of it).
pub fn is_token_expired(token: &GoogleToken) -> bool {
    match &token.expiry {
        None => true, // No expiry = assume expired, try refresh
        Some(expiry_str) => {
            match chrono::DateTime::parse_from_rfc3339(&expiry_str.replace('Z', "+00:00"))
                .or_else(|_| chrono::DateTime::parse_from_rfc3339(expiry_str))
            {
                Ok(expiry) => {
                    let now = chrono::Utc::now();
                    expiry <= now + chrono::Duration::seconds(60)
                }
                Err(_) => true, // Can't parse = assume expired
            }
        }
    }
}

/// Exchange the refresh token for a fresh access token and persist it.
pub async fn refresh_access_token(token: &GoogleToken) -> Result<GoogleToken, GoogleApiError> {
    let refresh_token = token
        .refresh_token
        .as_ref()
        .ok_or(GoogleApiError::AuthExpired)?;

    let client = reqwest::Client::new();
    let mut form = vec![
        ("client_id", token.client_id.as_str()),
        ("refresh_token", refresh_token.as_str()),
        ("grant_type", "refresh_token"),
    ];
    if let Some(secret) = token.client_secret.as_deref() {
        form.push(("client_secret", secret));
    }

    let resp = client.post(&token.token_uri).form(&form).send().await?;
    let status = resp.status();
    let body_text = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(map_refresh_error(status.as_u16(), &body_text));
    }
    let body: serde_json::Value = serde_json::from_str(&body_text)?;

    let access_token = body["access_token"]
        .as_str()
        .ok_or_else(|| GoogleApiError::RefreshFailed("No access_token in response".into()))?;

    let expires_in = body["expires_in"].as_u64().unwrap_or(3600);
    let expiry = chrono::Utc::now() + chrono::Duration::seconds(expires_in as i64);

    let mut new_token = token.clone();
    new_token.token = access_token.to_string();
    new_token.expiry = Some(expiry.to_rfc3339());

    save_token(&new_token)?;

    Ok(new_token)
}

fn map_refresh_error(status: u16, body: &str) -> GoogleApiError {
    let lowered = body.to_lowercase();
    if (status == 400 || status == 401)
        && (lowered.contains("invalid_grant") || lowered.contains("token has been expired"))
    {
        return GoogleApiError::AuthExpired;
    }
    GoogleApiError::RefreshFailed(format!("HTTP {}: {}", status, body))
}

/// Get a valid access token, refreshing if expired.
///
/// The entry point for every API call.
pub async fn get_valid_access_token() -> Result<String, GoogleApiError> {
    let token = load_token()?;

    if is_token_expired(&token) {
        let refreshed = refresh_access_token(&token).await?;
        Ok(refreshed.token)
    } else {
        Ok(token.token)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_roundtrip() {
        let token = GoogleToken {
            token: "ya29.test-access-token".to_string(),
            refresh_token: Some("1//test-refresh-token".to_string()),
            token_uri: default_token_uri(),
            client_id: "12345.apps.googleusercontent.com".to_string(),
            client_secret: Some("test-secret".to_string()),
            scopes: vec![SCOPES[0].to_string()],
            expiry: Some("2026-02-08T12:00:00Z".to_string()),
            account: Some("user@example.com".to_string()),
        };

        let json = serde_json::to_string_pretty(&token).unwrap();
        let parsed: GoogleToken = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.token, "ya29.test-access-token");
        assert_eq!(parsed.refresh_token.as_deref(), Some("1//test-refresh-token"));
        assert_eq!(parsed.account.as_deref(), Some("user@example.com"));
    }

    #[test]
    fn token_accepts_access_token_alias() {
        let json = r#"{
            "access_token": "ya29.alias-token",
            "refresh_token": "1//refresh",
            "client_id": "client",
            "client_secret": "secret"
        }"#;

        let token: GoogleToken = serde_json::from_str(json).unwrap();
        assert_eq!(token.token, "ya29.alias-token");
        assert_eq!(token.token_uri, default_token_uri());
    }

    #[test]
    fn expiry_missing_or_past_means_expired() {
        let mut token = GoogleToken {
            token: "t".to_string(),
            refresh_token: None,
            token_uri: default_token_uri(),
            client_id: "c".to_string(),
            client_secret: None,
            scopes: vec![],
            expiry: None,
            account: None,
        };
        assert!(is_token_expired(&token));

        token.expiry = Some((chrono::Utc::now() - chrono::Duration::hours(1)).to_rfc3339());
        assert!(is_token_expired(&token));

        token.expiry = Some((chrono::Utc::now() + chrono::Duration::hours(1)).to_rfc3339());
        assert!(!is_token_expired(&token));
    }

    #[test]
    fn credentials_json_parses_desktop_app_shape() {
        let json = r#"{
            "installed": {
                "client_id": "12345.apps.googleusercontent.com",
                "client_secret": "secret",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token",
                "redirect_uris": ["http://localhost"]
            }
        }"#;

        let creds: ClientCredentials = serde_json::from_str(json).unwrap();
        assert_eq!(creds.installed.client_id, "12345.apps.googleusercontent.com");
        assert_eq!(creds.installed.redirect_uris, vec!["http://localhost"]);
    }

    #[test]
    fn refresh_error_distinguishes_revocation_from_noise() {
        assert!(matches!(
            map_refresh_error(400, r#"{"error": "invalid_grant"}"#),
            GoogleApiError::AuthExpired
        ));
        assert!(matches!(
            map_refresh_error(500, "server fell over"),
            GoogleApiError::RefreshFailed(_)
        ));
    }
}
