//! OAuth credential storage and access-token refresh.
//!
//! This module handles persistence of per-account OAuth credentials and the
//! refresh logic that keeps access tokens usable across an import run.
//! Refreshes are single-flight per account: concurrent callers for the same
//! account share one refresh request instead of racing.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

/// An OAuth credential set for one account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// The access token for API requests.
    pub access_token: String,

    /// The refresh token for obtaining new access tokens.
    pub refresh_token: Option<String>,

    /// When the access token expires.
    pub expires_at: Option<DateTime<Utc>>,

    /// When the credential was last refreshed.
    pub last_refresh: DateTime<Utc>,
}

impl Credential {
    /// Creates a credential from OAuth response data.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
    ) -> Self {
        let expires_at = expires_in_secs.map(|secs| {
            // Subtract a buffer to refresh before actual expiry
            Utc::now() + Duration::seconds(secs) - Duration::seconds(60)
        });

        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at,
            last_refresh: Utc::now(),
        }
    }

    /// Returns true if the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at,
            // If no expiry is set, assume it's valid (some tokens don't expire)
            None => false,
        }
    }

    /// Updates the access token after a refresh.
    pub fn update_access_token(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
    ) {
        self.access_token = access_token.into();
        self.expires_at = expires_in_secs
            .map(|secs| Utc::now() + Duration::seconds(secs) - Duration::seconds(60));
        self.last_refresh = Utc::now();
    }
}

/// Storage backend for per-account credentials.
pub trait CredentialStore: Send + Sync {
    /// Loads the credential for an account, `None` when the account has never
    /// authenticated.
    fn load(&self, account: &str) -> ProviderResult<Option<Credential>>;

    /// Persists the credential for an account.
    fn save(&self, account: &str, credential: &Credential) -> ProviderResult<()>;
}

/// File-backed credential storage: one JSON file per account label.
///
/// Writes go to a temp file first and are renamed into place. Account labels
/// are used verbatim as file stems, so they must be filename-safe.
#[derive(Debug)]
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store rooted at the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the storage directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, account: &str) -> PathBuf {
        self.dir.join(format!("{}.json", account))
    }
}

/// Writes a file that is never readable by other users: created with mode
/// 0600 on unix before any bytes land in it.
fn write_private(path: &Path, content: &str) -> ProviderResult<()> {
    use std::io::Write;

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(|e| {
        ProviderError::configuration(format!("failed to create credential file: {}", e))
    })?;
    file.write_all(content.as_bytes()).map_err(|e| {
        ProviderError::configuration(format!("failed to write credential file: {}", e))
    })
}

impl CredentialStore for FileCredentialStore {
    fn load(&self, account: &str) -> ProviderResult<Option<Credential>> {
        let path = self.path_for(account);
        if !path.exists() {
            debug!("no credential file at {:?}", path);
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            ProviderError::configuration(format!("failed to read credential file: {}", e))
        })?;

        let credential: Credential = serde_json::from_str(&content).map_err(|e| {
            ProviderError::configuration(format!("failed to parse credential file: {}", e))
        })?;

        Ok(Some(credential))
    }

    fn save(&self, account: &str, credential: &Credential) -> ProviderResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            ProviderError::configuration(format!("failed to create credential directory: {}", e))
        })?;

        let path = self.path_for(account);

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(credential).map_err(|e| {
            ProviderError::internal(format!("failed to serialize credential: {}", e))
        })?;

        // A leftover temp file from an interrupted save may carry stale
        // permissions; recreate it rather than truncating in place.
        if temp_path.exists() {
            fs::remove_file(&temp_path).map_err(|e| {
                ProviderError::configuration(format!("failed to remove stale temp file: {}", e))
            })?;
        }
        write_private(&temp_path, &content)?;

        fs::rename(&temp_path, &path).map_err(|e| {
            ProviderError::configuration(format!("failed to rename credential file: {}", e))
        })?;

        debug!("saved credential for {} to {:?}", account, path);
        Ok(())
    }
}

/// In-memory credential storage, for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: StdMutex<HashMap<String, Credential>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with one credential.
    pub fn with_credential(account: impl Into<String>, credential: Credential) -> Self {
        let store = Self::new();
        store
            .entries
            .lock()
            .unwrap()
            .insert(account.into(), credential);
        store
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self, account: &str) -> ProviderResult<Option<Credential>> {
        Ok(self.entries.lock().unwrap().get(account).cloned())
    }

    fn save(&self, account: &str, credential: &Credential) -> ProviderResult<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(account.to_string(), credential.clone());
        Ok(())
    }
}

/// Response from the OAuth token endpoint.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: Option<i64>,
}

/// Hands out usable access tokens, refreshing expired ones on demand.
///
/// Absence of a credential is not an error: [`TokenCache::get_access_token`]
/// returns an empty string for accounts that never authenticated, and callers
/// surface that as a per-calendar "must authenticate" message rather than
/// aborting the whole run.
pub struct TokenCache {
    store: Arc<dyn CredentialStore>,
    http_client: reqwest::Client,
    token_url: String,
    // Per-account gates; the gate is held across the whole load/check/refresh
    // sequence so concurrent callers serialize and see the refreshed token.
    gates: StdMutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl TokenCache {
    /// Creates a cache that refreshes against the given OAuth token endpoint.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        http_client: reqwest::Client,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            http_client,
            token_url: token_url.into(),
            gates: StdMutex::new(HashMap::new()),
        }
    }

    /// Returns the underlying credential store.
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Returns a usable access token for the account.
    ///
    /// Returns an empty string when the account has no stored credential.
    /// An expired token with a refresh token triggers one refresh request;
    /// concurrent callers for the same account wait for it and reuse the
    /// result. An expired token without a refresh token is a terminal
    /// authentication error.
    pub async fn get_access_token(&self, account: &str) -> ProviderResult<String> {
        let gate = {
            let mut gates = self.gates.lock().unwrap();
            gates.entry(account.to_string()).or_default().clone()
        };
        let _guard = gate.lock().await;

        let Some(mut credential) = self.store.load(account)? else {
            debug!("no credential stored for account {}", account);
            return Ok(String::new());
        };

        if !credential.is_expired() {
            return Ok(credential.access_token);
        }

        let Some(refresh_token) = credential.refresh_token.clone() else {
            return Err(ProviderError::authentication(
                "access token expired and no refresh token is available",
            )
            .with_account(account));
        };

        info!("refreshing access token for account {}", account);
        let refreshed = self.refresh(&refresh_token).await?;
        credential.update_access_token(refreshed.access_token.clone(), refreshed.expires_in);
        self.store.save(account, &credential)?;

        Ok(refreshed.access_token)
    }

    /// Performs the refresh-token grant against the token endpoint.
    async fn refresh(&self, refresh_token: &str) -> ProviderResult<RefreshResponse> {
        let response = self
            .http_client
            .post(&self.token_url)
            .json(&serde_json::json!({
                "refresh_token": refresh_token,
                "grant_type": "refresh_token",
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::network("token refresh timed out")
                } else {
                    ProviderError::network(format!("token refresh request failed: {}", e))
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::BAD_REQUEST
        {
            return Err(ProviderError::authentication(format!(
                "token refresh rejected ({})",
                status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::server(format!(
                "token endpoint error ({}): {}",
                status, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read refresh response: {}", e)))?;

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse refresh response: {}", e))
        })
    }
}
