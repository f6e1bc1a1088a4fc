//! Session handling and account flows for the album service.

use api_client::{ApiClient, ApiClientError, LoginRequest, RegisterRequest};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

const KEYRING_SERVICE_NAME: &str = "Albumz";
const TOKEN_FILE_NAME: &str = "tokens.json";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("No access token available, log in first")]
    Missing,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Authentication rejected: {0}")]
    Rejected(String),
    #[error("Keyring Error: {0}")]
    Keyring(String),
    #[error("Token store error: {0}")]
    Store(String),
    #[error(transparent)]
    Api(#[from] ApiClientError),
}

/// Where the front-end should navigate next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    Albums,
    Album(i64),
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Login => write!(f, "/login"),
            Route::Register => write!(f, "/register"),
            Route::Albums => write!(f, "/"),
            Route::Album(id) => write!(f, "/album/{}", id),
        }
    }
}

/// Credentials of the logged-in account. Passed explicitly to every
/// component that talks to the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    access_token: Option<String>,
    refresh_token: Option<String>,
    username: Option<String>,
    is_logged_in: bool,
}

impl Session {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>, username: impl Into<String>) -> Self {
        Session {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
            username: Some(username.into()),
            is_logged_in: true,
        }
    }

    pub fn anonymous() -> Self {
        Session::default()
    }

    /// The bearer credential for authenticated calls.
    pub fn bearer(&self) -> Result<&str, AuthError> {
        match self.access_token.as_deref() {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(AuthError::Missing),
        }
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.is_logged_in && self.access_token.is_some()
    }
}

/// Session persisted in the platform keyring.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl Default for KeyringStore {
    fn default() -> Self {
        KeyringStore {
            service: KEYRING_SERVICE_NAME.to_string(),
        }
    }
}

impl KeyringStore {
    fn entry(&self, key: &str) -> Result<Entry, AuthError> {
        Entry::new(&self.service, key).map_err(|e| AuthError::Keyring(e.to_string()))
    }

    fn read(&self, key: &str) -> Result<Option<String>, AuthError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(AuthError::Keyring(e.to_string())),
        }
    }

    fn write(&self, key: &str, value: Option<&str>) -> Result<(), AuthError> {
        let entry = self.entry(key)?;
        match value {
            Some(value) => entry
                .set_password(value)
                .map_err(|e| AuthError::Keyring(e.to_string())),
            None => match entry.delete_password() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(AuthError::Keyring(e.to_string())),
            },
        }
    }

    pub fn load(&self) -> Result<Option<Session>, AuthError> {
        let access_token = match self.read("access_token")? {
            Some(token) => token,
            None => return Ok(None),
        };
        Ok(Some(Session {
            access_token: Some(access_token),
            refresh_token: self.read("refresh_token")?,
            username: self.read("username")?,
            is_logged_in: self.read("is_logged_in")?.as_deref() == Some("true"),
        }))
    }

    pub fn save(&self, session: &Session) -> Result<(), AuthError> {
        self.write("access_token", session.access_token.as_deref())?;
        self.write("refresh_token", session.refresh_token.as_deref())?;
        self.write("username", session.username.as_deref())?;
        self.write("is_logged_in", Some(if session.is_logged_in { "true" } else { "false" }))
    }

    pub fn clear(&self) -> Result<(), AuthError> {
        for key in ["access_token", "refresh_token", "username", "is_logged_in"] {
            self.write(key, None)?;
        }
        Ok(())
    }
}

/// Session persisted as JSON on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        FileStore { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Session>, AuthError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&self.path).map_err(|e| AuthError::Store(e.to_string()))?;
        let session = serde_json::from_str(&data).map_err(|e| AuthError::Store(e.to_string()))?;
        Ok(Some(session))
    }

    pub fn save(&self, session: &Session) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AuthError::Store(e.to_string()))?;
        }
        let data = serde_json::to_string_pretty(session).map_err(|e| AuthError::Store(e.to_string()))?;
        std::fs::write(&self.path, data).map_err(|e| AuthError::Store(e.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .map_err(|e| AuthError::Store(e.to_string()))?;
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<(), AuthError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::Store(e.to_string())),
        }
    }
}

/// Persistent session storage. Prefers the keyring and falls back to the
/// token file when the keyring is unavailable.
#[derive(Debug, Clone)]
pub struct TokenStore {
    keyring: Option<KeyringStore>,
    file: FileStore,
}

impl TokenStore {
    pub fn new(data_dir: &Path, use_file_store: bool) -> Self {
        TokenStore {
            keyring: if use_file_store { None } else { Some(KeyringStore::default()) },
            file: FileStore::new(data_dir.join(TOKEN_FILE_NAME)),
        }
    }

    pub fn file_only(path: PathBuf) -> Self {
        TokenStore {
            keyring: None,
            file: FileStore::new(path),
        }
    }

    /// Default data directory, `~/.albumz`.
    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".albumz")
    }

    pub fn file(&self) -> &FileStore {
        &self.file
    }

    /// Load the stored session, or an anonymous one when nothing is stored.
    pub fn load(&self) -> Result<Session, AuthError> {
        if let Some(keyring) = &self.keyring {
            match keyring.load() {
                Ok(Some(session)) => return Ok(session),
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "keyring unavailable, reading token file"),
            }
        }
        Ok(self.file.load()?.unwrap_or_default())
    }

    pub fn save(&self, session: &Session) -> Result<(), AuthError> {
        if let Some(keyring) = &self.keyring {
            match keyring.save(session) {
                Ok(()) => return Ok(()),
                Err(e) => tracing::warn!(error = %e, "keyring unavailable, falling back to token file"),
            }
        }
        self.file.save(session)
    }

    pub fn clear(&self) -> Result<(), AuthError> {
        if let Some(keyring) = &self.keyring {
            if let Err(e) = keyring.clear() {
                tracing::warn!(error = %e, "failed to clear keyring entries");
            }
        }
        self.file.clear()
    }
}

fn detail_from(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// Log in, persist the token pair and return the new session.
#[cfg_attr(feature = "trace-spans", tracing::instrument(skip(client, store, password)))]
pub async fn login(
    client: &ApiClient,
    store: &TokenStore,
    username: &str,
    password: &str,
) -> Result<(Session, Route), AuthError> {
    let response = client
        .login(&LoginRequest { username, password })
        .await
        .map_err(|e| match e {
            ApiClientError::Status { body, .. } => AuthError::Rejected(detail_from(&body)),
            other => AuthError::Api(other),
        })?;

    let (access, refresh) = match (response.access, response.refresh) {
        (Some(access), Some(refresh)) => (access, refresh),
        _ => {
            let detail = response.detail.unwrap_or_else(|| "response lacks a token pair".into());
            tracing::error!(%detail, "authentication failed");
            return Err(AuthError::Rejected(detail));
        }
    };

    let session = Session::new(access, refresh, username);
    store.save(&session)?;
    tracing::info!(username, "logged in");
    Ok((session, Route::Albums))
}

/// Register a new account. Password confirmation is checked before any
/// request is sent.
#[cfg_attr(feature = "trace-spans", tracing::instrument(skip(client, form)))]
pub async fn register(client: &ApiClient, form: &RegisterRequest<'_>) -> Result<Route, AuthError> {
    if form.password1 != form.password2 {
        tracing::error!("passwords do not match");
        return Err(AuthError::PasswordMismatch);
    }
    let status = client.register(form).await.map_err(|e| match e {
        ApiClientError::Status { body, .. } => AuthError::Rejected(detail_from(&body)),
        other => AuthError::Api(other),
    })?;
    if status != 201 {
        return Err(AuthError::Rejected(format!("unexpected status {}", status)));
    }
    tracing::info!(username = form.username, "registered");
    Ok(Route::Login)
}

pub fn logout(store: &TokenStore) -> Result<Route, AuthError> {
    store.clear()?;
    tracing::info!("logged out");
    Ok(Route::Login)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    fn test_bearer_requires_token() {
        assert_eq!(Session::anonymous().bearer(), Err(AuthError::Missing));
        let session = Session::new("acc", "ref", "ann");
        assert_eq!(session.bearer(), Ok("acc"));
        assert!(session.is_logged_in());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested").join(TOKEN_FILE_NAME));
        assert_eq!(store.load().unwrap(), None);

        let session = Session::new("acc", "ref", "ann");
        store.save(&session).unwrap();
        assert_eq!(store.load().unwrap(), Some(session));

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("accessToken"));
        assert!(raw.contains("isLoggedIn"));

        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    #[serial]
    fn test_keyring_save_with_mock_backend() {
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());
        let dir = tempdir().unwrap();
        let store = TokenStore::new(dir.path(), false);
        store.save(&Session::new("acc", "ref", "ann")).unwrap();
        assert!(!store.file().path().exists());
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::Album(4).to_string(), "/album/4");
        assert_eq!(Route::Albums.to_string(), "/");
    }

    #[test]
    fn test_detail_from_body() {
        assert_eq!(detail_from(r#"{"detail": "No active account"}"#), "No active account");
        assert_eq!(detail_from("plain"), "plain");
    }
}
