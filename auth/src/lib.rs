//! Storage of the AssetDesk API credentials.
//!
//! The personal API token and the optional CSRF token live in the OS
//! keyring. `MOCK_KEYRING` swaps the keyring for an in-process map, and with
//! the `file-store` feature a failing keyring falls back to
//! `~/.assetdesk/tokens.json`.

use api_client::Credentials;
use keyring::Entry;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

const KEYRING_SERVICE_NAME: &str = "AssetDesk";
const API_TOKEN_KEY: &str = "api_token";
const CSRF_TOKEN_KEY: &str = "csrf_token";

/// Set once a write had to fall back to the token file.
pub const USE_FILE_STORE_ENV: &str = "ASSETDESK_USE_FILE_STORE";
/// Token taken as-is instead of reading the keyring.
pub const API_TOKEN_ENV: &str = "ASSETDESK_API_TOKEN";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Keyring Error: {0}")]
    Keyring(String),
    #[error("No API token stored, run `asset_cli login --token <TOKEN>` first")]
    MissingToken,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Other Error: {0}")]
    Other(String),
}

static MOCK_STORE: Lazy<Mutex<HashMap<String, String>>> = Lazy::new(|| Mutex::new(HashMap::new()));

fn use_mock_keyring() -> bool {
    std::env::var("MOCK_KEYRING").is_ok()
}

fn mock_store() -> std::sync::MutexGuard<'static, HashMap<String, String>> {
    MOCK_STORE.lock().unwrap_or_else(|e| e.into_inner())
}

fn keyring_set(key: &str, value: &str) -> Result<(), AuthError> {
    if std::env::var("MOCK_KEYRING_FAIL").is_ok() {
        return Err(AuthError::Keyring("mock keyring unavailable".into()));
    }
    if use_mock_keyring() {
        mock_store().insert(key.to_string(), value.to_string());
        return Ok(());
    }
    Entry::new(KEYRING_SERVICE_NAME, key)
        .and_then(|entry| entry.set_password(value))
        .map_err(|e| AuthError::Keyring(e.to_string()))
}

fn keyring_get(key: &str) -> Result<Option<String>, AuthError> {
    if use_mock_keyring() {
        let stored = mock_store().get(key).cloned();
        if stored.is_none() && key == API_TOKEN_KEY {
            return Ok(std::env::var("MOCK_API_TOKEN").ok());
        }
        return Ok(stored);
    }
    let entry = Entry::new(KEYRING_SERVICE_NAME, key).map_err(|e| AuthError::Keyring(e.to_string()))?;
    match entry.get_password() {
        Ok(value) => Ok(Some(value)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(AuthError::Keyring(e.to_string())),
    }
}

fn keyring_delete(key: &str) -> Result<(), AuthError> {
    if use_mock_keyring() {
        mock_store().remove(key);
        return Ok(());
    }
    let entry = Entry::new(KEYRING_SERVICE_NAME, key).map_err(|e| AuthError::Keyring(e.to_string()))?;
    match entry.delete_password() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(AuthError::Keyring(e.to_string())),
    }
}

#[cfg(feature = "file-store")]
mod file_store {
    use super::AuthError;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[derive(Default, Serialize, Deserialize)]
    struct Tokens {
        #[serde(flatten)]
        values: HashMap<String, String>,
    }

    fn path() -> Result<PathBuf, AuthError> {
        dirs::home_dir()
            .map(|home| home.join(".assetdesk").join("tokens.json"))
            .ok_or_else(|| AuthError::Other("no home directory".into()))
    }

    fn load() -> Result<Tokens, AuthError> {
        let path = path()?;
        if !path.exists() {
            return Ok(Tokens::default());
        }
        let data = std::fs::read_to_string(&path).map_err(|e| AuthError::Other(e.to_string()))?;
        serde_json::from_str(&data).map_err(|e| AuthError::Other(e.to_string()))
    }

    fn save(tokens: &Tokens) -> Result<(), AuthError> {
        let path = path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AuthError::Other(e.to_string()))?;
        }
        let data = serde_json::to_string_pretty(tokens).map_err(|e| AuthError::Other(e.to_string()))?;
        std::fs::write(&path, data).map_err(|e| AuthError::Other(e.to_string()))
    }

    pub fn set(key: &str, value: &str) -> Result<(), AuthError> {
        let mut tokens = load()?;
        tokens.values.insert(key.to_string(), value.to_string());
        save(&tokens)
    }

    pub fn get(key: &str) -> Result<Option<String>, AuthError> {
        Ok(load()?.values.get(key).cloned())
    }

    pub fn remove(key: &str) -> Result<(), AuthError> {
        let mut tokens = load()?;
        if tokens.values.remove(key).is_some() {
            save(&tokens)?;
        }
        Ok(())
    }
}

#[cfg(feature = "file-store")]
fn using_file_store() -> bool {
    std::env::var(USE_FILE_STORE_ENV).is_ok()
}

fn store(key: &str, value: &str) -> Result<(), AuthError> {
    #[cfg(feature = "file-store")]
    if using_file_store() {
        return file_store::set(key, value);
    }
    match keyring_set(key, value) {
        Ok(()) => Ok(()),
        #[cfg(feature = "file-store")]
        Err(e) => {
            tracing::warn!(error = %e, "keyring unavailable, storing credentials in file");
            file_store::set(key, value)?;
            std::env::set_var(USE_FILE_STORE_ENV, "1");
            Ok(())
        }
        #[cfg(not(feature = "file-store"))]
        Err(e) => Err(e),
    }
}

fn load(key: &str) -> Result<Option<String>, AuthError> {
    #[cfg(feature = "file-store")]
    if using_file_store() {
        return file_store::get(key);
    }
    keyring_get(key)
}

fn remove(key: &str) -> Result<(), AuthError> {
    #[cfg(feature = "file-store")]
    file_store::remove(key)?;
    keyring_delete(key)
}

#[cfg_attr(feature = "trace-spans", tracing::instrument(skip(token)))]
pub fn store_api_token(token: &str) -> Result<(), AuthError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidToken("token is empty".into()));
    }
    if token.chars().any(char::is_whitespace) {
        return Err(AuthError::InvalidToken("token contains whitespace".into()));
    }
    store(API_TOKEN_KEY, token)?;
    tracing::info!("API token stored");
    Ok(())
}

pub fn get_api_token() -> Result<Option<String>, AuthError> {
    load(API_TOKEN_KEY)
}

pub fn store_csrf_token(token: &str) -> Result<(), AuthError> {
    store(CSRF_TOKEN_KEY, token.trim())
}

pub fn get_csrf_token() -> Result<Option<String>, AuthError> {
    load(CSRF_TOKEN_KEY)
}

/// Forget both tokens.
pub fn clear_credentials() -> Result<(), AuthError> {
    remove(API_TOKEN_KEY)?;
    remove(CSRF_TOKEN_KEY)?;
    tracing::info!("credentials cleared");
    Ok(())
}

/// Resolve the credentials used for this session.
///
/// `ASSETDESK_API_TOKEN` wins over the keyring.
#[cfg_attr(feature = "trace-spans", tracing::instrument)]
pub fn load_credentials() -> Result<Credentials, AuthError> {
    let token = match std::env::var(API_TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => token.trim().to_string(),
        _ => get_api_token()?.ok_or(AuthError::MissingToken)?,
    };
    let mut credentials = Credentials::new(token);
    match get_csrf_token() {
        Ok(Some(csrf)) if !csrf.is_empty() => credentials = credentials.with_csrf(csrf),
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "could not read CSRF token"),
    }
    Ok(credentials)
}
