use auth::*;
use serial_test::serial;

#[test]
#[serial]
fn uses_keyring_when_available() {
    std::env::set_var("MOCK_KEYRING", "1");
    std::env::remove_var(API_TOKEN_ENV);
    store_api_token("key_token").unwrap();
    store_csrf_token("csrf-1").unwrap();

    let credentials = load_credentials().unwrap();
    assert_eq!(credentials.api_token, "key_token");
    assert_eq!(credentials.csrf_token.as_deref(), Some("csrf-1"));
    assert!(std::env::var(USE_FILE_STORE_ENV).is_err());

    clear_credentials().unwrap();
    assert!(matches!(load_credentials(), Err(AuthError::MissingToken)));
    std::env::remove_var("MOCK_KEYRING");
}

#[test]
#[serial]
fn env_token_overrides_keyring() {
    std::env::set_var("MOCK_KEYRING", "1");
    store_api_token("stored").unwrap();
    std::env::set_var(API_TOKEN_ENV, "from-env");
    assert_eq!(load_credentials().unwrap().api_token, "from-env");
    std::env::remove_var(API_TOKEN_ENV);
    assert_eq!(load_credentials().unwrap().api_token, "stored");
    clear_credentials().unwrap();
    std::env::remove_var("MOCK_KEYRING");
}

#[cfg(feature = "file-store")]
#[test]
#[serial]
fn fallback_to_file_store_when_keyring_fails() {
    use tempfile::TempDir;
    let dir = TempDir::new().unwrap();
    std::env::set_var("HOME", dir.path());
    std::env::set_var("MOCK_KEYRING_FAIL", "1");
    store_api_token("file_token").unwrap();
    let path = dir.path().join(".assetdesk").join("tokens.json");
    assert!(path.exists());
    assert_eq!(get_api_token().unwrap().as_deref(), Some("file_token"));
    assert_eq!(std::env::var(USE_FILE_STORE_ENV).unwrap(), "1");
    std::env::remove_var("MOCK_KEYRING_FAIL");
    std::env::remove_var(USE_FILE_STORE_ENV);
}
