pub mod google;
pub mod oauth;

pub use google::GoogleAuth;
pub use oauth::{AccessToken, OAuthConfig, OAuthTokens};

/// Thin wrapper around the OS keyring for credential storage.
pub mod keyring_store {
    use crate::error::OAuthError;

    const SERVICE: &str = "calmcp";

    pub fn get(key: &str) -> Result<Option<String>, OAuthError> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.get_password() {
            Ok(pw) => Ok(Some(pw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set(key: &str, value: &str) -> Result<(), OAuthError> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        entry.set_password(value)?;
        Ok(())
    }

    pub fn delete(key: &str) -> Result<(), OAuthError> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
