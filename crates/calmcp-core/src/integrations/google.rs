//! Google account credentials.
//!
//! Client credentials and OAuth tokens live in the OS keyring. Calendar
//! calls only ever see the [`AccessToken`] produced here.

use super::keyring_store;
use super::oauth::{self, AccessToken, OAuthConfig};
use crate::error::OAuthError;

const SERVICE: &str = "google";
const CLIENT_ID_KEY: &str = "google_client_id";
const CLIENT_SECRET_KEY: &str = "google_client_secret";

/// Google OAuth credentials and token lifecycle.
#[derive(Debug, Clone, Default)]
pub struct GoogleAuth {
    client_id: String,
    client_secret: String,
}

impl GoogleAuth {
    /// Load credentials from keyring. Returns empty strings if not stored yet.
    pub fn new() -> Self {
        let client_id = keyring_store::get(CLIENT_ID_KEY)
            .ok()
            .flatten()
            .unwrap_or_default();
        let client_secret = keyring_store::get(CLIENT_SECRET_KEY)
            .ok()
            .flatten()
            .unwrap_or_default();

        Self {
            client_id,
            client_secret,
        }
    }

    /// Persist Google OAuth client credentials to the OS keyring.
    pub fn set_credentials(client_id: &str, client_secret: &str) -> Result<(), OAuthError> {
        keyring_store::set(CLIENT_ID_KEY, client_id)?;
        keyring_store::set(CLIENT_SECRET_KEY, client_secret)?;
        Ok(())
    }

    pub fn has_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    pub fn oauth_config(&self) -> OAuthConfig {
        OAuthConfig {
            service_name: SERVICE.to_string(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            scopes: vec![
                "https://www.googleapis.com/auth/calendar.events".to_string(),
                "https://www.googleapis.com/auth/calendar.readonly".to_string(),
            ],
            redirect_port: 19822,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        oauth::load_tokens(SERVICE).is_some()
    }

    /// Run the browser consent flow and store the resulting tokens.
    pub async fn login(&self) -> Result<(), OAuthError> {
        if !self.has_credentials() {
            return Err(OAuthError::CredentialsNotConfigured {
                service: SERVICE.to_string(),
            });
        }
        oauth::authorize(&self.oauth_config()).await?;
        tracing::info!("google account authorized");
        Ok(())
    }

    /// Remove stored tokens. Client credentials are kept.
    pub fn logout(&self) -> Result<(), OAuthError> {
        keyring_store::delete(SERVICE)
    }

    /// Return a valid access token, refreshing if expired.
    pub async fn access_token(&self) -> Result<AccessToken, OAuthError> {
        let tokens = oauth::load_tokens(SERVICE).ok_or_else(|| OAuthError::NotAuthenticated {
            service: SERVICE.to_string(),
        })?;

        if !oauth::is_expired(&tokens) {
            return Ok(AccessToken::new(tokens.access_token));
        }

        let refresh = tokens
            .refresh_token
            .as_deref()
            .ok_or(OAuthError::TokenExpired)?;

        tracing::debug!("google access token expired, refreshing");
        let refreshed = oauth::refresh_token(&self.oauth_config(), refresh).await?;
        Ok(AccessToken::new(refreshed.access_token))
    }
}
