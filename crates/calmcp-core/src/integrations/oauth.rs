//! OAuth2 Authorization Code flow for desktop use, plus token storage.
//!
//! 1. Opens browser to authorization URL
//! 2. Starts a tiny localhost HTTP server to receive the callback
//! 3. Exchanges the code for an access token (+ refresh token)
//! 4. Stores tokens in OS keyring

use std::fmt;
use std::io::{Read, Write};
use std::net::TcpListener;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::keyring_store;
use crate::error::OAuthError;

/// Seconds before expiry at which a token is already treated as expired.
const EXPIRY_BUFFER_SECS: i64 = 60;

/// Opaque bearer capability handed to calendar calls.
///
/// Its lifecycle belongs to the auth layer; calendar code only reads it.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(****)")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>, // Unix timestamp
    pub token_type: String,
    pub scope: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub service_name: String,
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
    pub redirect_port: u16,
}

impl OAuthConfig {
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/callback", self.redirect_port)
    }

    pub fn auth_url_full(&self) -> String {
        let scopes = self.scopes.join(" ");
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri()),
            urlencoding::encode(&scopes),
        )
    }
}

/// Run the full OAuth2 flow: open browser -> listen for callback -> exchange code.
pub async fn authorize(config: &OAuthConfig) -> Result<OAuthTokens, OAuthError> {
    let auth_url = config.auth_url_full();
    open::that(&auth_url).map_err(|e| OAuthError::AuthorizationFailed(e.to_string()))?;

    let code = wait_for_callback(config.redirect_port)?;
    let tokens = exchange_code(config, &code).await?;
    store_tokens(&config.service_name, &tokens)?;
    Ok(tokens)
}

/// Block until the browser hits the redirect URI; return the `code` parameter.
fn wait_for_callback(port: u16) -> Result<String, OAuthError> {
    let io_err = |e: std::io::Error| OAuthError::AuthorizationFailed(e.to_string());

    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).map_err(io_err)?;
    let (mut stream, _) = listener.accept().map_err(io_err)?;
    let mut buf = [0u8; 4096];
    let n = stream.read(&mut buf).map_err(io_err)?;
    let request = String::from_utf8_lossy(&buf[..n]);

    let code = extract_code(&request)
        .ok_or_else(|| OAuthError::InvalidCallback("no code in callback".into()))?;

    let response = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n<html><body><h2>Authentication successful!</h2><p>You can close this tab.</p><script>window.close()</script></body></html>";
    stream.write_all(response.as_bytes()).map_err(io_err)?;
    Ok(code)
}

/// Parse a token endpoint response body.
fn parse_token_response(
    body: &serde_json::Value,
    previous_refresh: Option<&str>,
) -> Result<OAuthTokens, String> {
    if let Some(error) = body.get("error") {
        return Err(error.to_string());
    }

    let access_token = body["access_token"]
        .as_str()
        .ok_or("missing access_token in response")?
        .to_string();
    let expires_at = body
        .get("expires_in")
        .and_then(|v| v.as_i64())
        .map(|ei| chrono::Utc::now().timestamp() + ei);

    Ok(OAuthTokens {
        access_token,
        refresh_token: body
            .get("refresh_token")
            .and_then(|v| v.as_str())
            .map(String::from)
            .or_else(|| previous_refresh.map(String::from)),
        expires_at,
        token_type: body["token_type"].as_str().unwrap_or("Bearer").to_string(),
        scope: body.get("scope").and_then(|v| v.as_str()).map(String::from),
    })
}

/// Exchange authorization code for tokens.
async fn exchange_code(config: &OAuthConfig, code: &str) -> Result<OAuthTokens, OAuthError> {
    let redirect_uri = config.redirect_uri();
    let params = [
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("code", code),
        ("grant_type", "authorization_code"),
        ("redirect_uri", redirect_uri.as_str()),
    ];

    let body: serde_json::Value = Client::new()
        .post(&config.token_url)
        .form(&params)
        .send()
        .await?
        .json()
        .await?;

    parse_token_response(&body, None).map_err(OAuthError::TokenExchangeFailed)
}

/// Refresh an access token using a refresh token.
pub async fn refresh_token(config: &OAuthConfig, refresh: &str) -> Result<OAuthTokens, OAuthError> {
    let params = [
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("refresh_token", refresh),
        ("grant_type", "refresh_token"),
    ];

    let body: serde_json::Value = Client::new()
        .post(&config.token_url)
        .form(&params)
        .send()
        .await
        .map_err(|e| OAuthError::TokenRefreshFailed(e.to_string()))?
        .json()
        .await
        .map_err(|e| OAuthError::TokenRefreshFailed(e.to_string()))?;

    let tokens =
        parse_token_response(&body, Some(refresh)).map_err(OAuthError::TokenRefreshFailed)?;
    store_tokens(&config.service_name, &tokens)?;
    Ok(tokens)
}

fn store_tokens(service_name: &str, tokens: &OAuthTokens) -> Result<(), OAuthError> {
    let tokens_json =
        serde_json::to_string(tokens).map_err(|e| OAuthError::Keyring(e.to_string()))?;
    keyring_store::set(service_name, &tokens_json)
}

/// Load stored tokens from keyring.
pub fn load_tokens(service_name: &str) -> Option<OAuthTokens> {
    keyring_store::get(service_name)
        .ok()
        .flatten()
        .and_then(|json| serde_json::from_str(&json).ok())
}

/// Check if stored tokens are expired (with 60s buffer).
pub fn is_expired(tokens: &OAuthTokens) -> bool {
    is_expired_at(tokens, chrono::Utc::now().timestamp())
}

fn is_expired_at(tokens: &OAuthTokens, now: i64) -> bool {
    match tokens.expires_at {
        Some(exp) => now > exp - EXPIRY_BUFFER_SECS,
        None => false,
    }
}

fn extract_code(request: &str) -> Option<String> {
    let first_line = request.lines().next()?;
    let path = first_line.split_whitespace().nth(1)?;
    let url = url::Url::parse(&format!("http://localhost{path}")).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.to_string())
}
