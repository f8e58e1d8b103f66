//! Core error types for calmcp-core.
//!
//! This module defines the error hierarchy using thiserror. Conflict scans
//! recover from most of these locally; only [`ValidationError`] escapes
//! a scan.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for calmcp-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// OAuth-related errors
    #[error("OAuth error: {0}")]
    OAuth(#[from] OAuthError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Calendar API errors
    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of a single calendar API call.
#[derive(Error, Debug)]
pub enum CalendarError {
    /// Caller may not read or write this calendar
    #[error("Access to calendar '{calendar_id}' denied")]
    PermissionDenied { calendar_id: String },

    /// Calendar or event does not exist
    #[error("Calendar '{calendar_id}' not found")]
    NotFound { calendar_id: String },

    /// Quota or rate limit exceeded
    #[error("Rate limited by calendar API")]
    RateLimited,

    /// Any other non-success response
    #[error("Calendar API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Transport failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("Failed to decode calendar response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Home or data directory unavailable
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// OAuth-specific errors.
#[derive(Error, Debug)]
pub enum OAuthError {
    /// Authorization failed
    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    /// Token exchange failed
    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    /// Token refresh failed
    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    /// Invalid callback
    #[error("Invalid OAuth callback: {0}")]
    InvalidCallback(String),

    /// Access token expired
    #[error("Access token expired and no refresh token available")]
    TokenExpired,

    /// Not authenticated
    #[error("Not authenticated with {service}")]
    NotAuthenticated { service: String },

    /// Credentials not configured
    #[error("OAuth credentials not configured for {service}")]
    CredentialsNotConfigured { service: String },

    /// OS keyring failure
    #[error("Keyring error: {0}")]
    Keyring(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid time range
    #[error("Invalid time range: end ({end}) must be after start ({start})")]
    InvalidTimeRange {
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<keyring::Error> for OAuthError {
    fn from(err: keyring::Error) -> Self {
        OAuthError::Keyring(err.to_string())
    }
}

impl From<reqwest::Error> for OAuthError {
    fn from(err: reqwest::Error) -> Self {
        OAuthError::TokenExchangeFailed(err.to_string())
    }
}
