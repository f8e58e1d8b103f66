pub mod auth;
pub mod check;
pub mod config;
pub mod create;
pub mod event_args;

use std::sync::Arc;

use calmcp_core::{AccessToken, CalendarSource, Config, GoogleAuth, GoogleCalendarClient};

/// Google client pointed at the configured API root.
pub fn calendar_source(config: &Config) -> Arc<dyn CalendarSource> {
    Arc::new(GoogleCalendarClient::with_base_url(
        config.google.api_base_url.clone(),
    ))
}

/// Access token for the stored Google account, refreshed when needed.
pub async fn access_token() -> Result<AccessToken, Box<dyn std::error::Error>> {
    let auth = GoogleAuth::new();
    Ok(auth.access_token().await?)
}
