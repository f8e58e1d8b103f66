//! Calendar provider seam and the Google Calendar v3 implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};

use super::codec::{
    self, CalendarAvailability, GoogleEvent, GoogleEventList, GoogleFreeBusyResponse,
};
use super::event::Event;
use crate::error::CalendarError;
use crate::integrations::oauth::AccessToken;

pub const GOOGLE_CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";

/// Largest page the conflict scan asks for.
pub const MAX_RESULTS: u32 = 250;

/// Parameters of an event listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub time_min: DateTime<Utc>,
    pub time_max: DateTime<Utc>,
    /// Expand recurring events into their instances.
    pub single_events: bool,
    pub max_results: u32,
    pub order_by_start: bool,
}

impl EventQuery {
    pub fn window(time_min: DateTime<Utc>, time_max: DateTime<Utc>) -> Self {
        Self {
            time_min,
            time_max,
            single_events: true,
            max_results: MAX_RESULTS,
            order_by_start: true,
        }
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("timeMin", self.time_min.to_rfc3339()),
            ("timeMax", self.time_max.to_rfc3339()),
            ("singleEvents", self.single_events.to_string()),
            ("maxResults", self.max_results.to_string()),
        ];
        // Google rejects orderBy=startTime unless singleEvents is set.
        if self.order_by_start && self.single_events {
            params.push(("orderBy", "startTime".to_string()));
        }
        params
    }
}

/// Everything the conflict engine and the create workflow need from a
/// calendar provider.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    /// List events of one calendar inside the query window.
    async fn list_events(
        &self,
        auth: &AccessToken,
        calendar_id: &str,
        query: &EventQuery,
    ) -> Result<Vec<Event>, CalendarError>;

    /// Aggregated busy intervals for several calendars.
    async fn query_free_busy(
        &self,
        auth: &AccessToken,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        calendar_ids: &[String],
    ) -> Result<HashMap<String, CalendarAvailability>, CalendarError>;

    /// Write a new event and return the stored snapshot.
    async fn insert_event(
        &self,
        auth: &AccessToken,
        calendar_id: &str,
        event: &Event,
    ) -> Result<Event, CalendarError>;
}

/// Google Calendar REST client.
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http: Client,
    base_url: String,
}

impl GoogleCalendarClient {
    pub fn new() -> Self {
        Self::with_base_url(GOOGLE_CALENDAR_API)
    }

    /// Point the client at another API root (used for testing).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        )
    }

    /// Map a non-success response onto the error taxonomy.
    async fn check_status(resp: Response, calendar_id: &str) -> Result<Response, CalendarError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(String::from))
            .unwrap_or(body);

        Err(match status {
            StatusCode::TOO_MANY_REQUESTS => CalendarError::RateLimited,
            StatusCode::FORBIDDEN if message.to_lowercase().contains("rate limit") => {
                CalendarError::RateLimited
            }
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => CalendarError::PermissionDenied {
                calendar_id: calendar_id.to_string(),
            },
            StatusCode::NOT_FOUND => CalendarError::NotFound {
                calendar_id: calendar_id.to_string(),
            },
            other => CalendarError::Api {
                status: other.as_u16(),
                message,
            },
        })
    }
}

impl Default for GoogleCalendarClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CalendarSource for GoogleCalendarClient {
    async fn list_events(
        &self,
        auth: &AccessToken,
        calendar_id: &str,
        query: &EventQuery,
    ) -> Result<Vec<Event>, CalendarError> {
        let resp = self
            .http
            .get(self.events_url(calendar_id))
            .bearer_auth(auth.secret())
            .query(&query.params())
            .send()
            .await?;
        let resp = Self::check_status(resp, calendar_id).await?;

        let body = resp.text().await?;
        let list: GoogleEventList = serde_json::from_str(&body)?;
        Ok(list.items.into_iter().map(codec::decode_event).collect())
    }

    async fn query_free_busy(
        &self,
        auth: &AccessToken,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        calendar_ids: &[String],
    ) -> Result<HashMap<String, CalendarAvailability>, CalendarError> {
        let body = codec::encode_free_busy_request(time_min, time_max, calendar_ids);
        let resp = self
            .http
            .post(format!("{}/freeBusy", self.base_url))
            .bearer_auth(auth.secret())
            .json(&body)
            .send()
            .await?;
        let resp = Self::check_status(resp, &calendar_ids.join(",")).await?;

        let body = resp.text().await?;
        let raw: GoogleFreeBusyResponse = serde_json::from_str(&body)?;
        Ok(codec::decode_free_busy(raw))
    }

    async fn insert_event(
        &self,
        auth: &AccessToken,
        calendar_id: &str,
        event: &Event,
    ) -> Result<Event, CalendarError> {
        let resp = self
            .http
            .post(self.events_url(calendar_id))
            .bearer_auth(auth.secret())
            .json(&codec::encode_event(event))
            .send()
            .await?;
        let resp = Self::check_status(resp, calendar_id).await?;

        let body = resp.text().await?;
        let created: GoogleEvent = serde_json::from_str(&body)?;
        Ok(codec::decode_event(created))
    }
}
