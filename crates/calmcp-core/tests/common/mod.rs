//! In-memory calendar provider shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use calmcp_core::calendar::{CalendarAvailability, EventQuery};
use calmcp_core::{AccessToken, CalendarError, CalendarSource, Event};

/// How a fake calendar refuses to be read.
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Denied,
    Missing,
    Throttled,
}

impl Failure {
    fn to_error(self, calendar_id: &str) -> CalendarError {
        match self {
            Failure::Denied => CalendarError::PermissionDenied {
                calendar_id: calendar_id.to_string(),
            },
            Failure::Missing => CalendarError::NotFound {
                calendar_id: calendar_id.to_string(),
            },
            Failure::Throttled => CalendarError::RateLimited,
        }
    }
}

#[derive(Default)]
pub struct FakeCalendar {
    events: HashMap<String, Vec<Event>>,
    failures: HashMap<String, Failure>,
    delays: HashMap<String, Duration>,
    free_busy: Option<HashMap<String, CalendarAvailability>>,
    queries: Mutex<Vec<(String, EventQuery)>>,
    inserted: Mutex<Vec<(String, Event)>>,
    list_calls: AtomicUsize,
}

impl FakeCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(mut self, calendar_id: &str, events: Vec<Event>) -> Self {
        self.events.insert(calendar_id.to_string(), events);
        self
    }

    pub fn with_failure(mut self, calendar_id: &str, failure: Failure) -> Self {
        self.failures.insert(calendar_id.to_string(), failure);
        self
    }

    pub fn with_delay(mut self, calendar_id: &str, delay: Duration) -> Self {
        self.delays.insert(calendar_id.to_string(), delay);
        self
    }

    pub fn with_free_busy(mut self, availability: HashMap<String, CalendarAvailability>) -> Self {
        self.free_busy = Some(availability);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<(String, EventQuery)> {
        self.queries.lock().unwrap().clone()
    }

    pub fn inserted(&self) -> Vec<(String, Event)> {
        self.inserted.lock().unwrap().clone()
    }
}

#[async_trait]
impl CalendarSource for FakeCalendar {
    async fn list_events(
        &self,
        _auth: &AccessToken,
        calendar_id: &str,
        query: &EventQuery,
    ) -> Result<Vec<Event>, CalendarError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.queries
            .lock()
            .unwrap()
            .push((calendar_id.to_string(), query.clone()));

        if let Some(delay) = self.delays.get(calendar_id) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(failure) = self.failures.get(calendar_id) {
            return Err(failure.to_error(calendar_id));
        }
        Ok(self.events.get(calendar_id).cloned().unwrap_or_default())
    }

    async fn query_free_busy(
        &self,
        _auth: &AccessToken,
        _time_min: DateTime<Utc>,
        _time_max: DateTime<Utc>,
        _calendar_ids: &[String],
    ) -> Result<HashMap<String, CalendarAvailability>, CalendarError> {
        self.free_busy.clone().ok_or(CalendarError::Api {
            status: 500,
            message: "Backend Error".into(),
        })
    }

    async fn insert_event(
        &self,
        _auth: &AccessToken,
        calendar_id: &str,
        event: &Event,
    ) -> Result<Event, CalendarError> {
        let mut inserted = self.inserted.lock().unwrap();
        let created = event
            .clone()
            .with_id(format!("created-{}", inserted.len()))
            .with_link(format!("https://calendar.google.com/event?eid=created-{}", inserted.len()));
        inserted.push((calendar_id.to_string(), created.clone()));
        Ok(created)
    }
}

pub fn token() -> AccessToken {
    AccessToken::new("integration-token")
}

/// 2025-03-14 at `h:m` UTC.
pub fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, h, m, 0).unwrap()
}
