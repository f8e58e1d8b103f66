//! Encoding/decoding between Google Calendar v3 JSON and domain types.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::event::{Attendee, Event, EventStatus, EventTime, ResponseStatus};

// ============================================================================
// Events
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEventTime {
    pub date_time: Option<String>,
    pub date: Option<String>,
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAttendee {
    pub email: Option<String>,
    pub display_name: Option<String>,
    #[serde(default)]
    pub response_status: ResponseStatus,
    #[serde(default, rename = "self")]
    pub is_self: bool,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEvent {
    pub id: Option<String>,
    pub status: Option<EventStatus>,
    pub html_link: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<GoogleEventTime>,
    pub end: Option<GoogleEventTime>,
    #[serde(default)]
    pub attendees: Vec<GoogleAttendee>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleEventList {
    #[serde(default)]
    pub items: Vec<GoogleEvent>,
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Resolve a start/end pair. Mixed date/dateTime pairs are unresolvable.
fn decode_time(start: &GoogleEventTime, end: &GoogleEventTime) -> Option<EventTime> {
    match (&start.date_time, &end.date_time, &start.date, &end.date) {
        (Some(s), Some(e), _, _) => Some(EventTime::Timed {
            start: parse_instant(s)?,
            end: parse_instant(e)?,
            timezone: start.time_zone.clone().or_else(|| end.time_zone.clone()),
        }),
        (None, None, Some(s), Some(e)) => Some(EventTime::AllDay {
            start_date: parse_date(s)?,
            end_date_exclusive: parse_date(e)?,
        }),
        _ => None,
    }
}

/// Convert a Google event into the domain snapshot.
pub fn decode_event(raw: GoogleEvent) -> Event {
    let time = match (&raw.start, &raw.end) {
        (Some(start), Some(end)) => decode_time(start, end),
        _ => None,
    };

    let attendees = raw
        .attendees
        .into_iter()
        .filter_map(|a| {
            Some(Attendee {
                email: a.email?,
                display_name: a.display_name,
                response_status: a.response_status,
                is_self: a.is_self,
                optional: a.optional,
            })
        })
        .collect();

    Event {
        id: raw.id,
        title: raw.summary.unwrap_or_default(),
        description: raw.description,
        location: raw.location,
        time,
        attendees,
        status: raw.status.unwrap_or_default(),
        html_link: raw.html_link,
    }
}

/// Convert a domain event into a Google insert body.
pub fn encode_event(event: &Event) -> serde_json::Value {
    let mut body = json!({ "summary": event.title });

    if let Some(description) = &event.description {
        body["description"] = json!(description);
    }
    if let Some(location) = &event.location {
        body["location"] = json!(location);
    }

    match &event.time {
        Some(EventTime::Timed {
            start,
            end,
            timezone,
        }) => {
            body["start"] = json!({ "dateTime": start.to_rfc3339() });
            body["end"] = json!({ "dateTime": end.to_rfc3339() });
            if let Some(tz) = timezone {
                body["start"]["timeZone"] = json!(tz);
                body["end"]["timeZone"] = json!(tz);
            }
        }
        Some(EventTime::AllDay {
            start_date,
            end_date_exclusive,
        }) => {
            body["start"] = json!({ "date": start_date.format("%Y-%m-%d").to_string() });
            body["end"] = json!({ "date": end_date_exclusive.format("%Y-%m-%d").to_string() });
        }
        None => {}
    }

    if !event.attendees.is_empty() {
        body["attendees"] = event
            .attendees
            .iter()
            .map(|a| {
                let mut entry = json!({ "email": a.email });
                if let Some(name) = &a.display_name {
                    entry["displayName"] = json!(name);
                }
                if a.optional {
                    entry["optional"] = json!(true);
                }
                entry
            })
            .collect();
    }

    body
}

// ============================================================================
// Free/busy
// ============================================================================

/// One busy interval reported by the free/busy endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusySlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Busy intervals for one calendar, or the reasons it could not be read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarAvailability {
    pub busy: Vec<BusySlot>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GoogleFreeBusyError {
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct GoogleFreeBusyCalendar {
    #[serde(default)]
    busy: Vec<BusySlot>,
    #[serde(default)]
    errors: Vec<GoogleFreeBusyError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleFreeBusyResponse {
    #[serde(default)]
    calendars: HashMap<String, GoogleFreeBusyCalendar>,
}

/// Build the free/busy request body.
pub fn encode_free_busy_request(
    time_min: DateTime<Utc>,
    time_max: DateTime<Utc>,
    calendar_ids: &[String],
) -> serde_json::Value {
    json!({
        "timeMin": time_min.to_rfc3339(),
        "timeMax": time_max.to_rfc3339(),
        "items": calendar_ids.iter().map(|id| json!({ "id": id })).collect::<Vec<_>>(),
    })
}

pub fn decode_free_busy(raw: GoogleFreeBusyResponse) -> HashMap<String, CalendarAvailability> {
    raw.calendars
        .into_iter()
        .map(|(id, cal)| {
            let availability = CalendarAvailability {
                busy: cal.busy,
                errors: cal.errors.into_iter().map(|e| e.reason).collect(),
            };
            (id, availability)
        })
        .collect()
}
