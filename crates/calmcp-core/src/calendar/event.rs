//! Calendar event snapshot and its derived time range.
//!
//! An [`Event`] is an immutable snapshot of a calendar entry for the
//! duration of a scan. Its time is a tagged union so timed and all-day
//! entries never have to be told apart by which optional field is set.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Confirmed,
    Tentative,
    Cancelled,
}

/// An attendee's answer to an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseStatus {
    #[default]
    NeedsAction,
    Declined,
    Tentative,
    Accepted,
}

impl ResponseStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ResponseStatus::NeedsAction => "awaiting response",
            ResponseStatus::Declined => "declined",
            ResponseStatus::Tentative => "tentative",
            ResponseStatus::Accepted => "accepted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendee {
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub response_status: ResponseStatus,
    /// Set when this attendee is the account the calendar was read with.
    #[serde(default)]
    pub is_self: bool,
    #[serde(default)]
    pub optional: bool,
}

impl Attendee {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: None,
            response_status: ResponseStatus::NeedsAction,
            is_self: false,
            optional: false,
        }
    }
}

/// When an event happens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventTime {
    /// A pair of instants, with the IANA zone the event was authored in.
    Timed {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        #[serde(default)]
        timezone: Option<String>,
    },
    /// Whole days; `end_date_exclusive` is the first day NOT covered.
    AllDay {
        start_date: NaiveDate,
        end_date_exclusive: NaiveDate,
    },
}

impl EventTime {
    pub fn is_all_day(&self) -> bool {
        matches!(self, EventTime::AllDay { .. })
    }

    /// Resolve to instants. All-day dates are anchored at UTC midnight.
    pub fn range(&self) -> Option<TimeRange> {
        match self {
            EventTime::Timed { start, end, .. } => Some(TimeRange {
                start: *start,
                end: *end,
                is_all_day: false,
            }),
            EventTime::AllDay {
                start_date,
                end_date_exclusive,
            } => Some(TimeRange {
                start: start_date.and_hms_opt(0, 0, 0)?.and_utc(),
                end: end_date_exclusive.and_hms_opt(0, 0, 0)?.and_utc(),
                is_all_day: true,
            }),
        }
    }

    /// Last day covered by an all-day event, for display.
    pub fn last_day_inclusive(&self) -> Option<NaiveDate> {
        match self {
            EventTime::AllDay {
                start_date,
                end_date_exclusive,
            } => Some(
                end_date_exclusive
                    .pred_opt()
                    .filter(|d| d >= start_date)
                    .unwrap_or(*start_date),
            ),
            EventTime::Timed { .. } => None,
        }
    }
}

/// Resolved start/end instants of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_all_day: bool,
}

impl TimeRange {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Strict overlap: ranges that only touch at an endpoint do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.overlaps_interval(other.start, other.end)
    }

    pub fn overlaps_interval(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && start < self.end
    }
}

/// A calendar event snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Provider identity; `None` for an event not yet written.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// `None` when either bound could not be resolved.
    #[serde(default)]
    pub time: Option<EventTime>,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub html_link: Option<String>,
}

impl Event {
    fn with_time(title: impl Into<String>, time: Option<EventTime>) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: None,
            location: None,
            time,
            attendees: Vec::new(),
            status: EventStatus::Confirmed,
            html_link: None,
        }
    }

    pub fn timed(title: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self::with_time(
            title,
            Some(EventTime::Timed {
                start,
                end,
                timezone: None,
            }),
        )
    }

    pub fn all_day(
        title: impl Into<String>,
        start_date: NaiveDate,
        end_date_exclusive: NaiveDate,
    ) -> Self {
        Self::with_time(
            title,
            Some(EventTime::AllDay {
                start_date,
                end_date_exclusive,
            }),
        )
    }

    /// An event whose time could not be resolved.
    pub fn untimed(title: impl Into<String>) -> Self {
        Self::with_time(title, None)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_attendee(mut self, attendee: Attendee) -> Self {
        self.attendees.push(attendee);
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.html_link = Some(link.into());
        self
    }

    pub fn with_timezone(mut self, tz: impl Into<String>) -> Self {
        if let Some(EventTime::Timed { timezone, .. }) = &mut self.time {
            *timezone = Some(tz.into());
        }
        self
    }

    pub fn time_range(&self) -> Option<TimeRange> {
        self.time.as_ref().and_then(EventTime::range)
    }

    pub fn is_all_day(&self) -> bool {
        self.time.as_ref().is_some_and(EventTime::is_all_day)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == EventStatus::Cancelled
    }

    /// Both events carry an id and the ids match.
    pub fn same_identity(&self, other: &Event) -> bool {
        matches!((&self.id, &other.id), (Some(a), Some(b)) if a == b)
    }

    /// The reading account is an attendee and has declined.
    pub fn is_declined_by_self(&self) -> bool {
        self.attendees
            .iter()
            .any(|a| a.is_self && a.response_status == ResponseStatus::Declined)
    }

    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "(No title)"
        } else {
            &self.title
        }
    }
}
