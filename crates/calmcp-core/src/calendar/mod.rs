//! Calendar data model and provider access.
//!
//! Events are read from Google Calendar v3 and decoded into immutable
//! snapshots that the conflict engine compares.

pub mod client;
pub mod codec;
pub mod event;

#[cfg(test)]
mod client_tests;

pub use client::{CalendarSource, EventQuery, GoogleCalendarClient, GOOGLE_CALENDAR_API, MAX_RESULTS};
pub use codec::{BusySlot, CalendarAvailability};
pub use event::{Attendee, Event, EventStatus, EventTime, ResponseStatus, TimeRange};
