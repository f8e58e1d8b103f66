//! # calmcp Core Library
//!
//! Calendar event creation guarded by duplicate and conflict detection.
//! All operations are available through the `calmcp` CLI, which is a thin
//! layer over this crate.
//!
//! ## Architecture
//!
//! - **Calendar**: Event snapshot model and the Google Calendar v3 client,
//!   behind the [`CalendarSource`] trait
//! - **Conflict**: Similarity scoring, overlap analysis, multi-calendar scan
//!   and the blocking policy
//! - **Workflow**: Check-then-create for a new event
//! - **Integrations**: Google OAuth and OS keyring token storage
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`ConflictOrchestrator`]: Scans calendars for a candidate event
//! - [`BlockingPolicy`]: Decides whether a write goes ahead
//! - [`CreateEventWorkflow`]: Scan, classify, then insert
//! - [`Config`]: Application configuration management

pub mod calendar;
pub mod conflict;
pub mod error;
pub mod integrations;
pub mod storage;
pub mod workflow;

pub use calendar::{
    Attendee, CalendarSource, Event, EventQuery, EventStatus, EventTime, GoogleCalendarClient,
    ResponseStatus, TimeRange,
};
pub use conflict::{
    BlockingPolicy, ConflictCheckResult, ConflictDetectionOptions, ConflictInfo,
    ConflictOrchestrator, DuplicateInfo, OverlapAnalyzer, SimilarityScorer, SkippedCalendar,
    Warnings, WriteDecision,
};
pub use error::{CalendarError, ConfigError, CoreError, OAuthError, ValidationError};
pub use integrations::{AccessToken, GoogleAuth};
pub use storage::Config;
pub use workflow::{CreateEventOutcome, CreateEventRequest, CreateEventWorkflow};
