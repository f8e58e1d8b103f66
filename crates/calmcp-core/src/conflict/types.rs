//! Options and result records of a conflict scan.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::Event;
use crate::error::ValidationError;

/// Similarity at or above which an existing event is reported as a duplicate.
pub const DEFAULT_DUPLICATE_THRESHOLD: f64 = 0.7;

/// Similarity above which the create workflow refuses the write.
pub const DEFAULT_BLOCK_THRESHOLD: f64 = 0.9;

/// Similarity above which a duplicate is described as exact.
pub const EXACT_DUPLICATE_THRESHOLD: f64 = 0.9;

/// What a scan should look for and where.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictDetectionOptions {
    pub check_duplicates: bool,
    pub check_conflicts: bool,
    /// Empty means the primary calendar of the request.
    pub calendars_to_check: Vec<String>,
    pub duplicate_similarity_threshold: f64,
    pub include_declined_events: bool,
}

impl Default for ConflictDetectionOptions {
    fn default() -> Self {
        Self {
            check_duplicates: true,
            check_conflicts: true,
            calendars_to_check: Vec::new(),
            duplicate_similarity_threshold: DEFAULT_DUPLICATE_THRESHOLD,
            include_declined_events: false,
        }
    }
}

impl ConflictDetectionOptions {
    /// Resolve defaults against the request's calendar.
    ///
    /// Calendar ids are de-duplicated keeping first-seen order.
    pub fn resolve(&self, primary_calendar_id: &str) -> Result<ScanPlan, ValidationError> {
        let threshold = self.duplicate_similarity_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ValidationError::InvalidValue {
                field: "duplicate_similarity_threshold".into(),
                message: format!("{threshold} is outside 0..=1"),
            });
        }

        let requested: Vec<&str> = if self.calendars_to_check.is_empty() {
            vec![primary_calendar_id]
        } else {
            self.calendars_to_check.iter().map(String::as_str).collect()
        };

        let mut calendars: Vec<String> = Vec::with_capacity(requested.len());
        for id in requested {
            let id = id.trim();
            if id.is_empty() {
                return Err(ValidationError::InvalidValue {
                    field: "calendars_to_check".into(),
                    message: "calendar id is empty".into(),
                });
            }
            if !calendars.iter().any(|c| c == id) {
                calendars.push(id.to_string());
            }
        }

        Ok(ScanPlan {
            calendars,
            check_duplicates: self.check_duplicates,
            check_conflicts: self.check_conflicts,
            duplicate_threshold: threshold,
            include_declined_events: self.include_declined_events,
        })
    }
}

/// Options after defaulting; what a scan actually executes.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPlan {
    pub calendars: Vec<String>,
    pub check_duplicates: bool,
    pub check_conflicts: bool,
    pub duplicate_threshold: f64,
    pub include_declined_events: bool,
}

/// Stages a create request moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStage {
    ValidateTiming,
    Fetch,
    Score,
    Classify,
    Block,
    ProceedWithWarnings,
    ProceedClean,
}

/// An existing event that probably represents the same appointment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateInfo {
    pub event_id: Option<String>,
    pub title: String,
    pub link: Option<String>,
    /// Rounded to two decimals.
    pub similarity: f64,
    pub full_event: Event,
    pub calendar_id: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    Overlap,
}

/// How much two time ranges share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapDetail {
    /// Human-readable, e.g. "1 hour 30 minutes".
    pub duration: String,
    /// 0-100, relative to the candidate event.
    pub percentage: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// An existing event or busy block overlapping the candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictInfo {
    pub kind: ConflictKind,
    pub calendar_id: String,
    pub event_id: Option<String>,
    pub title: String,
    pub link: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Absent for entries derived from free/busy data.
    pub full_event: Option<Event>,
    pub overlap: Option<OverlapDetail>,
}

/// A calendar the scan could not read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedCalendar {
    pub calendar_id: String,
    pub reason: String,
}

/// Outcome of one scan. Built per request, never cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictCheckResult {
    pub has_conflicts: bool,
    pub duplicates: Vec<DuplicateInfo>,
    pub conflicts: Vec<ConflictInfo>,
    #[serde(default)]
    pub skipped_calendars: Vec<SkippedCalendar>,
}

impl ConflictCheckResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn finish(
        duplicates: Vec<DuplicateInfo>,
        conflicts: Vec<ConflictInfo>,
        skipped_calendars: Vec<SkippedCalendar>,
    ) -> Self {
        Self {
            has_conflicts: !duplicates.is_empty() || !conflicts.is_empty(),
            duplicates,
            conflicts,
            skipped_calendars,
        }
    }
}
