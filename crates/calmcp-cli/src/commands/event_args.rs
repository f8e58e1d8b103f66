//! Event flags shared by `check` and `create`.

use chrono::{DateTime, Days, NaiveDate, Utc};
use clap::Args;

use calmcp_core::{Config, ConflictDetectionOptions, EventTime};
use calmcp_core::workflow::CreateEventRequest;

#[derive(Args, Debug, Clone)]
pub struct EventArgs {
    /// Event title
    #[arg(long)]
    pub title: String,
    /// Start: RFC 3339 timestamp, or YYYY-MM-DD with --all-day
    #[arg(long)]
    pub start: String,
    /// End: RFC 3339 timestamp, or exclusive YYYY-MM-DD with --all-day
    #[arg(long)]
    pub end: Option<String>,
    /// Treat --start/--end as dates
    #[arg(long)]
    pub all_day: bool,
    /// IANA time zone the event is authored in
    #[arg(long)]
    pub timezone: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    /// Calendar to check (repeatable). The first one is the target calendar.
    #[arg(long = "calendar")]
    pub calendars: Vec<String>,
    /// Minimum similarity reported as a duplicate (0-1)
    #[arg(long)]
    pub threshold: Option<f64>,
    /// Count events you declined as conflicts
    #[arg(long)]
    pub include_declined: bool,
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp '{raw}': {e}"))
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| format!("invalid date '{raw}': {e}"))
}

impl EventArgs {
    /// Resolve the time flags. A timed event without `--end` has no time.
    pub fn event_time(&self) -> Result<Option<EventTime>, String> {
        if self.all_day {
            let start_date = parse_date(&self.start)?;
            let end_date_exclusive = match &self.end {
                Some(end) => parse_date(end)?,
                None => start_date
                    .checked_add_days(Days::new(1))
                    .ok_or_else(|| format!("no day after {start_date}"))?,
            };
            return Ok(Some(EventTime::AllDay {
                start_date,
                end_date_exclusive,
            }));
        }

        let start = parse_instant(&self.start)?;
        let Some(end) = &self.end else {
            return Ok(None);
        };
        Ok(Some(EventTime::Timed {
            start,
            end: parse_instant(end)?,
            timezone: self.timezone.clone(),
        }))
    }

    /// Target calendar: first `--calendar`, else the configured default.
    pub fn target_calendar(&self, config: &Config) -> String {
        self.calendars
            .first()
            .cloned()
            .unwrap_or_else(|| config.google.default_calendar.clone())
    }

    /// Configured scan options with command-line overrides applied.
    pub fn detection_options(&self, config: &Config) -> ConflictDetectionOptions {
        let mut options = config.detection_options();
        if !self.calendars.is_empty() {
            options.calendars_to_check = self.calendars.clone();
        }
        if let Some(threshold) = self.threshold {
            options.duplicate_similarity_threshold = threshold;
        }
        if self.include_declined {
            options.include_declined_events = true;
        }
        options
    }

    pub fn request(&self, config: &Config) -> Result<CreateEventRequest, String> {
        Ok(CreateEventRequest {
            calendar_id: self.target_calendar(config),
            title: self.title.clone(),
            time: self.event_time()?,
            description: None,
            location: self.location.clone(),
            attendees: Vec::new(),
            options: self.detection_options(config),
            block_on_high_similarity: None,
            block_threshold: None,
        })
    }
}
