//! Check-then-create for a new calendar event.
//!
//! Listing calendars is bounded by the scan timeout. Calendars not read in
//! time are skipped, while findings from the others still count. A slightly
//! longer outer timeout covers the whole scan; when it runs out the event is
//! written as if nothing had been found.

use std::sync::Arc;
use std::time::Duration;

use crate::calendar::{Attendee, CalendarSource, Event, EventTime};
use crate::conflict::{
    format_conflict_warnings, format_event_detail, BlockExplanation, BlockingPolicy,
    ConflictCheckResult, ConflictDetectionOptions, ConflictOrchestrator, ScanStage, Warnings,
    WriteDecision,
};
use crate::error::{CoreError, ValidationError};
use crate::integrations::oauth::AccessToken;
use crate::storage::Config;

const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);

/// Extra time the outer timeout allows after the fetch deadline.
const SCAN_GRACE: Duration = Duration::from_millis(500);

/// Everything needed to create one event.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateEventRequest {
    pub calendar_id: String,
    pub title: String,
    pub time: Option<EventTime>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub attendees: Vec<String>,
    pub options: ConflictDetectionOptions,
    /// Overrides of the workflow's blocking policy.
    pub block_on_high_similarity: Option<bool>,
    pub block_threshold: Option<f64>,
}

impl CreateEventRequest {
    pub fn new(calendar_id: impl Into<String>, title: impl Into<String>, time: EventTime) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            title: title.into(),
            time: Some(time),
            description: None,
            location: None,
            attendees: Vec::new(),
            options: ConflictDetectionOptions::default(),
            block_on_high_similarity: None,
            block_threshold: None,
        }
    }

    /// The event as it would be written.
    pub fn candidate(&self) -> Event {
        Event {
            id: None,
            title: self.title.clone(),
            description: self.description.clone(),
            location: self.location.clone(),
            time: self.time.clone(),
            attendees: self.attendees.iter().map(Attendee::new).collect(),
            status: Default::default(),
            html_link: None,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "title".into(),
                message: "title is empty".into(),
            });
        }
        match &self.time {
            None => Err(ValidationError::InvalidValue {
                field: "time".into(),
                message: "start and end are required".into(),
            }),
            Some(EventTime::Timed { start, end, .. }) if end <= start => {
                Err(ValidationError::InvalidTimeRange {
                    start: *start,
                    end: *end,
                })
            }
            Some(EventTime::AllDay {
                start_date,
                end_date_exclusive,
            }) if end_date_exclusive <= start_date => Err(ValidationError::InvalidValue {
                field: "end_date".into(),
                message: format!("{end_date_exclusive} must be after {start_date}"),
            }),
            Some(_) => Ok(()),
        }?;
        if let Some(threshold) = self.block_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ValidationError::InvalidValue {
                    field: "block_threshold".into(),
                    message: format!("{threshold} is outside 0..=1"),
                });
            }
        }
        Ok(())
    }

    fn policy(&self, base: BlockingPolicy) -> BlockingPolicy {
        BlockingPolicy {
            block_on_high_similarity: self
                .block_on_high_similarity
                .unwrap_or(base.block_on_high_similarity),
            block_threshold: self.block_threshold.unwrap_or(base.block_threshold),
        }
    }
}

/// Result of a create request.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateEventOutcome {
    Created {
        event: Event,
        warnings: Option<Warnings>,
        /// Scan findings as rendered for the caller, including skipped calendars.
        scan: ConflictCheckResult,
        text: String,
    },
    Blocked {
        explanation: BlockExplanation,
        text: String,
    },
}

impl CreateEventOutcome {
    pub fn text(&self) -> &str {
        match self {
            CreateEventOutcome::Created { text, .. } | CreateEventOutcome::Blocked { text, .. } => {
                text
            }
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, CreateEventOutcome::Created { .. })
    }
}

/// Scan, classify, then insert.
#[derive(Clone)]
pub struct CreateEventWorkflow {
    source: Arc<dyn CalendarSource>,
    orchestrator: ConflictOrchestrator,
    policy: BlockingPolicy,
    scan_timeout: Duration,
}

impl CreateEventWorkflow {
    pub fn new(source: Arc<dyn CalendarSource>) -> Self {
        Self {
            orchestrator: ConflictOrchestrator::new(Arc::clone(&source))
                .with_fetch_timeout(DEFAULT_SCAN_TIMEOUT),
            source,
            policy: BlockingPolicy::default(),
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
        }
    }

    /// Policy, timeout and fetch concurrency taken from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` does not validate.
    pub fn from_config(
        source: Arc<dyn CalendarSource>,
        config: &Config,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self::new(source)
            .with_policy(config.blocking_policy())
            .with_scan_timeout(config.scan_timeout())?
            .with_fetch_concurrency(config.conflicts.fetch_concurrency))
    }

    pub fn with_policy(mut self, policy: BlockingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// # Errors
    ///
    /// A zero timeout would expire every scan, so it is rejected.
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Result<Self, ValidationError> {
        if timeout.is_zero() {
            return Err(ValidationError::InvalidValue {
                field: "scan_timeout".into(),
                message: "must be greater than zero".into(),
            });
        }
        self.scan_timeout = timeout;
        self.orchestrator = self.orchestrator.with_fetch_timeout(timeout);
        Ok(self)
    }

    pub fn with_fetch_concurrency(mut self, limit: usize) -> Self {
        self.orchestrator = self.orchestrator.with_fetch_concurrency(limit);
        self
    }

    pub fn orchestrator(&self) -> &ConflictOrchestrator {
        &self.orchestrator
    }

    /// Scan for `request` without writing anything.
    ///
    /// Calendars not read within the timeout are reported as skipped. A
    /// scan that overruns the outer timeout yields an empty result.
    pub async fn scan(
        &self,
        auth: &AccessToken,
        request: &CreateEventRequest,
    ) -> Result<ConflictCheckResult, ValidationError> {
        let candidate = request.candidate();
        let scan = self.orchestrator.check_conflicts(
            auth,
            &candidate,
            &request.calendar_id,
            &request.options,
        );
        match tokio::time::timeout(self.scan_timeout + SCAN_GRACE, scan).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.scan_timeout.as_secs_f64(),
                    "conflict scan timed out, proceeding without it"
                );
                Ok(ConflictCheckResult::empty())
            }
        }
    }

    /// Create the event unless a near-certain duplicate blocks it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for a malformed request and
    /// [`CoreError::Calendar`] when the insert fails.
    pub async fn create(
        &self,
        auth: &AccessToken,
        request: &CreateEventRequest,
    ) -> Result<CreateEventOutcome, CoreError> {
        request.validate()?;
        let result = self.scan(auth, request).await?;

        tracing::debug!(
            stage = ?ScanStage::Classify,
            duplicates = result.duplicates.len(),
            conflicts = result.conflicts.len()
        );
        let decision = request.policy(self.policy).classify(&result);
        tracing::debug!(stage = ?decision.stage());

        let warnings = match decision {
            WriteDecision::Block(explanation) => {
                tracing::info!(
                    calendar = %request.calendar_id,
                    existing = ?explanation.duplicate.event_id,
                    "refused to create duplicate event"
                );
                let text = explanation.message();
                return Ok(CreateEventOutcome::Blocked { explanation, text });
            }
            WriteDecision::ProceedWithWarnings(warnings) => Some(warnings),
            WriteDecision::ProceedClean => None,
        };

        let created = self
            .source
            .insert_event(auth, &request.calendar_id, &request.candidate())
            .await?;
        tracing::info!(
            calendar = %request.calendar_id,
            id = ?created.id,
            "created event"
        );

        let text = created_text(&created, &result);
        Ok(CreateEventOutcome::Created {
            event: created,
            warnings,
            scan: result,
            text,
        })
    }
}

fn created_text(event: &Event, result: &ConflictCheckResult) -> String {
    let mut text = format!("Event created successfully!\n\n{}", format_event_detail(event));
    let findings = format_conflict_warnings(result);
    if !findings.is_empty() {
        text.push('\n');
        text.push_str(&findings);
    }
    text
}
