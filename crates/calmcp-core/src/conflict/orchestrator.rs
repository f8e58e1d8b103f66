//! Multi-calendar conflict and duplicate scan.
//!
//! For each calendar the scan lists events in a window padded by one hour on
//! both sides of the candidate, then scores every event for similarity and
//! overlap. A calendar that cannot be read is skipped and recorded; the scan
//! itself only fails on malformed options.

use std::sync::Arc;

use chrono::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::calendar::{CalendarSource, Event, EventQuery};
use crate::error::ValidationError;
use crate::integrations::oauth::AccessToken;

use super::overlap::OverlapAnalyzer;
use super::similarity::SimilarityScorer;
use super::types::{
    ConflictCheckResult, ConflictDetectionOptions, ConflictInfo, ConflictKind, DuplicateInfo,
    OverlapDetail, ScanPlan, ScanStage, SkippedCalendar, EXACT_DUPLICATE_THRESHOLD,
};

/// Padding added on both sides of the candidate when listing events.
const SEARCH_PADDING_MINUTES: i64 = 60;

/// Placeholder identity for conflicts derived from free/busy data.
pub const BUSY_PLACEHOLDER_ID: &str = "busy-time";
pub const BUSY_PLACEHOLDER_TITLE: &str = "Busy (details unavailable)";

const EXACT_DUPLICATE_SUGGESTION: &str =
    "This appears to be a duplicate. Consider updating the existing event instead.";
const SIMILAR_EVENT_SUGGESTION: &str =
    "This event is very similar to an existing one. Is this intentional?";

const FETCH_TIMED_OUT: &str = "Timed out before the calendar could be read";

type FetchOutcome = Result<Vec<Event>, String>;

/// Runs conflict scans against a [`CalendarSource`].
#[derive(Clone)]
pub struct ConflictOrchestrator {
    source: Arc<dyn CalendarSource>,
    scorer: SimilarityScorer,
    analyzer: OverlapAnalyzer,
    fetch_concurrency: usize,
    fetch_timeout: Option<std::time::Duration>,
}

impl ConflictOrchestrator {
    /// Sequential fetches (one calendar at a time).
    pub fn new(source: Arc<dyn CalendarSource>) -> Self {
        Self {
            source,
            scorer: SimilarityScorer::new(),
            analyzer: OverlapAnalyzer::new(),
            fetch_concurrency: 1,
            fetch_timeout: None,
        }
    }

    /// Allow up to `limit` calendars to be listed at once.
    pub fn with_fetch_concurrency(mut self, limit: usize) -> Self {
        self.fetch_concurrency = limit.max(1);
        self
    }

    /// Budget for listing all calendars of one scan. Calendars not read in
    /// time are skipped; those already read are kept.
    pub fn with_fetch_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Scan the planned calendars for duplicates of and overlaps with
    /// `candidate`.
    ///
    /// A candidate without a resolvable time range yields an empty result
    /// and no calendar is queried.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for malformed options only. Calendar
    /// access failures are reported in
    /// [`ConflictCheckResult::skipped_calendars`].
    pub async fn check_conflicts(
        &self,
        auth: &AccessToken,
        candidate: &Event,
        primary_calendar_id: &str,
        options: &ConflictDetectionOptions,
    ) -> Result<ConflictCheckResult, ValidationError> {
        let plan = options.resolve(primary_calendar_id)?;

        tracing::debug!(stage = ?ScanStage::ValidateTiming, title = %candidate.title);
        let Some(range) = candidate.time_range() else {
            tracing::debug!("candidate has no resolvable time range, skipping scan");
            return Ok(ConflictCheckResult::empty());
        };

        let padding = Duration::minutes(SEARCH_PADDING_MINUTES);
        let query = EventQuery::window(range.start - padding, range.end + padding);

        tracing::debug!(stage = ?ScanStage::Fetch, calendars = plan.calendars.len());
        let fetched = self.fetch_all(auth, &plan.calendars, &query).await;

        tracing::debug!(stage = ?ScanStage::Score);
        let mut duplicates = Vec::new();
        let mut conflicts = Vec::new();
        let mut skipped = Vec::new();

        for (calendar_id, outcome) in fetched {
            match outcome {
                Ok(events) => {
                    duplicates.extend(self.find_duplicates(candidate, &events, &calendar_id, &plan));
                    conflicts.extend(self.find_conflicts(candidate, &events, &calendar_id, &plan));
                }
                Err(reason) => {
                    tracing::warn!(calendar = %calendar_id, %reason, "skipping calendar in conflict scan");
                    skipped.push(SkippedCalendar {
                        calendar_id,
                        reason,
                    });
                }
            }
        }

        Ok(ConflictCheckResult::finish(duplicates, conflicts, skipped))
    }

    /// List every planned calendar; results come back in plan order.
    async fn fetch_all(
        &self,
        auth: &AccessToken,
        calendars: &[String],
        query: &EventQuery,
    ) -> Vec<(String, FetchOutcome)> {
        let deadline = self.fetch_timeout.map(|t| Instant::now() + t);

        if self.fetch_concurrency <= 1 || calendars.len() <= 1 {
            let mut out = Vec::with_capacity(calendars.len());
            for id in calendars {
                let outcome = fetch_one(self.source.as_ref(), auth, id, query, deadline).await;
                out.push((id.clone(), outcome));
            }
            return out;
        }

        let semaphore = Arc::new(Semaphore::new(self.fetch_concurrency));
        let mut tasks = JoinSet::new();
        for (index, id) in calendars.iter().enumerate() {
            let source = Arc::clone(&self.source);
            let semaphore = Arc::clone(&semaphore);
            let auth = auth.clone();
            let query = query.clone();
            let id = id.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let outcome = fetch_one(source.as_ref(), &auth, &id, &query, deadline).await;
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<FetchOutcome>> = vec![None; calendars.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => tracing::error!("calendar fetch task aborted: {e}"),
            }
        }

        calendars
            .iter()
            .cloned()
            .zip(slots)
            .map(|(id, slot)| {
                let outcome = slot.unwrap_or_else(|| Err("fetch task aborted".to_string()));
                (id, outcome)
            })
            .collect()
    }

    fn find_duplicates(
        &self,
        candidate: &Event,
        events: &[Event],
        calendar_id: &str,
        plan: &ScanPlan,
    ) -> Vec<DuplicateInfo> {
        if !plan.check_duplicates {
            return Vec::new();
        }

        events
            .iter()
            .filter(|e| !e.same_identity(candidate) && !e.is_cancelled())
            .filter(|e| e.time_range().is_some())
            .filter_map(|existing| {
                let score = self.scorer.score(candidate, existing);
                if score < plan.duplicate_threshold {
                    return None;
                }
                Some(DuplicateInfo {
                    event_id: existing.id.clone(),
                    title: existing.display_title().to_string(),
                    link: existing.html_link.clone(),
                    similarity: round2(score),
                    full_event: existing.clone(),
                    calendar_id: calendar_id.to_string(),
                    suggestion: suggestion_for(score).to_string(),
                })
            })
            .collect()
    }

    fn find_conflicts(
        &self,
        candidate: &Event,
        events: &[Event],
        calendar_id: &str,
        plan: &ScanPlan,
    ) -> Vec<ConflictInfo> {
        if !plan.check_conflicts {
            return Vec::new();
        }

        self.analyzer
            .find_overlapping_events(events, candidate)
            .into_iter()
            .filter(|e| plan.include_declined_events || !e.is_declined_by_self())
            .filter_map(|existing| {
                let range = existing.time_range()?;
                let analysis = self.analyzer.analyze_overlap(candidate, existing);
                if !analysis.has_overlap {
                    return None;
                }
                Some(ConflictInfo {
                    kind: ConflictKind::Overlap,
                    calendar_id: calendar_id.to_string(),
                    event_id: existing.id.clone(),
                    title: existing.display_title().to_string(),
                    link: existing.html_link.clone(),
                    start: range.start,
                    end: range.end,
                    full_event: Some(existing.clone()),
                    overlap: overlap_detail(&analysis),
                })
            })
            .collect()
    }

    /// Coarse scan through the aggregated free/busy endpoint.
    ///
    /// Busy blocks carry no title or link, so every entry uses the
    /// [`BUSY_PLACEHOLDER_ID`] identity. Any failure yields an empty list.
    pub async fn check_conflicts_with_free_busy(
        &self,
        auth: &AccessToken,
        candidate: &Event,
        calendar_ids: &[String],
    ) -> Vec<ConflictInfo> {
        let Some(range) = candidate.time_range() else {
            return Vec::new();
        };
        if calendar_ids.is_empty() {
            return Vec::new();
        }

        let availability = match self
            .source
            .query_free_busy(auth, range.start, range.end, calendar_ids)
            .await
        {
            Ok(availability) => availability,
            Err(e) => {
                tracing::warn!("free/busy query failed, reporting no conflicts: {e}");
                return Vec::new();
            }
        };

        let mut conflicts = Vec::new();
        for calendar_id in calendar_ids {
            let Some(calendar) = availability.get(calendar_id) else {
                tracing::debug!(calendar = %calendar_id, "calendar missing from free/busy response");
                continue;
            };
            if !calendar.errors.is_empty() {
                tracing::warn!(
                    calendar = %calendar_id,
                    errors = ?calendar.errors,
                    "skipping calendar in free/busy scan"
                );
                continue;
            }

            for slot in &calendar.busy {
                if !self.analyzer.check_busy_conflict(candidate, slot) {
                    continue;
                }
                let analysis = self.analyzer.analyze_busy_overlap(candidate, slot);
                conflicts.push(ConflictInfo {
                    kind: ConflictKind::Overlap,
                    calendar_id: calendar_id.clone(),
                    event_id: Some(BUSY_PLACEHOLDER_ID.to_string()),
                    title: BUSY_PLACEHOLDER_TITLE.to_string(),
                    link: None,
                    start: slot.start,
                    end: slot.end,
                    full_event: None,
                    overlap: overlap_detail(&analysis),
                });
            }
        }

        conflicts
    }
}

/// List one calendar, giving up at `deadline`.
async fn fetch_one(
    source: &dyn CalendarSource,
    auth: &AccessToken,
    calendar_id: &str,
    query: &EventQuery,
    deadline: Option<Instant>,
) -> FetchOutcome {
    let fetch = source.list_events(auth, calendar_id, query);
    let outcome = match deadline {
        Some(deadline) => match tokio::time::timeout_at(deadline, fetch).await {
            Ok(outcome) => outcome,
            Err(_) => return Err(FETCH_TIMED_OUT.to_string()),
        },
        None => fetch.await,
    };
    outcome.map_err(|e| e.to_string())
}

fn overlap_detail(analysis: &super::overlap::OverlapAnalysis) -> Option<OverlapDetail> {
    Some(OverlapDetail {
        duration: analysis.duration.clone()?,
        percentage: analysis.percentage?,
        start: analysis.overlap_start?,
        end: analysis.overlap_end?,
    })
}

fn suggestion_for(score: f64) -> &'static str {
    if score > EXACT_DUPLICATE_THRESHOLD {
        EXACT_DUPLICATE_SUGGESTION
    } else {
        SIMILAR_EVENT_SUGGESTION
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
