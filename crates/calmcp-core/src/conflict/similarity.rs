//! Fuzzy likeness between two events.
//!
//! The score is a weighted sum of title, time and location similarity in
//! [0, 1]. Pairs mixing an all-day entry with a timed one are capped at
//! [`CROSS_KIND_CAP`] so an all-day placeholder never reads as a duplicate
//! of a meeting that shares its title.

use crate::calendar::{Event, TimeRange};

use super::types::DEFAULT_DUPLICATE_THRESHOLD;

const TITLE_WEIGHT: f64 = 0.5;
const TIME_WEIGHT: f64 = 0.35;
const LOCATION_WEIGHT: f64 = 0.15;

/// Upper bound of the score for an all-day vs timed pair.
pub const CROSS_KIND_CAP: f64 = 0.3;

/// Start gaps below this still earn partial time similarity.
const NEAR_START_WINDOW_MS: f64 = 3_600_000.0;

/// Stateless event similarity scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarityScorer;

impl SimilarityScorer {
    pub fn new() -> Self {
        Self
    }

    /// Similarity of two events in [0, 1].
    pub fn score(&self, a: &Event, b: &Event) -> f64 {
        let title_sim = string_similarity(&a.title, b.title.as_str());

        if a.is_all_day() != b.is_all_day() {
            return (title_sim * CROSS_KIND_CAP).min(CROSS_KIND_CAP);
        }

        let time_sim = time_similarity(a.time_range(), b.time_range());
        let location_sim = string_similarity(
            a.location.as_deref().unwrap_or(""),
            b.location.as_deref().unwrap_or(""),
        );

        (TITLE_WEIGHT * title_sim + TIME_WEIGHT * time_sim + LOCATION_WEIGHT * location_sim)
            .clamp(0.0, 1.0)
    }

    /// `score(a, b) >= threshold`.
    pub fn is_duplicate(&self, a: &Event, b: &Event, threshold: f64) -> bool {
        self.score(a, b) >= threshold
    }

    /// [`is_duplicate`](Self::is_duplicate) at the default threshold.
    pub fn is_likely_duplicate(&self, a: &Event, b: &Event) -> bool {
        self.is_duplicate(a, b, DEFAULT_DUPLICATE_THRESHOLD)
    }
}

/// Case- and whitespace-insensitive normalized Levenshtein similarity.
pub fn string_similarity(s1: &str, s2: &str) -> f64 {
    let s1 = s1.trim().to_lowercase();
    let s2 = s2.trim().to_lowercase();

    if s1 == s2 {
        return 1.0;
    }
    if s1.is_empty() || s2.is_empty() {
        return 0.0;
    }

    let max_len = s1.chars().count().max(s2.chars().count());
    1.0 - strsim::levenshtein(&s1, &s2) as f64 / max_len as f64
}

/// How close two time ranges are.
///
/// Identical starts score 1. Overlapping ranges score by overlap relative to
/// their average length. Disjoint ranges whose starts are under an hour apart
/// get a linearly decaying partial score.
pub fn time_similarity(a: Option<TimeRange>, b: Option<TimeRange>) -> f64 {
    let (Some(a), Some(b)) = (a, b) else {
        return 0.0;
    };

    if a.start == b.start {
        return 1.0;
    }

    if a.overlaps(&b) {
        let overlap_ms = (a.end.min(b.end) - a.start.max(b.start)).num_milliseconds() as f64;
        let avg_ms =
            (a.duration().num_milliseconds() + b.duration().num_milliseconds()) as f64 / 2.0;
        if avg_ms <= 0.0 {
            return 0.0;
        }
        return (overlap_ms / avg_ms).min(1.0);
    }

    let gap_ms = (a.start - b.start).num_milliseconds().abs() as f64;
    if gap_ms < NEAR_START_WINDOW_MS {
        0.5 * (1.0 - gap_ms / NEAR_START_WINDOW_MS)
    } else {
        0.0
    }
}
