//! Conflict and duplicate detection.
//!
//! - [`SimilarityScorer`]: how likely two events are the same appointment
//! - [`OverlapAnalyzer`]: how much two time ranges share
//! - [`ConflictOrchestrator`]: scans one or more calendars for a candidate
//! - [`BlockingPolicy`]: decides whether a write goes ahead

pub mod blocking;
pub mod orchestrator;
pub mod overlap;
pub mod report;
pub mod similarity;
pub mod types;

pub use blocking::{BlockExplanation, BlockingPolicy, Warnings, WriteDecision, OVERRIDE_HINT};
pub use orchestrator::{ConflictOrchestrator, BUSY_PLACEHOLDER_ID, BUSY_PLACEHOLDER_TITLE};
pub use overlap::{format_duration, OverlapAnalysis, OverlapAnalyzer};
pub use report::{format_block_message, format_conflict_warnings, format_event_detail};
pub use similarity::SimilarityScorer;
pub use types::{
    ConflictCheckResult, ConflictDetectionOptions, ConflictInfo, ConflictKind, DuplicateInfo,
    OverlapDetail, ScanPlan, ScanStage, SkippedCalendar, DEFAULT_BLOCK_THRESHOLD,
    DEFAULT_DUPLICATE_THRESHOLD,
};
