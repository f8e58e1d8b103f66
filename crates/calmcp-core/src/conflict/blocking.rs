//! Decide whether a scan result should stop an event from being written.
//!
//! Two thresholds are in play: duplicates are surfaced from the scan's
//! similarity threshold (0.7 by default) and writes are refused only above
//! the block threshold (0.9 by default). Matches between the two are
//! reported as warnings.

use serde::{Deserialize, Serialize};

use super::report;
use super::types::{
    ConflictCheckResult, ConflictInfo, DuplicateInfo, ScanStage, SkippedCalendar,
    DEFAULT_BLOCK_THRESHOLD,
};

/// Instruction shown to the caller when a write is refused.
pub const OVERRIDE_HINT: &str = "set blockOnHighSimilarity to false to proceed";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockingPolicy {
    pub block_on_high_similarity: bool,
    pub block_threshold: f64,
}

impl Default for BlockingPolicy {
    fn default() -> Self {
        Self {
            block_on_high_similarity: true,
            block_threshold: DEFAULT_BLOCK_THRESHOLD,
        }
    }
}

/// Why a write was refused.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockExplanation {
    pub duplicate: DuplicateInfo,
    pub block_threshold: f64,
}

impl BlockExplanation {
    /// User-facing explanation with the override instruction.
    pub fn message(&self) -> String {
        report::format_block_message(self)
    }
}

/// Non-blocking findings attached to a successful write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Warnings {
    pub duplicates: Vec<DuplicateInfo>,
    pub conflicts: Vec<ConflictInfo>,
    pub skipped_calendars: Vec<SkippedCalendar>,
}

impl Warnings {
    pub fn is_empty(&self) -> bool {
        self.duplicates.is_empty() && self.conflicts.is_empty()
    }

    /// Re-pack as a scan result, e.g. for report formatting.
    pub fn to_result(&self) -> ConflictCheckResult {
        ConflictCheckResult::finish(
            self.duplicates.clone(),
            self.conflicts.clone(),
            self.skipped_calendars.clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteDecision {
    Block(BlockExplanation),
    ProceedWithWarnings(Warnings),
    ProceedClean,
}

impl WriteDecision {
    pub fn stage(&self) -> ScanStage {
        match self {
            WriteDecision::Block(_) => ScanStage::Block,
            WriteDecision::ProceedWithWarnings(_) => ScanStage::ProceedWithWarnings,
            WriteDecision::ProceedClean => ScanStage::ProceedClean,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, WriteDecision::Block(_))
    }
}

impl BlockingPolicy {
    /// A policy that never refuses a write.
    pub fn permissive() -> Self {
        Self {
            block_on_high_similarity: false,
            ..Self::default()
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.block_threshold = threshold;
        self
    }

    /// Classify a scan result.
    ///
    /// The highest-scoring duplicate strictly above the block threshold
    /// blocks the write. Everything else found becomes a warning.
    pub fn classify(&self, result: &ConflictCheckResult) -> WriteDecision {
        if self.block_on_high_similarity {
            let blocking = result
                .duplicates
                .iter()
                .filter(|d| d.similarity > self.block_threshold)
                .max_by(|a, b| a.similarity.total_cmp(&b.similarity));

            if let Some(duplicate) = blocking {
                return WriteDecision::Block(BlockExplanation {
                    duplicate: duplicate.clone(),
                    block_threshold: self.block_threshold,
                });
            }
        }

        let warnings = Warnings {
            duplicates: result.duplicates.clone(),
            conflicts: result.conflicts.clone(),
            skipped_calendars: result.skipped_calendars.clone(),
        };

        if warnings.is_empty() {
            WriteDecision::ProceedClean
        } else {
            WriteDecision::ProceedWithWarnings(warnings)
        }
    }
}
