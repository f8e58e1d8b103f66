//! Temporal overlap between events and busy intervals.
//!
//! All tests are strict: `a.start < b.end && b.start < a.end`. Ranges that
//! only touch at an endpoint do not overlap.

use chrono::{DateTime, Duration, Utc};

use crate::calendar::{BusySlot, Event, TimeRange};

/// Result of comparing two ranges.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OverlapAnalysis {
    pub has_overlap: bool,
    pub duration: Option<String>,
    /// 0-100, relative to the first argument.
    pub percentage: Option<u32>,
    pub overlap_start: Option<DateTime<Utc>>,
    pub overlap_end: Option<DateTime<Utc>>,
}

impl OverlapAnalysis {
    fn none() -> Self {
        Self::default()
    }
}

/// Stateless overlap analyzer.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlapAnalyzer;

impl OverlapAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Compare `a` against `b`.
    ///
    /// The percentage is the share of **`a`** that `b` covers, so swapping the
    /// arguments changes it whenever the durations differ. Pass the candidate
    /// event first.
    pub fn analyze_overlap(&self, a: &Event, b: &Event) -> OverlapAnalysis {
        match (a.time_range(), b.time_range()) {
            (Some(ra), Some(rb)) => analyze_ranges(&ra, rb.start, rb.end),
            _ => OverlapAnalysis::none(),
        }
    }

    /// Same as [`analyze_overlap`](Self::analyze_overlap) against a raw busy
    /// interval; the percentage is relative to `event`.
    pub fn analyze_busy_overlap(&self, event: &Event, slot: &BusySlot) -> OverlapAnalysis {
        match event.time_range() {
            Some(range) => analyze_ranges(&range, slot.start, slot.end),
            None => OverlapAnalysis::none(),
        }
    }

    /// Events from `events` that overlap `target`, skipping `target` itself
    /// and cancelled entries. Input order is kept.
    pub fn find_overlapping_events<'a>(&self, events: &'a [Event], target: &Event) -> Vec<&'a Event> {
        let Some(target_range) = target.time_range() else {
            return Vec::new();
        };

        events
            .iter()
            .filter(|e| !e.same_identity(target) && !e.is_cancelled())
            .filter(|e| e.time_range().is_some_and(|r| r.overlaps(&target_range)))
            .collect()
    }

    /// Whether `event` collides with a busy interval.
    pub fn check_busy_conflict(&self, event: &Event, slot: &BusySlot) -> bool {
        event
            .time_range()
            .is_some_and(|r| r.overlaps_interval(slot.start, slot.end))
    }
}

fn analyze_ranges(reference: &TimeRange, start: DateTime<Utc>, end: DateTime<Utc>) -> OverlapAnalysis {
    if !reference.overlaps_interval(start, end) {
        return OverlapAnalysis::none();
    }

    let overlap_start = reference.start.max(start);
    let overlap_end = reference.end.min(end);
    let overlap = overlap_end - overlap_start;

    OverlapAnalysis {
        has_overlap: true,
        duration: Some(format_duration(overlap)),
        percentage: Some(percentage_of(overlap, reference.duration())),
        overlap_start: Some(overlap_start),
        overlap_end: Some(overlap_end),
    }
}

fn percentage_of(part: Duration, whole: Duration) -> u32 {
    let whole_ms = whole.num_milliseconds();
    if whole_ms <= 0 {
        return 0;
    }
    let pct = (part.num_milliseconds() as f64 / whole_ms as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u32
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

/// Render a duration using its two largest adjacent units.
///
/// "2 days 3 hours", "1 hour 30 minutes", "45 minutes". A zero remainder is
/// dropped ("1 day", "2 hours"); seconds are truncated.
pub fn format_duration(duration: Duration) -> String {
    let minutes = duration.num_minutes().max(0);
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        let rem_hours = hours % 24;
        if rem_hours > 0 {
            format!("{} {}", plural(days, "day"), plural(rem_hours, "hour"))
        } else {
            plural(days, "day")
        }
    } else if hours > 0 {
        let rem_minutes = minutes % 60;
        if rem_minutes > 0 {
            format!("{} {}", plural(hours, "hour"), plural(rem_minutes, "minute"))
        } else {
            plural(hours, "hour")
        }
    } else {
        plural(minutes, "minute")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::EventStatus;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, h, m, 0).unwrap()
    }

    #[test]
    fn half_hour_overlap_of_one_hour_candidate() {
        let candidate = Event::timed("Candidate", at(10, 0), at(11, 0));
        let existing = Event::timed("Existing", at(10, 30), at(11, 30));

        let analysis = OverlapAnalyzer.analyze_overlap(&candidate, &existing);
        assert!(analysis.has_overlap);
        assert_eq!(analysis.duration.as_deref(), Some("30 minutes"));
        assert_eq!(analysis.percentage, Some(50));
        assert_eq!(analysis.overlap_start, Some(at(10, 30)));
        assert_eq!(analysis.overlap_end, Some(at(11, 0)));
    }

    #[test]
    fn percentage_depends_on_argument_order() {
        let short = Event::timed("short", at(10, 0), at(10, 30));
        let long = Event::timed("long", at(10, 0), at(12, 0));

        let forward = OverlapAnalyzer.analyze_overlap(&short, &long);
        let backward = OverlapAnalyzer.analyze_overlap(&long, &short);
        assert_eq!(forward.percentage, Some(100));
        assert_eq!(backward.percentage, Some(25));
        assert_eq!(forward.duration, backward.duration);
    }

    #[test]
    fn touching_events_do_not_overlap() {
        let a = Event::timed("a", at(9, 0), at(10, 0));
        let b = Event::timed("b", at(10, 0), at(11, 0));
        assert!(!OverlapAnalyzer.analyze_overlap(&a, &b).has_overlap);
        assert!(!OverlapAnalyzer.analyze_overlap(&b, &a).has_overlap);
    }

    #[test]
    fn find_overlapping_skips_self_and_cancelled() {
        let target = Event::timed("Target", at(10, 0), at(11, 0)).with_id("t");
        let events = vec![
            target.clone(),
            Event::timed("Cancelled", at(10, 0), at(11, 0))
                .with_id("c")
                .with_status(EventStatus::Cancelled),
            Event::timed("Overlap", at(10, 45), at(11, 15)).with_id("o"),
            Event::timed("Adjacent", at(11, 0), at(12, 0)).with_id("adj"),
            Event::untimed("No time").with_id("u"),
        ];

        let found = OverlapAnalyzer.find_overlapping_events(&events, &target);
        let ids: Vec<_> = found.iter().filter_map(|e| e.id.as_deref()).collect();
        assert_eq!(ids, vec!["o"]);
    }

    #[test]
    fn busy_slot_conflicts_use_strict_test() {
        let event = Event::timed("x", at(10, 0), at(11, 0));
        let inside = BusySlot { start: at(10, 15), end: at(10, 45) };
        let touching = BusySlot { start: at(11, 0), end: at(12, 0) };
        assert!(OverlapAnalyzer.check_busy_conflict(&event, &inside));
        assert!(!OverlapAnalyzer.check_busy_conflict(&event, &touching));

        let analysis = OverlapAnalyzer.analyze_busy_overlap(&event, &inside);
        assert_eq!(analysis.percentage, Some(50));
    }

    #[test]
    fn format_duration_uses_two_largest_units() {
        assert_eq!(format_duration(Duration::minutes(0)), "0 minutes");
        assert_eq!(format_duration(Duration::minutes(1)), "1 minute");
        assert_eq!(format_duration(Duration::minutes(45)), "45 minutes");
        assert_eq!(format_duration(Duration::minutes(60)), "1 hour");
        assert_eq!(format_duration(Duration::minutes(90)), "1 hour 30 minutes");
        assert_eq!(format_duration(Duration::hours(24)), "1 day");
        assert_eq!(format_duration(Duration::hours(51)), "2 days 3 hours");
        assert_eq!(format_duration(Duration::hours(24) + Duration::minutes(30)), "1 day");
    }

    #[test]
    fn zero_length_reference_reports_zero_percent() {
        let point = Event::timed("point", at(10, 30), at(10, 30));
        let span = Event::timed("span", at(10, 0), at(11, 0));
        let analysis = OverlapAnalyzer.analyze_overlap(&point, &span);
        assert!(analysis.has_overlap);
        assert_eq!(analysis.percentage, Some(0));
    }

    proptest! {
        #[test]
        fn percentage_stays_within_bounds(
            a_start in 0i64..600, a_len in 1i64..300,
            b_start in 0i64..600, b_len in 1i64..300,
        ) {
            let base = at(0, 0);
            let a = Event::timed("a", base + Duration::minutes(a_start), base + Duration::minutes(a_start + a_len));
            let b = Event::timed("b", base + Duration::minutes(b_start), base + Duration::minutes(b_start + b_len));
            let analysis = OverlapAnalyzer.analyze_overlap(&a, &b);
            if let Some(pct) = analysis.percentage {
                prop_assert!(pct <= 100);
            }
            prop_assert_eq!(analysis.has_overlap, OverlapAnalyzer.analyze_overlap(&b, &a).has_overlap);
        }
    }
}
