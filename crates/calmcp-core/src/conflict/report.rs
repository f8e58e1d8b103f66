//! Plain-text rendering of scan results for tool responses.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use indoc::formatdoc;

use crate::calendar::{Event, EventTime};

use super::blocking::{BlockExplanation, OVERRIDE_HINT};
use super::types::{ConflictCheckResult, ConflictInfo};

fn fmt_instant(instant: &DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn fmt_time(time: Option<&EventTime>) -> String {
    match time {
        Some(EventTime::Timed {
            start,
            end,
            timezone,
        }) => {
            let zone = timezone
                .as_deref()
                .map(|tz| format!(" (authored in {tz})"))
                .unwrap_or_default();
            format!("{} - {}{zone}", fmt_instant(start), fmt_instant(end))
        }
        Some(EventTime::AllDay { start_date, .. }) => {
            let last = time
                .and_then(EventTime::last_day_inclusive)
                .unwrap_or(*start_date);
            if last == *start_date {
                format!("{start_date} (all day)")
            } else {
                format!("{start_date} - {last} (all day)")
            }
        }
        None => "(time not set)".to_string(),
    }
}

fn percent(similarity: f64) -> u32 {
    (similarity * 100.0).round().clamp(0.0, 100.0) as u32
}

/// Multi-line description of an event.
pub fn format_event_detail(event: &Event) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Event: {}", event.display_title());
    if let Some(id) = &event.id {
        let _ = writeln!(out, "Event ID: {id}");
    }
    let _ = writeln!(out, "When: {}", fmt_time(event.time.as_ref()));
    if let Some(location) = event.location.as_deref().filter(|l| !l.trim().is_empty()) {
        let _ = writeln!(out, "Location: {location}");
    }
    if let Some(description) = event.description.as_deref().filter(|d| !d.trim().is_empty()) {
        let _ = writeln!(out, "Description: {description}");
    }
    if !event.attendees.is_empty() {
        let _ = writeln!(out, "Attendees:");
        for attendee in &event.attendees {
            let name = attendee
                .display_name
                .as_deref()
                .map(|n| format!("{n} <{}>", attendee.email))
                .unwrap_or_else(|| attendee.email.clone());
            let _ = writeln!(out, "  - {name} ({})", attendee.response_status.label());
        }
    }
    if let Some(link) = &event.html_link {
        let _ = writeln!(out, "View: {link}");
    }
    out
}

fn write_conflict(out: &mut String, conflict: &ConflictInfo) {
    let _ = writeln!(
        out,
        "  - \"{}\" ({} - {})",
        conflict.title,
        fmt_instant(&conflict.start),
        fmt_instant(&conflict.end)
    );
    if let Some(overlap) = &conflict.overlap {
        let _ = writeln!(
            out,
            "    Overlap: {} ({}% of your event)",
            overlap.duration, overlap.percentage
        );
    }
    if let Some(link) = &conflict.link {
        let _ = writeln!(out, "    View: {link}");
    }
}

/// Warning sections for duplicates, conflicts and unreadable calendars.
///
/// Returns an empty string when there is nothing to report.
pub fn format_conflict_warnings(result: &ConflictCheckResult) -> String {
    let mut out = String::new();

    if !result.duplicates.is_empty() {
        let _ = writeln!(out, "POTENTIAL DUPLICATES DETECTED:");
        for dup in &result.duplicates {
            let _ = writeln!(
                out,
                "  - \"{}\" ({}% similar, calendar: {})",
                dup.title,
                percent(dup.similarity),
                dup.calendar_id
            );
            let _ = writeln!(out, "    {}", dup.suggestion);
            if let Some(link) = &dup.link {
                let _ = writeln!(out, "    View: {link}");
            }
        }
    }

    if !result.conflicts.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, "SCHEDULING CONFLICTS DETECTED:");

        let mut calendars: Vec<&str> = Vec::new();
        for conflict in &result.conflicts {
            if !calendars.contains(&conflict.calendar_id.as_str()) {
                calendars.push(&conflict.calendar_id);
            }
        }
        for calendar in calendars {
            let _ = writeln!(out, "Calendar: {calendar}");
            for conflict in result.conflicts.iter().filter(|c| c.calendar_id == calendar) {
                write_conflict(&mut out, conflict);
            }
        }
    }

    if !result.skipped_calendars.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, "Could not check these calendars:");
        for skipped in &result.skipped_calendars {
            let _ = writeln!(out, "  - {}: {}", skipped.calendar_id, skipped.reason);
        }
    }

    out
}

/// Refusal text for a blocked write.
pub fn format_block_message(explanation: &BlockExplanation) -> String {
    let dup = &explanation.duplicate;
    formatdoc! {"
        DUPLICATE EVENT DETECTED ({similarity}% similar, calendar: {calendar})

        {detail}
        {suggestion}

        The event was not created because its similarity exceeds {threshold}%.
        To create it anyway, {hint}.
        ",
        similarity = percent(dup.similarity),
        calendar = dup.calendar_id,
        detail = format_event_detail(&dup.full_event).trim_end(),
        suggestion = dup.suggestion,
        threshold = percent(explanation.block_threshold),
        hint = OVERRIDE_HINT,
    }
}
