//! Check-then-create flow against an in-memory calendar provider.

mod common;

use std::sync::Arc;
use std::time::Duration;

use calmcp_core::workflow::{CreateEventOutcome, CreateEventRequest, CreateEventWorkflow};
use calmcp_core::{Config, Event, EventTime};

use common::{at, token, Failure, FakeCalendar};

fn lunch_request() -> CreateEventRequest {
    CreateEventRequest::new(
        "primary",
        "Lunch with Josh",
        EventTime::Timed {
            start: at(12, 0),
            end: at(13, 0),
            timezone: Some("America/New_York".into()),
        },
    )
}

fn existing_lunch() -> Event {
    Event::timed("Lunch with Josh", at(12, 0), at(13, 0))
        .with_id("existing")
        .with_link("https://calendar.google.com/event?eid=existing")
}

#[tokio::test]
async fn scenario_a_duplicate_is_blocked_at_default_threshold() {
    let fake = Arc::new(FakeCalendar::new().with_events("primary", vec![existing_lunch()]));
    let workflow = CreateEventWorkflow::new(fake.clone());

    let outcome = workflow.create(&token(), &lunch_request()).await.unwrap();

    let CreateEventOutcome::Blocked { explanation, text } = outcome else {
        panic!("expected the write to be refused");
    };
    assert_eq!(explanation.block_threshold, 0.9);
    assert_eq!(explanation.duplicate.event_id.as_deref(), Some("existing"));
    assert!(text.contains("DUPLICATE EVENT DETECTED (100% similar"));
    assert!(text.contains("Event ID: existing"));
    assert!(text.contains("set blockOnHighSimilarity to false to proceed"));
    assert!(fake.inserted().is_empty());
}

#[tokio::test]
async fn scenario_a_override_creates_and_warns() {
    let fake = Arc::new(FakeCalendar::new().with_events("primary", vec![existing_lunch()]));
    let workflow = CreateEventWorkflow::new(fake.clone());
    let mut request = lunch_request();
    request.block_on_high_similarity = Some(false);

    let outcome = workflow.create(&token(), &request).await.unwrap();

    let CreateEventOutcome::Created { event, warnings, text, .. } = outcome else {
        panic!("expected the event to be created");
    };
    assert_eq!(event.id.as_deref(), Some("created-0"));
    assert_eq!(warnings.unwrap().duplicates[0].similarity, 1.0);
    assert!(text.contains("Event created successfully!"));
    assert!(text.contains("POTENTIAL DUPLICATES DETECTED:"));
    assert!(text.contains("SCHEDULING CONFLICTS DETECTED:"));

    let inserted = fake.inserted();
    assert_eq!(inserted.len(), 1);
    assert_eq!(inserted[0].0, "primary");
}

#[tokio::test]
async fn similar_but_not_identical_event_only_warns() {
    let fake = Arc::new(FakeCalendar::new().with_events(
        "primary",
        vec![Event::timed("Lunch with Josh", at(12, 30), at(13, 30)).with_id("similar")],
    ));
    let workflow = CreateEventWorkflow::new(fake.clone());

    let outcome = workflow.create(&token(), &lunch_request()).await.unwrap();

    let CreateEventOutcome::Created { warnings, .. } = outcome else {
        panic!("expected the event to be created");
    };
    let warnings = warnings.unwrap();
    assert_eq!(warnings.duplicates.len(), 1);
    let similarity = warnings.duplicates[0].similarity;
    assert!((0.82..=0.83).contains(&similarity), "similarity {similarity}");
    assert_eq!(fake.inserted().len(), 1);
}

#[tokio::test]
async fn skipped_calendars_are_mentioned_after_creation() {
    let fake = Arc::new(FakeCalendar::new().with_failure("shared", Failure::Denied));
    let workflow = CreateEventWorkflow::new(fake.clone());
    let mut request = lunch_request();
    request.options.calendars_to_check = vec!["primary".into(), "shared".into()];

    let outcome = workflow.create(&token(), &request).await.unwrap();

    let CreateEventOutcome::Created { warnings, scan, text, .. } = outcome else {
        panic!("expected the event to be created");
    };
    assert!(warnings.is_none());
    assert_eq!(scan.skipped_calendars.len(), 1);
    assert!(text.contains("Could not check these calendars:"));
    assert!(text.contains("shared"));
}

#[tokio::test]
async fn configured_policy_applies() {
    let fake = Arc::new(FakeCalendar::new().with_events("primary", vec![existing_lunch()]));
    let mut config = Config::default();
    config.set("blocking.block_on_high_similarity", "false").unwrap();
    let workflow = CreateEventWorkflow::from_config(fake.clone(), &config).unwrap();

    let outcome = workflow.create(&token(), &lunch_request()).await.unwrap();
    assert!(outcome.is_created());
}

#[tokio::test]
async fn slow_calendar_does_not_hide_a_duplicate_elsewhere() {
    let fake = Arc::new(
        FakeCalendar::new()
            .with_events("primary", vec![existing_lunch()])
            .with_delay("slow", Duration::from_secs(5)),
    );
    let workflow = CreateEventWorkflow::new(fake.clone())
        .with_scan_timeout(Duration::from_millis(50))
        .unwrap();
    let mut request = lunch_request();
    request.options.calendars_to_check = vec!["primary".into(), "slow".into()];

    let outcome = workflow.create(&token(), &request).await.unwrap();

    let CreateEventOutcome::Blocked { explanation, .. } = outcome else {
        panic!("expected the duplicate in primary to block the write");
    };
    assert_eq!(explanation.duplicate.event_id.as_deref(), Some("existing"));
    assert!(fake.inserted().is_empty());
}
