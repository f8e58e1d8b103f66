//! HTTP-level tests for [`GoogleCalendarClient`] against a mock server.

use chrono::{NaiveDate, TimeZone, Utc};
use mockito::Matcher;
use serde_json::json;

use super::client::{CalendarSource, EventQuery, GoogleCalendarClient};
use super::event::{Event, EventTime};
use crate::error::CalendarError;
use crate::integrations::oauth::AccessToken;

fn token() -> AccessToken {
    AccessToken::new("test-token")
}

fn window() -> EventQuery {
    EventQuery::window(
        Utc.with_ymd_and_hms(2025, 3, 14, 11, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 3, 14, 14, 0, 0).unwrap(),
    )
}

#[tokio::test]
async fn list_events_sends_window_and_decodes_items() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/calendars/primary/events")
        .match_header("authorization", "Bearer test-token")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("timeMin".into(), "2025-03-14T11:00:00+00:00".into()),
            Matcher::UrlEncoded("timeMax".into(), "2025-03-14T14:00:00+00:00".into()),
            Matcher::UrlEncoded("singleEvents".into(), "true".into()),
            Matcher::UrlEncoded("maxResults".into(), "250".into()),
            Matcher::UrlEncoded("orderBy".into(), "startTime".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "items": [
                    {
                        "id": "lunch",
                        "summary": "Lunch with Josh",
                        "htmlLink": "https://calendar.google.com/event?eid=lunch",
                        "start": { "dateTime": "2025-03-14T12:00:00Z" },
                        "end": { "dateTime": "2025-03-14T13:00:00Z" }
                    },
                    {
                        "id": "holiday",
                        "summary": "Pi Day",
                        "start": { "date": "2025-03-14" },
                        "end": { "date": "2025-03-15" }
                    }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = GoogleCalendarClient::with_base_url(server.url());
    let events = client.list_events(&token(), "primary", &window()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].id.as_deref(), Some("lunch"));
    assert_eq!(events[0].title, "Lunch with Josh");
    assert!(matches!(events[0].time, Some(EventTime::Timed { .. })));
    assert_eq!(
        events[1].time,
        Some(EventTime::AllDay {
            start_date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            end_date_exclusive: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
        })
    );
}

#[tokio::test]
async fn empty_listing_is_not_an_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/calendars/primary/events")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let client = GoogleCalendarClient::with_base_url(server.url());
    let events = client.list_events(&token(), "primary", &window()).await.unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn forbidden_maps_to_permission_denied() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/calendars/primary/events")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body(json!({ "error": { "message": "Forbidden" } }).to_string())
        .create_async()
        .await;

    let client = GoogleCalendarClient::with_base_url(server.url());
    let err = client.list_events(&token(), "primary", &window()).await.unwrap_err();
    match err {
        CalendarError::PermissionDenied { calendar_id } => assert_eq!(calendar_id, "primary"),
        other => panic!("expected PermissionDenied, got {other:?}"),
    }
}

#[tokio::test]
async fn forbidden_rate_limit_maps_to_rate_limited() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/calendars/primary/events")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body(json!({ "error": { "message": "Rate Limit Exceeded" } }).to_string())
        .create_async()
        .await;

    let client = GoogleCalendarClient::with_base_url(server.url());
    let err = client.list_events(&token(), "primary", &window()).await.unwrap_err();
    assert!(matches!(err, CalendarError::RateLimited));
}

#[tokio::test]
async fn status_codes_map_onto_error_kinds() {
    let mut server = mockito::Server::new_async().await;
    let _not_found = server
        .mock("GET", "/calendars/missing/events")
        .match_query(Matcher::Any)
        .with_status(404)
        .create_async()
        .await;
    let _throttled = server
        .mock("GET", "/calendars/busy/events")
        .match_query(Matcher::Any)
        .with_status(429)
        .create_async()
        .await;
    let _broken = server
        .mock("GET", "/calendars/broken/events")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body(json!({ "error": { "message": "Backend Error" } }).to_string())
        .create_async()
        .await;

    let client = GoogleCalendarClient::with_base_url(server.url());
    let auth = token();

    assert!(matches!(
        client.list_events(&auth, "missing", &window()).await,
        Err(CalendarError::NotFound { .. })
    ));
    assert!(matches!(
        client.list_events(&auth, "busy", &window()).await,
        Err(CalendarError::RateLimited)
    ));
    match client.list_events(&auth, "broken", &window()).await {
        Err(CalendarError::Api { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "Backend Error");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/calendars/primary/events")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("not json")
        .create_async()
        .await;

    let client = GoogleCalendarClient::with_base_url(server.url());
    let err = client.list_events(&token(), "primary", &window()).await.unwrap_err();
    assert!(matches!(err, CalendarError::Decode(_)));
}

#[tokio::test]
async fn free_busy_posts_items_and_decodes_calendars() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/freeBusy")
        .match_body(Matcher::PartialJson(json!({
            "items": [{ "id": "primary" }, { "id": "shared" }]
        })))
        .with_status(200)
        .with_body(
            json!({
                "calendars": {
                    "primary": {
                        "busy": [
                            { "start": "2025-03-14T10:00:00Z", "end": "2025-03-14T11:00:00Z" }
                        ]
                    },
                    "shared": {
                        "errors": [{ "domain": "global", "reason": "notFound" }]
                    }
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = GoogleCalendarClient::with_base_url(server.url());
    let ids = vec!["primary".to_string(), "shared".to_string()];
    let availability = client
        .query_free_busy(
            &token(),
            Utc.with_ymd_and_hms(2025, 3, 14, 10, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap(),
            &ids,
        )
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(availability["primary"].busy.len(), 1);
    assert!(availability["primary"].errors.is_empty());
    assert_eq!(availability["shared"].errors, vec!["notFound".to_string()]);
}

#[tokio::test]
async fn insert_event_posts_body_and_returns_created_snapshot() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/calendars/primary/events")
        .match_body(Matcher::PartialJson(json!({
            "summary": "Lunch with Josh",
            "start": { "dateTime": "2025-03-14T12:00:00+00:00" },
            "end": { "dateTime": "2025-03-14T13:00:00+00:00" }
        })))
        .with_status(200)
        .with_body(
            json!({
                "id": "created-1",
                "status": "confirmed",
                "summary": "Lunch with Josh",
                "htmlLink": "https://calendar.google.com/event?eid=created-1",
                "start": { "dateTime": "2025-03-14T12:00:00Z" },
                "end": { "dateTime": "2025-03-14T13:00:00Z" }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = GoogleCalendarClient::with_base_url(server.url());
    let candidate = Event::timed(
        "Lunch with Josh",
        Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 3, 14, 13, 0, 0).unwrap(),
    );
    let created = client.insert_event(&token(), "primary", &candidate).await.unwrap();

    mock.assert_async().await;
    assert_eq!(created.id.as_deref(), Some("created-1"));
    assert_eq!(
        created.html_link.as_deref(),
        Some("https://calendar.google.com/event?eid=created-1")
    );
    assert_eq!(created.time_range(), candidate.time_range());
}
