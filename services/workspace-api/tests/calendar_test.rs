mod common;

use axum::http::{Method, StatusCode};
use common::{error_message, TestContext};
use serde_json::{json, Value};

#[tokio::test]
async fn test_free_busy_returns_gaps_around_busy_time() {
    let ctx = TestContext::new().await;
    ctx.google.ok(
        Method::POST,
        "/calendar/v3/freeBusy",
        json!({
            "calendars": {
                "primary": {
                    "busy": [{"start": "2024-01-01T10:00:00Z", "end": "2024-01-01T10:30:00Z"}]
                }
            }
        }),
    );

    let response = ctx
        .post("/api/calendar/freebusy")
        .json(&json!({
            "timeMin": "2024-01-01T09:00:00Z",
            "timeMax": "2024-01-01T17:00:00Z",
            "durationMinutes": 30
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>(),
        json!({
            "freeSlots": [
                {"start": "2024-01-01T09:00:00.000Z", "end": "2024-01-01T10:00:00.000Z"},
                {"start": "2024-01-01T10:30:00.000Z", "end": "2024-01-01T17:00:00.000Z"}
            ]
        })
    );

    let query = ctx.google.single_request(Method::POST, "/calendar/v3/freeBusy");
    assert_eq!(query.json()["items"], json!([{"id": "primary"}]));
}

#[tokio::test]
async fn test_free_busy_merges_calendars_and_drops_short_gaps() {
    let ctx = TestContext::new().await;
    ctx.google.ok(
        Method::POST,
        "/calendar/v3/freeBusy",
        json!({
            "calendars": {
                "work": {"busy": [{"start": "2024-01-01T09:00:00Z", "end": "2024-01-01T09:45:00Z"}]},
                "team": {"busy": [{"start": "2024-01-01T10:00:00Z", "end": "2024-01-01T11:00:00Z"}]}
            }
        }),
    );

    let response = ctx
        .post("/api/calendar/freebusy")
        .json(&json!({
            "timeMin": "2024-01-01T09:00:00Z",
            "timeMax": "2024-01-01T12:00:00Z",
            "calendarIds": ["work", "team"],
            "durationMinutes": 30
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(
        body["freeSlots"],
        json!([{"start": "2024-01-01T11:00:00.000Z", "end": "2024-01-01T12:00:00.000Z"}])
    );
}

#[tokio::test]
async fn test_free_busy_requires_window() {
    let ctx = TestContext::new().await;

    let response = ctx
        .post("/api/calendar/freebusy")
        .json(&json!({"timeMin": "2024-01-01T09:00:00Z"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&response), "timeMin and timeMax are required");
}

#[tokio::test]
async fn test_free_busy_rejects_malformed_timestamp() {
    let ctx = TestContext::new().await;

    let response = ctx
        .post("/api/calendar/freebusy")
        .json(&json!({"timeMin": "tomorrow", "timeMax": "2024-01-01T17:00:00Z"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(ctx.google.requests().is_empty());
}

#[tokio::test]
async fn test_free_busy_rejects_oversized_duration() {
    let ctx = TestContext::new().await;

    for minutes in [i64::MAX, 60 * 24 * 366 + 1] {
        let response = ctx
            .post("/api/calendar/freebusy")
            .json(&json!({
                "timeMin": "2024-01-01T09:00:00Z",
                "timeMax": "2024-01-01T17:00:00Z",
                "durationMinutes": minutes
            }))
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            error_message(&response),
            "durationMinutes must not exceed 527040"
        );
    }
    assert!(ctx.google.requests().is_empty());
}

#[tokio::test]
async fn test_list_events_applies_defaults() {
    let ctx = TestContext::new().await;
    ctx.google.ok(
        Method::GET,
        "/calendar/v3/calendars/primary/events",
        json!({
            "items": [{
                "id": "e1",
                "summary": "Standup",
                "start": {"dateTime": "2024-01-02T09:00:00Z"},
                "end": {"dateTime": "2024-01-02T09:15:00Z"}
            }],
            "nextPageToken": "page-2"
        }),
    );

    let response = ctx.get("/api/calendar/events").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["events"][0]["summary"], "Standup");
    assert_eq!(body["nextPageToken"], "page-2");

    let request = ctx
        .google
        .single_request(Method::GET, "/calendar/v3/calendars/primary/events");
    assert_eq!(request.query_param("maxResults").as_deref(), Some("50"));
    assert_eq!(request.query_param("singleEvents").as_deref(), Some("true"));
    assert_eq!(request.query_param("orderBy").as_deref(), Some("startTime"));
    assert!(request.query_param("timeMin").is_some());
}

#[tokio::test]
async fn test_list_calendars_returns_array() {
    let ctx = TestContext::new().await;
    ctx.google.ok(
        Method::GET,
        "/calendar/v3/users/me/calendarList",
        json!({"items": [{"id": "primary", "summary": "Me", "primary": true, "accessRole": "owner"}]}),
    );

    let response = ctx.get("/api/calendar/list").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body[0]["id"], "primary");
    assert_eq!(body[0]["accessRole"], "owner");
}

#[tokio::test]
async fn test_create_event_splits_calendar_from_event_body() {
    let ctx = TestContext::new().await;
    ctx.google.ok(
        Method::POST,
        "/calendar/v3/calendars/team@example.com/events",
        json!({
            "id": "new-1",
            "summary": "Planning",
            "start": {"dateTime": "2024-01-03T15:00:00Z"},
            "end": {"dateTime": "2024-01-03T16:00:00Z"}
        }),
    );

    let response = ctx
        .post("/api/calendar/events")
        .json(&json!({
            "calendarId": "team@example.com",
            "summary": "Planning",
            "start": {"dateTime": "2024-01-03T15:00:00Z"},
            "end": {"dateTime": "2024-01-03T16:00:00Z"},
            "attendees": [{"email": "ada@example.com"}]
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["id"], "new-1");

    let request = ctx.google.single_request(
        Method::POST,
        "/calendar/v3/calendars/team@example.com/events",
    );
    assert_eq!(request.query_param("conferenceDataVersion").as_deref(), Some("0"));
    let body = request.json();
    assert!(body.get("calendarId").is_none());
    assert_eq!(body["summary"], "Planning");
    assert_eq!(body["attendees"][0]["email"], "ada@example.com");
}

#[tokio::test]
async fn test_update_event_sends_only_named_fields() {
    let ctx = TestContext::new().await;
    ctx.google.ok(
        Method::PATCH,
        "/calendar/v3/calendars/primary/events/e1",
        json!({"id": "e1", "summary": "Renamed", "start": {}, "end": {}}),
    );

    let response = ctx
        .patch("/api/calendar/events/e1")
        .json(&json!({"summary": "Renamed"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let request = ctx
        .google
        .single_request(Method::PATCH, "/calendar/v3/calendars/primary/events/e1");
    assert_eq!(request.json(), json!({"summary": "Renamed"}));
}

#[tokio::test]
async fn test_get_and_delete_event_use_calendar_query() {
    let ctx = TestContext::new().await;
    ctx.google
        .ok(
            Method::GET,
            "/calendar/v3/calendars/work/events/e5",
            json!({"id": "e5", "summary": "Review", "start": {}, "end": {}}),
        )
        .ok(Method::DELETE, "/calendar/v3/calendars/work/events/e5", json!({}));

    let response = ctx
        .get("/api/calendar/events/e5")
        .add_query_param("calendarId", "work")
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["summary"], "Review");

    let response = ctx
        .delete("/api/calendar/events/e5")
        .add_query_param("calendarId", "work")
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>(), json!({"success": true}));
}

#[tokio::test]
async fn test_event_upstream_failure() {
    let ctx = TestContext::new().await;
    ctx.google.on(
        Method::GET,
        "/calendar/v3/calendars/primary/events/missing",
        StatusCode::NOT_FOUND,
        json!({"error": {"code": 404, "message": "Not Found"}}),
    );

    let response = ctx.get("/api/calendar/events/missing").await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_message(&response), "Failed to fetch event");
}
