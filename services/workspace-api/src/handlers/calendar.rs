use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::success;
use crate::auth::AccessToken;
use crate::error::{ApiError, UpstreamContext};
use crate::extract::{non_empty, JsonBody, QueryParams};
use crate::google::calendar::{
    CalendarEvent, CalendarListEntry, EventDraft, EventPage, FreeBusyQuery, ListEventsOptions,
    DEFAULT_SLOT_MINUTES, MAX_SLOT_MINUTES, PRIMARY_CALENDAR,
};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarParams {
    calendar_id: Option<String>,
}

impl CalendarParams {
    fn calendar_id(self) -> String {
        non_empty(self.calendar_id).unwrap_or_else(|| PRIMARY_CALENDAR.to_string())
    }
}

pub async fn list_calendars(
    State(state): State<AppState>,
    token: AccessToken,
) -> Result<Json<Vec<CalendarListEntry>>, ApiError> {
    let calendars = state
        .google
        .calendar()
        .list_calendars(&token)
        .await
        .or_upstream("Failed to fetch calendars")?;
    Ok(Json(calendars))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEventsParams {
    calendar_id: Option<String>,
    time_min: Option<String>,
    time_max: Option<String>,
    max_results: Option<u32>,
    page_token: Option<String>,
    q: Option<String>,
}

pub async fn list_events(
    State(state): State<AppState>,
    token: AccessToken,
    QueryParams(params): QueryParams<ListEventsParams>,
) -> Result<Json<EventPage>, ApiError> {
    let options = ListEventsOptions {
        calendar_id: non_empty(params.calendar_id),
        time_min: non_empty(params.time_min),
        time_max: non_empty(params.time_max),
        max_results: params.max_results,
        page_token: non_empty(params.page_token),
        query: non_empty(params.q),
    };

    let page = state
        .google
        .calendar()
        .list_events(&token, &options)
        .await
        .or_upstream("Failed to fetch calendar events")?;
    Ok(Json(page))
}

/// Event fields plus the routing bits that never reach Google's body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    calendar_id: Option<String>,
    conference_data_version: Option<u8>,
    #[serde(flatten)]
    event: EventDraft,
}

impl EventRequest {
    fn calendar_id(&self) -> String {
        non_empty(self.calendar_id.clone()).unwrap_or_else(|| PRIMARY_CALENDAR.to_string())
    }
}

pub async fn create_event(
    State(state): State<AppState>,
    token: AccessToken,
    JsonBody(request): JsonBody<EventRequest>,
) -> Result<Json<CalendarEvent>, ApiError> {
    let calendar_id = request.calendar_id();
    let event = state
        .google
        .calendar()
        .create_event(
            &token,
            &calendar_id,
            &request.event,
            request.conference_data_version.unwrap_or(0),
        )
        .await
        .or_upstream("Failed to create event")?;

    info!(event_id = %event.id, calendar_id = %calendar_id, "Event created");
    Ok(Json(event))
}

pub async fn get_event(
    State(state): State<AppState>,
    token: AccessToken,
    Path(event_id): Path<String>,
    QueryParams(params): QueryParams<CalendarParams>,
) -> Result<Json<CalendarEvent>, ApiError> {
    let event = state
        .google
        .calendar()
        .get_event(&token, &params.calendar_id(), &event_id)
        .await
        .or_upstream("Failed to fetch event")?;
    Ok(Json(event))
}

pub async fn update_event(
    State(state): State<AppState>,
    token: AccessToken,
    Path(event_id): Path<String>,
    JsonBody(request): JsonBody<EventRequest>,
) -> Result<Json<CalendarEvent>, ApiError> {
    let event = state
        .google
        .calendar()
        .update_event(&token, &request.calendar_id(), &event_id, &request.event)
        .await
        .or_upstream("Failed to update event")?;
    Ok(Json(event))
}

pub async fn delete_event(
    State(state): State<AppState>,
    token: AccessToken,
    Path(event_id): Path<String>,
    QueryParams(params): QueryParams<CalendarParams>,
) -> Result<Json<Value>, ApiError> {
    state
        .google
        .calendar()
        .delete_event(&token, &params.calendar_id(), &event_id)
        .await
        .or_upstream("Failed to delete event")?;
    Ok(success())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeBusyRequest {
    time_min: Option<String>,
    time_max: Option<String>,
    #[serde(default)]
    calendar_ids: Vec<String>,
    duration_minutes: Option<i64>,
}

fn parse_instant(value: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| ApiError::bad_request(format!("Invalid timestamp: {value}")))
}

pub async fn free_busy(
    State(state): State<AppState>,
    token: AccessToken,
    JsonBody(request): JsonBody<FreeBusyRequest>,
) -> Result<Json<Value>, ApiError> {
    let (Some(time_min), Some(time_max)) = (non_empty(request.time_min), non_empty(request.time_max))
    else {
        return Err(ApiError::bad_request("timeMin and timeMax are required"));
    };

    let duration_minutes = request
        .duration_minutes
        .filter(|m| *m > 0)
        .unwrap_or(DEFAULT_SLOT_MINUTES);
    let slot_length = Some(duration_minutes)
        .filter(|m| *m <= MAX_SLOT_MINUTES)
        .and_then(Duration::try_minutes)
        .ok_or_else(|| {
            ApiError::bad_request(format!("durationMinutes must not exceed {MAX_SLOT_MINUTES}"))
        })?;

    let query = FreeBusyQuery {
        time_min: parse_instant(&time_min)?,
        time_max: parse_instant(&time_max)?,
        calendar_ids: request.calendar_ids,
        slot_length,
    };

    let free_slots = state
        .google
        .calendar()
        .find_free_slots(&token, &query)
        .await
        .or_upstream("Failed to find free slots")?;

    Ok(Json(json!({ "freeSlots": free_slots })))
}
