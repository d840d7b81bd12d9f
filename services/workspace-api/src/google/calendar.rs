use chrono::{DateTime, Duration, Local, SecondsFormat, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, warn};

use super::{GoogleClient, Result};
use crate::auth::AccessToken;
use crate::freebusy::{self, Interval, TimeSlot};

pub const PRIMARY_CALENDAR: &str = "primary";
const DEFAULT_MAX_EVENTS: u32 = 50;
pub const DEFAULT_SLOT_MINUTES: i64 = 30;
/// A slot can span at most one leap year.
pub const MAX_SLOT_MINUTES: i64 = 60 * 24 * 366;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListEntry {
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub primary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
}

/// Either an all-day `date` or a `dateTime` with an optional zone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    #[serde(default)]
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conference_id: Option<String>,
    #[serde(default)]
    pub entry_points: Vec<EntryPoint>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPoint {
    #[serde(default)]
    pub entry_point_type: String,
    #[serde(default)]
    pub uri: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub start: EventTime,
    #[serde(default)]
    pub end: EventTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<Attendee>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conference_data: Option<ConferenceData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring_event_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsResponse {
    #[serde(default)]
    items: Vec<CalendarEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPage {
    pub events: Vec<CalendarEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Fields accepted when creating or patching an event. Absent fields are
/// left out of the request body, so a patch only touches what it names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<EventTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<EventTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<Attendee>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conference_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default)]
pub struct ListEventsOptions {
    pub calendar_id: Option<String>,
    pub time_min: Option<String>,
    pub time_max: Option<String>,
    pub max_results: Option<u32>,
    pub page_token: Option<String>,
    pub query: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FreeBusyQuery {
    pub time_min: DateTime<Utc>,
    pub time_max: DateTime<Utc>,
    pub calendar_ids: Vec<String>,
    pub slot_length: Duration,
}

#[derive(Debug, Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: HashMap<String, CalendarBusy>,
}

#[derive(Debug, Deserialize)]
struct CalendarBusy {
    #[serde(default)]
    busy: Vec<BusyBlock>,
}

#[derive(Debug, Deserialize)]
struct BusyBlock {
    start: String,
    end: String,
}

impl BusyBlock {
    fn to_interval(&self) -> Option<Interval> {
        let start = DateTime::parse_from_rfc3339(&self.start).ok()?;
        let end = DateTime::parse_from_rfc3339(&self.end).ok()?;
        Some(Interval {
            start: start.with_timezone(&Utc),
            end: end.with_timezone(&Utc),
        })
    }
}

/// Local midnight of the current day, as an RFC 3339 timestamp.
fn start_of_today() -> String {
    let now = Local::now();
    let midnight = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| naive.and_local_timezone(Local).earliest())
        .unwrap_or(now);
    midnight.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub struct CalendarApi<'a> {
    google: &'a GoogleClient,
}

impl<'a> CalendarApi<'a> {
    pub(super) fn new(google: &'a GoogleClient) -> Self {
        Self { google }
    }

    fn url(&self, segments: &[&str]) -> Result<url::Url> {
        self.google.url(&self.google.endpoints().calendar, segments)
    }

    pub async fn list_calendars(&self, token: &AccessToken) -> Result<Vec<CalendarListEntry>> {
        let request = self
            .google
            .request(Method::GET, self.url(&["users", "me", "calendarList"])?);
        let response: CalendarListResponse = self.google.fetch_json(token, request).await?;
        Ok(response.items)
    }

    pub async fn list_events(
        &self,
        token: &AccessToken,
        options: &ListEventsOptions,
    ) -> Result<EventPage> {
        let calendar_id = options.calendar_id.as_deref().unwrap_or(PRIMARY_CALENDAR);

        let mut params = vec![
            (
                "timeMin",
                options.time_min.clone().unwrap_or_else(start_of_today),
            ),
            (
                "maxResults",
                options.max_results.unwrap_or(DEFAULT_MAX_EVENTS).to_string(),
            ),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ];
        if let Some(time_max) = &options.time_max {
            params.push(("timeMax", time_max.clone()));
        }
        if let Some(page_token) = &options.page_token {
            params.push(("pageToken", page_token.clone()));
        }
        if let Some(query) = options.query.as_ref().filter(|q| !q.is_empty()) {
            params.push(("q", query.clone()));
        }

        let request = self
            .google
            .request(Method::GET, self.url(&["calendars", calendar_id, "events"])?)
            .query(&params);
        let response: EventsResponse = self.google.fetch_json(token, request).await?;

        Ok(EventPage {
            events: response.items,
            next_page_token: response.next_page_token,
        })
    }

    pub async fn get_event(
        &self,
        token: &AccessToken,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<CalendarEvent> {
        let request = self.google.request(
            Method::GET,
            self.url(&["calendars", calendar_id, "events", event_id])?,
        );
        self.google.fetch_json(token, request).await
    }

    pub async fn create_event(
        &self,
        token: &AccessToken,
        calendar_id: &str,
        event: &EventDraft,
        conference_data_version: u8,
    ) -> Result<CalendarEvent> {
        let request = self
            .google
            .request(Method::POST, self.url(&["calendars", calendar_id, "events"])?)
            .query(&[("conferenceDataVersion", conference_data_version.to_string())])
            .json(event);
        self.google.fetch_json(token, request).await
    }

    pub async fn update_event(
        &self,
        token: &AccessToken,
        calendar_id: &str,
        event_id: &str,
        patch: &EventDraft,
    ) -> Result<CalendarEvent> {
        let request = self
            .google
            .request(
                Method::PATCH,
                self.url(&["calendars", calendar_id, "events", event_id])?,
            )
            .json(patch);
        self.google.fetch_json(token, request).await
    }

    pub async fn delete_event(
        &self,
        token: &AccessToken,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<()> {
        let request = self.google.request(
            Method::DELETE,
            self.url(&["calendars", calendar_id, "events", event_id])?,
        );
        self.google.fetch_empty(token, request).await
    }

    /// Queries busy time for every requested calendar and returns the gaps
    /// of at least `slot_length` inside the window.
    pub async fn find_free_slots(
        &self,
        token: &AccessToken,
        query: &FreeBusyQuery,
    ) -> Result<Vec<TimeSlot>> {
        let calendar_ids: Vec<&str> = if query.calendar_ids.is_empty() {
            vec![PRIMARY_CALENDAR]
        } else {
            query.calendar_ids.iter().map(String::as_str).collect()
        };

        let body = json!({
            "timeMin": query.time_min.to_rfc3339_opts(SecondsFormat::Millis, true),
            "timeMax": query.time_max.to_rfc3339_opts(SecondsFormat::Millis, true),
            "items": calendar_ids.iter().map(|id| json!({ "id": id })).collect::<Vec<_>>(),
        });

        let request = self
            .google
            .request(Method::POST, self.url(&["freeBusy"])?)
            .json(&body);
        let response: FreeBusyResponse = self.google.fetch_json(token, request).await?;

        let mut busy = Vec::new();
        for calendar_id in &calendar_ids {
            let Some(calendar) = response.calendars.get(*calendar_id) else {
                continue;
            };
            for block in &calendar.busy {
                match block.to_interval() {
                    Some(interval) => busy.push(interval),
                    None => warn!(
                        "Ignoring unparseable busy block {} - {} on calendar {}",
                        block.start, block.end, calendar_id
                    ),
                }
            }
        }
        debug!("Collected {} busy blocks", busy.len());

        Ok(freebusy::find_free_slots(
            query.time_min,
            query.time_max,
            query.slot_length,
            &busy,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_parses_all_day_and_timed() {
        let event: CalendarEvent = serde_json::from_value(json!({
            "id": "e1",
            "summary": "Offsite",
            "start": {"date": "2024-03-01"},
            "end": {"dateTime": "2024-03-02T10:00:00-05:00", "timeZone": "America/New_York"},
            "attendees": [{"email": "a@example.com", "responseStatus": "accepted"}],
            "conferenceData": {"entryPoints": [{"entryPointType": "video", "uri": "https://meet"}]}
        }))
        .unwrap();

        assert_eq!(event.start.date.as_deref(), Some("2024-03-01"));
        assert!(event.start.date_time.is_none());
        assert_eq!(event.end.time_zone.as_deref(), Some("America/New_York"));
        assert_eq!(event.conference_data.unwrap().entry_points[0].uri, "https://meet");
    }

    #[test]
    fn test_draft_omits_absent_fields() {
        let draft = EventDraft {
            summary: Some("Renamed".to_string()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&draft).unwrap(), json!({"summary": "Renamed"}));
    }

    #[test]
    fn test_busy_block_parsing() {
        let block = BusyBlock {
            start: "2024-01-01T10:00:00Z".to_string(),
            end: "2024-01-01T06:30:00-04:00".to_string(),
        };
        let interval = block.to_interval().unwrap();
        assert_eq!(interval.end - interval.start, Duration::minutes(30));

        let broken = BusyBlock {
            start: "soon".to_string(),
            end: "later".to_string(),
        };
        assert!(broken.to_interval().is_none());
    }

    #[test]
    fn test_start_of_today_is_rfc3339() {
        let value = start_of_today();
        assert!(DateTime::parse_from_rfc3339(&value).is_ok());
    }
}
