//! Calendar API client.
//!
//! This module provides a low-level HTTP client for the calendar events API,
//! handling request building, response parsing, and error mapping. The base
//! URL is injectable so tests can point the client at a loopback server.

use std::time::Duration;

use calimport_core::{Attendee, Event, EventTime, ResponseStatus, TimeWindow, Transparency, Visibility};
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};

/// Base URL for the Google Calendar API v3.
pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Calendar events API client.
///
/// The client is stateless with respect to authentication: callers pass the
/// access token per request, so one client serves every account.
#[derive(Debug, Clone)]
pub struct CalendarClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl Default for CalendarClient {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl CalendarClient {
    /// Creates a client against the production API with the given timeout.
    pub fn new(timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");

        Self {
            http_client,
            base_url: CALENDAR_API_BASE.to_string(),
        }
    }

    /// Overrides the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Lists events from a calendar within a time window.
    ///
    /// Recurring events are expanded into single instances and results are
    /// ordered by start time.
    pub async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        window: &TimeWindow,
    ) -> ProviderResult<Vec<Event>> {
        let url = format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        );

        let request = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", window.start.to_rfc3339()),
                ("timeMax", window.end.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ]);

        let body = self.execute(request).await?;
        let list: EventListResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse event list: {}", e))
        })?;

        let events: Vec<Event> = list.items.into_iter().filter_map(convert_event).collect();
        debug!("fetched {} events from calendar {}", events.len(), calendar_id);
        Ok(events)
    }

    /// Fetches a single event by id.
    pub async fn get_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> ProviderResult<Event> {
        let url = format!(
            "{}/calendars/{}/events/{}",
            self.base_url,
            urlencoding::encode(calendar_id),
            urlencoding::encode(event_id)
        );

        let request = self.http_client.get(&url).bearer_auth(access_token);
        let body = self.execute(request).await?;
        let api_event: ApiEvent = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse event: {}", e))
        })?;

        convert_event(api_event)
            .ok_or_else(|| ProviderError::invalid_response("event payload is unusable"))
    }

    /// Creates an event on a calendar.
    pub async fn create_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        draft: &EventDraft,
    ) -> ProviderResult<Event> {
        let url = format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        );

        let request = self
            .http_client
            .post(&url)
            .bearer_auth(access_token)
            .json(&draft.to_body());

        let body = self.execute(request).await?;
        let api_event: ApiEvent = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse created event: {}", e))
        })?;

        convert_event(api_event)
            .ok_or_else(|| ProviderError::invalid_response("created event payload is unusable"))
    }

    /// Updates an existing event.
    pub async fn update_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
        draft: &EventDraft,
    ) -> ProviderResult<Event> {
        let url = format!(
            "{}/calendars/{}/events/{}",
            self.base_url,
            urlencoding::encode(calendar_id),
            urlencoding::encode(event_id)
        );

        let request = self
            .http_client
            .put(&url)
            .bearer_auth(access_token)
            .json(&draft.to_body());

        let body = self.execute(request).await?;
        let api_event: ApiEvent = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse updated event: {}", e))
        })?;

        convert_event(api_event)
            .ok_or_else(|| ProviderError::invalid_response("updated event payload is unusable"))
    }

    /// Sends a request and maps transport and status errors.
    async fn execute(&self, request: reqwest::RequestBuilder) -> ProviderResult<String> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::network("request timeout")
            } else if e.is_connect() {
                ProviderError::network(format!("connection failed: {}", e))
            } else {
                ProviderError::network(format!("request failed: {}", e))
            }
        })?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::authentication(
                "access token expired or invalid",
            ));
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::not_found("calendar or event not found"));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = parse_error_message(&body)
                .unwrap_or_else(|| format!("API error ({}): {}", status, body));
            return Err(ProviderError::server(message));
        }

        response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))
    }
}

/// The writable fields of an event, used for create and update.
#[derive(Debug, Clone)]
pub struct EventDraft {
    /// The event title.
    pub summary: String,
    /// Description text.
    pub description: String,
    /// Location text.
    pub location: String,
    /// When the event starts.
    pub start: DateTime<FixedOffset>,
    /// When the event ends.
    pub end: DateTime<FixedOffset>,
}

impl EventDraft {
    /// Creates a draft with required fields.
    pub fn new(
        summary: impl Into<String>,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            summary: summary.into(),
            description: String::new(),
            location: String::new(),
            start,
            end,
        }
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// The JSON request body for create/update calls.
    fn to_body(&self) -> serde_json::Value {
        serde_json::json!({
            "summary": self.summary,
            "description": self.description,
            "location": self.location,
            "start": { "dateTime": self.start.to_rfc3339() },
            "end": { "dateTime": self.end.to_rfc3339() },
        })
    }
}

/// Converts an API event to the canonical form.
///
/// Cancelled events and events with unparseable times are dropped.
fn convert_event(api: ApiEvent) -> Option<Event> {
    if api.status.as_deref() == Some("cancelled") {
        return None;
    }

    let start = convert_time(api.start.as_ref())?;
    let end = convert_time(api.end.as_ref())?;

    let transparency = match api.transparency.as_deref() {
        Some("transparent") => Transparency::Transparent,
        _ => Transparency::Opaque,
    };
    let visibility = match api.visibility.as_deref() {
        Some("private") | Some("confidential") => Some(Visibility::Private),
        Some("public") => Some(Visibility::Public),
        _ => None,
    };

    let attendees = api
        .attendees
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| {
            let email = a.email?;
            let status = match a.response_status.as_deref() {
                Some("accepted") => ResponseStatus::Accepted,
                Some("declined") => ResponseStatus::Declined,
                Some("tentative") => ResponseStatus::Tentative,
                Some("needsAction") => ResponseStatus::NeedsAction,
                _ => ResponseStatus::Unknown,
            };
            let mut attendee = Attendee::new(email)
                .with_self(a.is_self.unwrap_or(false))
                .with_response_status(status);
            if let Some(name) = a.display_name {
                attendee = attendee.with_display_name(name);
            }
            Some(attendee)
        })
        .collect::<Vec<_>>();

    let mut event = Event::new(api.summary.unwrap_or_default(), start, end)
        .with_transparency(transparency);
    if let Some(visibility) = visibility {
        event = event.with_visibility(visibility);
    }
    if let Some(description) = api.description {
        event = event.with_description(description);
    }
    if let Some(location) = api.location {
        event = event.with_location(location);
    }
    if let Some(link) = api.html_link {
        event = event.with_html_link(link);
    }
    if let Some(link) = api.hangout_link {
        event = event.with_hangout_link(link);
    }
    for attendee in attendees {
        event = event.with_attendee(attendee);
    }

    Some(event)
}

/// Missing time payloads are all-day boundaries; unparseable instants drop
/// the event.
fn convert_time(time: Option<&ApiEventTime>) -> Option<EventTime> {
    match time.and_then(|t| t.date_time.as_deref()) {
        Some(dt) => match EventTime::from_rfc3339(dt) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("failed to parse event time {:?}: {}", dt, e);
                None
            }
        },
        None => Some(EventTime::AllDay),
    }
}

/// Extracts the message from a structured API error body.
fn parse_error_message(body: &str) -> Option<String> {
    let parsed: ApiErrorBody = serde_json::from_str(body).ok()?;
    parsed.error?.message
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
}

/// A single event from the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    html_link: Option<String>,
    hangout_link: Option<String>,
    transparency: Option<String>,
    visibility: Option<String>,
    status: Option<String>,
    start: Option<ApiEventTime>,
    end: Option<ApiEventTime>,
    attendees: Option<Vec<ApiAttendee>>,
}

/// Event time from the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date_time: Option<String>,
}

/// Attendee from the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiAttendee {
    email: Option<String>,
    display_name: Option<String>,
    #[serde(rename = "self")]
    is_self: Option<bool>,
    response_status: Option<String>,
}

/// Structured error body from the API.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}
