//! Event types for imported calendar events.
//!
//! This module provides the canonical [`Event`] representation used across
//! the pipeline: fetched by a calendar source, tagged with its calendar id by
//! the aggregator, and rendered by the template engine.

use serde::{Deserialize, Serialize};

use crate::time::EventTime;

/// Minutes reported for `{duration}` when either event boundary is all-day.
pub const ALL_DAY_DURATION_MINUTES: i64 = 24 * 60;

/// Whether an event blocks time on the calendar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transparency {
    /// The event blocks time ("busy").
    #[default]
    Opaque,
    /// The event does not block time ("free").
    Transparent,
}

/// Event visibility as reported by the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Public,
}

/// The response status for an event attendee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// The attendee has accepted the invitation.
    Accepted,
    /// The attendee has declined the invitation.
    Declined,
    /// The attendee has tentatively accepted.
    Tentative,
    /// The attendee has not responded.
    NeedsAction,
    /// Unknown response status.
    #[default]
    Unknown,
}

/// A single event attendee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    /// The attendee's email address.
    pub email: String,
    /// Display name, when the calendar knows one.
    pub display_name: Option<String>,
    /// Whether this attendee is the authenticated caller.
    pub is_self: bool,
    /// The attendee's response to the invitation.
    pub response_status: ResponseStatus,
}

impl Attendee {
    /// Creates an attendee with just an email address.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Default::default()
        }
    }

    /// Builder method to set the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Builder method to mark this attendee as the caller.
    pub fn with_self(mut self, is_self: bool) -> Self {
        self.is_self = is_self;
        self
    }

    /// Builder method to set the response status.
    pub fn with_response_status(mut self, status: ResponseStatus) -> Self {
        self.response_status = status;
        self
    }

    /// The name used when rendering: display name when present, else email.
    pub fn render_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}

/// A calendar event as consumed by the template engine.
///
/// Immutable once fetched; lives for a single import run. `calendar_id` is
/// not part of the API payload — the aggregator tags each event with the id
/// of the calendar it came from before merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// The event title/summary.
    pub summary: String,
    /// The event description, if any.
    pub description: Option<String>,
    /// The event location, if any.
    pub location: Option<String>,
    /// URL to view this event in the calendar UI.
    pub html_link: Option<String>,
    /// URL to the attached video meeting, if any.
    pub hangout_link: Option<String>,
    /// Whether the event blocks time.
    pub transparency: Transparency,
    /// Event visibility, when the calendar reports one.
    pub visibility: Option<Visibility>,
    /// When the event starts.
    pub start: EventTime,
    /// When the event ends.
    pub end: EventTime,
    /// Attendees in the order the calendar reported them.
    pub attendees: Vec<Attendee>,
    /// The calendar this event was fetched from (tagged by the aggregator).
    pub calendar_id: String,
}

impl Event {
    /// Creates a new event with required fields.
    pub fn new(summary: impl Into<String>, start: EventTime, end: EventTime) -> Self {
        Self {
            summary: summary.into(),
            description: None,
            location: None,
            html_link: None,
            hangout_link: None,
            transparency: Transparency::Opaque,
            visibility: None,
            start,
            end,
            attendees: Vec::new(),
            calendar_id: String::new(),
        }
    }

    /// Returns `true` if either boundary is all-day.
    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day() || self.end.is_all_day()
    }

    /// Returns the event duration in minutes.
    ///
    /// Defaults to 24 hours when either boundary lacks an instant.
    pub fn duration_minutes(&self) -> i64 {
        match (self.start.as_datetime(), self.end.as_datetime()) {
            (Some(start), Some(end)) => (*end - *start).num_minutes(),
            _ => ALL_DAY_DURATION_MINUTES,
        }
    }

    /// Returns `true` if the caller appears as an attendee who declined.
    pub fn declined_by_self(&self) -> bool {
        self.attendees
            .iter()
            .any(|a| a.is_self && a.response_status == ResponseStatus::Declined)
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Builder method to set the calendar event URL.
    pub fn with_html_link(mut self, link: impl Into<String>) -> Self {
        self.html_link = Some(link.into());
        self
    }

    /// Builder method to set the meeting URL.
    pub fn with_hangout_link(mut self, link: impl Into<String>) -> Self {
        self.hangout_link = Some(link.into());
        self
    }

    /// Builder method to set the transparency.
    pub fn with_transparency(mut self, transparency: Transparency) -> Self {
        self.transparency = transparency;
        self
    }

    /// Builder method to set the visibility.
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Builder method to add an attendee.
    pub fn with_attendee(mut self, attendee: Attendee) -> Self {
        self.attendees.push(attendee);
        self
    }

    /// Builder method to set the calendar id tag.
    pub fn with_calendar_id(mut self, id: impl Into<String>) -> Self {
        self.calendar_id = id.into();
        self
    }
}
