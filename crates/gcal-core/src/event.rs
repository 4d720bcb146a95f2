//! Calendar API wire types.
//!
//! These mirror the Google Calendar v3 JSON resources closely enough to
//! render them and to build request bodies:
//! - [`Event`]: an event resource, with unknown fields kept in `extra`
//! - [`EventDateTime`]: the `start`/`end` objects (`dateTime` or all-day `date`)
//! - [`Attendee`]: one entry of `attendees`
//! - [`CalendarListEntry`]: one calendar from `calendarList.list`
//!
//! Optional fields are skipped when absent so that an [`Event`] with only a
//! few fields set serializes to a minimal PATCH body.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::time::EventTime;

/// Title shown for events without a summary.
pub const UNTITLED: &str = "(no title)";

/// The response status for an event attendee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseStatus {
    /// The attendee has accepted the invitation.
    Accepted,
    /// The attendee has declined the invitation.
    Declined,
    /// The attendee has tentatively accepted.
    Tentative,
    /// The attendee has not responded.
    #[default]
    NeedsAction,
}

impl ResponseStatus {
    /// Returns the label used in human-readable output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Tentative => "tentative",
            Self::NeedsAction => "needs action",
        }
    }
}

/// Start or end of an event.
///
/// Exactly one of `date_time` and `date` is set by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    /// RFC 3339 timestamp for timed events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    /// `YYYY-MM-DD` for all-day events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// IANA time zone name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventDateTime {
    /// Creates a timed value from a parsed timestamp.
    pub fn at<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        Self {
            date_time: Some(dt.fixed_offset().to_rfc3339()),
            ..Default::default()
        }
    }

    /// Creates an all-day value.
    pub fn all_day(date: NaiveDate) -> Self {
        Self {
            date: Some(date.format("%Y-%m-%d").to_string()),
            ..Default::default()
        }
    }

    /// Sets the time zone sent alongside the timestamp.
    #[must_use]
    pub fn with_time_zone(mut self, tz: Option<impl Into<String>>) -> Self {
        self.time_zone = tz.map(Into::into);
        self
    }

    /// Interprets the value, returning `None` when neither field parses.
    pub fn event_time(&self) -> Option<EventTime> {
        if let Some(dt) = self.date_time.as_deref() {
            return DateTime::parse_from_rfc3339(dt)
                .ok()
                .map(|dt: DateTime<FixedOffset>| EventTime::DateTime(dt.with_timezone(&Utc)));
        }
        self.date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .map(EventTime::AllDay)
    }
}

/// An event attendee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    /// Attendee e-mail address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status: Option<ResponseStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<bool>,
    /// Whether this entry is the authenticated user.
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub is_self: Option<bool>,
}

impl Attendee {
    /// Creates an attendee from an e-mail address.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Default::default()
        }
    }
}

/// A calendar event resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Event title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    /// Google Meet URL, present when the event has a Meet conference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hangout_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventDateTime>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,
    /// Conference data, sent verbatim when requesting a Meet link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conference_data: Option<Value>,

    /// Calendar this event was read from. Not part of the API resource.
    #[serde(skip)]
    pub calendar_id: Option<String>,

    /// Every other field returned by the API.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Event {
    /// Creates an event with only a title.
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: Some(summary.into()),
            ..Default::default()
        }
    }

    /// Returns the title, or [`UNTITLED`].
    pub fn title(&self) -> &str {
        self.summary
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(UNTITLED)
    }

    /// Returns the parsed start time.
    pub fn start_time(&self) -> Option<EventTime> {
        self.start.as_ref().and_then(EventDateTime::event_time)
    }

    /// Returns the parsed end time.
    pub fn end_time(&self) -> Option<EventTime> {
        self.end.as_ref().and_then(EventDateTime::event_time)
    }

    /// Returns `true` if the event spans whole days.
    pub fn is_all_day(&self) -> bool {
        self.start_time().is_some_and(|t| t.is_all_day())
    }

    /// Returns `true` if no field other than `calendar_id` is set.
    pub fn is_empty(&self) -> bool {
        let mut bare = Self::default();
        bare.calendar_id = self.calendar_id.clone();
        *self == bare
    }

    #[must_use]
    pub fn with_start(mut self, start: EventDateTime) -> Self {
        self.start = Some(start);
        self
    }

    #[must_use]
    pub fn with_end(mut self, end: EventDateTime) -> Self {
        self.end = Some(end);
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn with_attendees<I, S>(mut self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attendees = emails.into_iter().map(Attendee::new).collect();
        self
    }

    /// Requests a Google Meet conference on creation.
    ///
    /// The request id must be unique per create call.
    #[must_use]
    pub fn with_meet_request(mut self, request_id: impl Into<String>) -> Self {
        self.conference_data = Some(serde_json::json!({
            "createRequest": {
                "requestId": request_id.into(),
                "conferenceSolutionKey": { "type": "hangoutsMeet" }
            }
        }));
        self
    }

    #[must_use]
    pub fn with_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = Some(calendar_id.into());
        self
    }
}

/// A calendar from the user's calendar list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListEntry {
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreground_color: Option<String>,
}
