//! Output formatting for calendar events.
//!
//! Commands print either human-readable text produced by [`OutputFormatter`]
//! or the raw API JSON, selected by [`OutputFormat`].
//!
//! # Example
//!
//! ```rust
//! use gcal_core::format::OutputFormatter;
//! use gcal_core::event::Event;
//! use chrono::Utc;
//!
//! let formatter = OutputFormatter::new(Utc);
//! let text = formatter.event_list(&[Event::new("Standup")], "No upcoming events.");
//! assert!(text.starts_with("Standup"));
//! ```

use std::collections::BTreeMap;
use std::fmt::Display;

use chrono::{NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::event::{CalendarListEntry, Event};
use crate::time::EventTime;

/// Width of the time column in agenda output (`HH:MM-HH:MM`).
const CLOCK_WIDTH: usize = 11;

/// How command results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// The API's JSON representation.
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format '{}' (expected text or json)", other)),
        }
    }
}

/// Renders events and calendars as text, showing times in a fixed zone.
#[derive(Debug, Clone)]
pub struct OutputFormatter<Tz: TimeZone> {
    tz: Tz,
}

impl<Tz> OutputFormatter<Tz>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    /// Creates a formatter that displays times in `tz`.
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Formats a start or end time as `YYYY-MM-DD HH:MM`, or
    /// `YYYY-MM-DD (all day)`.
    pub fn format_time(&self, time: &EventTime) -> String {
        match time {
            EventTime::DateTime(dt) => dt
                .with_timezone(&self.tz)
                .format("%Y-%m-%d %H:%M")
                .to_string(),
            EventTime::AllDay(date) => format!("{} (all day)", date.format("%Y-%m-%d")),
        }
    }

    fn clock(&self, time: &EventTime) -> String {
        match time {
            EventTime::DateTime(dt) => dt.with_timezone(&self.tz).format("%H:%M").to_string(),
            EventTime::AllDay(_) => "all day".to_string(),
        }
    }

    fn time_range(&self, event: &Event) -> String {
        match (event.start_time(), event.end_time()) {
            (Some(start @ EventTime::DateTime(_)), Some(end @ EventTime::DateTime(_))) => {
                format!("{}-{}", self.clock(&start), self.clock(&end))
            }
            (Some(start), _) => self.clock(&start),
            (None, _) => "?".to_string(),
        }
    }

    fn agenda_line(&self, event: &Event) -> String {
        format!(
            "{:<width$}  {}",
            self.time_range(event),
            event.title(),
            width = CLOCK_WIDTH
        )
    }

    /// Renders events as blocks of title, id, start and location.
    ///
    /// Returns `empty` when there are no events.
    pub fn event_list(&self, events: &[Event], empty: &str) -> String {
        if events.is_empty() {
            return empty.to_string();
        }

        events
            .iter()
            .map(|event| {
                let mut block = event.title().to_string();
                push_field(&mut block, "  ID", event.id.as_deref());
                push_field(
                    &mut block,
                    "  Start",
                    event.start_time().map(|t| self.format_time(&t)).as_deref(),
                );
                push_field(&mut block, "  Location", event.location.as_deref());
                block
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Renders every known field of a single event.
    pub fn event_detail(&self, event: &Event) -> String {
        let mut out = format!("Title: {}", event.title());
        push_field(&mut out, "ID", event.id.as_deref());
        push_field(&mut out, "Calendar", event.calendar_id.as_deref());
        push_field(
            &mut out,
            "Start",
            event.start_time().map(|t| self.format_time(&t)).as_deref(),
        );
        push_field(
            &mut out,
            "End",
            event.end_time().map(|t| self.format_time(&t)).as_deref(),
        );
        push_field(&mut out, "Status", event.status.as_deref());
        push_field(&mut out, "Location", event.location.as_deref());
        push_field(&mut out, "Description", event.description.as_deref());

        if !event.attendees.is_empty() {
            let attendees: Vec<String> = event
                .attendees
                .iter()
                .map(|a| {
                    let name = a
                        .display_name
                        .as_deref()
                        .or(a.email.as_deref())
                        .unwrap_or("unknown");
                    match a.response_status {
                        Some(status) => format!("{} ({})", name, status.as_str()),
                        None => name.to_string(),
                    }
                })
                .collect();
            out.push_str("\nAttendees:\n");
            out.push_str(&bulletize(&attendees));
        }

        push_field(&mut out, "Meet", event.hangout_link.as_deref());
        push_field(&mut out, "Link", event.html_link.as_deref());
        out
    }

    /// Renders one line per event: time range and title.
    pub fn agenda(&self, events: &[Event], empty: &str) -> String {
        if events.is_empty() {
            return empty.to_string();
        }
        events
            .iter()
            .map(|e| self.agenda_line(e))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Renders events grouped under a heading per local day, in date order.
    ///
    /// Events without a parseable start are left out.
    pub fn week(&self, events: &[Event], empty: &str) -> String {
        let mut days: BTreeMap<NaiveDate, Vec<&Event>> = BTreeMap::new();
        for event in events {
            if let Some(start) = event.start_time() {
                days.entry(start.date_in(&self.tz)).or_default().push(event);
            }
        }

        if days.is_empty() {
            return empty.to_string();
        }

        days.iter()
            .map(|(day, events)| {
                let mut section = day.format("%A, %B %-d").to_string();
                for event in events {
                    section.push_str("\n  ");
                    section.push_str(&self.agenda_line(event));
                }
                section
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Renders the calendar list.
    pub fn calendars(&self, entries: &[CalendarListEntry], empty: &str) -> String {
        if entries.is_empty() {
            return empty.to_string();
        }
        entries
            .iter()
            .map(|c| {
                let name = if c.summary.is_empty() { &c.id } else { &c.summary };
                let mut block = if c.primary {
                    format!("• {} (primary)", name)
                } else {
                    format!("• {}", name)
                };
                push_field(&mut block, "  ID", Some(&c.id));
                push_field(&mut block, "  Time zone", c.time_zone.as_deref());
                push_field(&mut block, "  Access", c.access_role.as_deref());
                block
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn push_field(out: &mut String, label: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        out.push('\n');
        out.push_str(label);
        out.push_str(": ");
        out.push_str(value);
    }
}

/// Creates bullet points from a list of items.
pub fn bulletize(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("• {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Attendee, EventDateTime, ResponseStatus};
    use chrono::{FixedOffset, Utc};

    fn timed(id: &str, title: &str, start: &str, end: &str) -> Event {
        let mut event = Event::new(title)
            .with_start(EventDateTime {
                date_time: Some(start.to_string()),
                ..Default::default()
            })
            .with_end(EventDateTime {
                date_time: Some(end.to_string()),
                ..Default::default()
            });
        event.id = Some(id.to_string());
        event
    }

    fn all_day(id: &str, title: &str, date: &str) -> Event {
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        let mut event = Event::new(title)
            .with_start(EventDateTime::all_day(day))
            .with_end(EventDateTime::all_day(day.succ_opt().unwrap()));
        event.id = Some(id.to_string());
        event
    }

    mod output_format {
        use super::*;

        #[test]
        fn default_is_text() {
            assert_eq!(OutputFormat::default(), OutputFormat::Text);
        }

        #[test]
        fn parse() {
            assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
            assert_eq!(" text".parse::<OutputFormat>(), Ok(OutputFormat::Text));
            assert!("yaml".parse::<OutputFormat>().is_err());
        }
    }

    #[test]
    fn format_time_in_zone() {
        let formatter = OutputFormatter::new(FixedOffset::east_opt(2 * 3600).unwrap());
        let t = EventTime::DateTime(Utc.with_ymd_and_hms(2024, 3, 15, 23, 0, 0).unwrap());
        assert_eq!(formatter.format_time(&t), "2024-03-16 01:00");
    }

    #[test]
    fn event_list() {
        let formatter = OutputFormatter::new(Utc);
        let events = vec![
            timed("evt1", "Standup", "2024-03-15T09:00:00Z", "2024-03-15T09:15:00Z")
                .with_location("Room 4"),
            all_day("hol", "Holiday", "2024-12-25"),
        ];

        insta::assert_snapshot!(formatter.event_list(&events, "No upcoming events."), @r"
        Standup
          ID: evt1
          Start: 2024-03-15 09:00
          Location: Room 4

        Holiday
          ID: hol
          Start: 2024-12-25 (all day)
        ");
    }

    #[test]
    fn empty_list_uses_placeholder() {
        let formatter = OutputFormatter::new(Utc);
        assert_eq!(formatter.event_list(&[], "No upcoming events."), "No upcoming events.");
        assert_eq!(formatter.week(&[], "Nothing."), "Nothing.");
    }

    #[test]
    fn event_detail() {
        let formatter = OutputFormatter::new(Utc);
        let mut event = timed("evt1", "Review", "2024-03-15T14:00:00Z", "2024-03-15T15:00:00Z")
            .with_description("Quarterly numbers")
            .with_calendar_id("primary");
        event.status = Some("confirmed".into());
        event.html_link = Some("https://calendar.google.com/event?eid=1".into());
        event.attendees = vec![
            Attendee {
                response_status: Some(ResponseStatus::Accepted),
                ..Attendee::new("ann@example.com")
            },
            Attendee::new("bob@example.com"),
        ];

        insta::assert_snapshot!(formatter.event_detail(&event), @r"
        Title: Review
        ID: evt1
        Calendar: primary
        Start: 2024-03-15 14:00
        End: 2024-03-15 15:00
        Status: confirmed
        Description: Quarterly numbers
        Attendees:
        • ann@example.com (accepted)
        • bob@example.com
        Link: https://calendar.google.com/event?eid=1
        ");
    }

    #[test]
    fn agenda() {
        let formatter = OutputFormatter::new(Utc);
        let events = vec![
            all_day("hol", "Holiday", "2024-03-15"),
            timed("a", "Standup", "2024-03-15T09:00:00Z", "2024-03-15T09:15:00Z"),
        ];

        insta::assert_snapshot!(formatter.agenda(&events, "No events today."), @r"
        all day      Holiday
        09:00-09:15  Standup
        ");
    }

    #[test]
    fn week_groups_by_day() {
        let formatter = OutputFormatter::new(Utc);
        let events = vec![
            timed("a", "Standup", "2024-03-11T09:00:00Z", "2024-03-11T09:15:00Z"),
            timed("b", "Planning", "2024-03-11T13:00:00Z", "2024-03-11T14:00:00Z"),
            all_day("c", "Offsite", "2024-03-13"),
        ];

        insta::assert_snapshot!(formatter.week(&events, "No events this week."), @r"
        Monday, March 11
          09:00-09:15  Standup
          13:00-14:00  Planning

        Wednesday, March 13
          all day      Offsite
        ");
    }

    #[test]
    fn calendars() {
        let formatter = OutputFormatter::new(Utc);
        let entries = vec![
            CalendarListEntry {
                id: "me@example.com".into(),
                summary: "Personal".into(),
                primary: true,
                time_zone: Some("Europe/Paris".into()),
                ..Default::default()
            },
            CalendarListEntry {
                id: "team@group.calendar.google.com".into(),
                access_role: Some("reader".into()),
                ..Default::default()
            },
        ];

        insta::assert_snapshot!(formatter.calendars(&entries, "No calendars."), @r"
        • Personal (primary)
          ID: me@example.com
          Time zone: Europe/Paris
        • team@group.calendar.google.com
          ID: team@group.calendar.google.com
          Access: reader
        ");
    }

    #[test]
    fn bulletize_items() {
        assert_eq!(bulletize(&[]), "");
        assert_eq!(bulletize(&["a".into(), "b".into()]), "• a\n• b");
    }
}
