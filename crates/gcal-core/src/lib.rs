//! Core types: time parsing, the Calendar API event model, formatting

pub mod event;
pub mod format;
pub mod time;
pub mod tracing;

pub use event::{Attendee, CalendarListEntry, Event, EventDateTime, ResponseStatus};
pub use format::{bulletize, OutputFormat, OutputFormatter};
pub use time::{parse_timestamp, parse_timestamp_in, EventTime, TimeError, TimeWindow};
pub use tracing::{init_tracing, TracingConfig, TracingError, TracingOutputFormat};
