//! Event commands: list, get, create, update, delete, today, week, search,
//! quick-add.

use chrono::{DateTime, Duration, FixedOffset, Local, TimeZone};
use tracing::debug;

use gcal_core::event::{Event, EventDateTime};
use gcal_core::{TimeWindow, parse_timestamp_in};
use gcal_google::EventQuery;

use super::{Context, print_json, require_confirmation};
use crate::cli::{CalendarArg, CreateArgs, UpdateArgs};
use crate::error::{ClientError, ClientResult};
use crate::history::{HistoryEntry, Operation};
use crate::templates::{DEFAULT_DURATION_MINUTES, EventTemplate, parse_vars};

/// Upper bound on events fetched for `today` and `week`.
const WINDOW_MAX_RESULTS: usize = 250;

fn check_max(max: usize) -> ClientResult<usize> {
    if max == 0 {
        return Err(ClientError::validation("--max must be at least 1"));
    }
    Ok(max)
}

/// Upcoming events from now.
pub async fn list(ctx: &Context, max: Option<usize>, calendar: &CalendarArg) -> ClientResult<()> {
    let max = check_max(max.unwrap_or(ctx.config.preferences.max_results))?;
    let calendar_id = ctx.calendar_id(calendar);

    let query = EventQuery::upcoming(chrono::Utc::now(), max);
    let events = ctx.client()?.list_events(&calendar_id, &query).await?;

    if ctx.is_json() {
        return print_json(&events);
    }
    if !events.is_empty() {
        println!("Found {} upcoming events:\n", events.len());
    }
    println!("{}", ctx.formatter().event_list(&events, "No upcoming events found."));
    Ok(())
}

/// Free-text search over upcoming events.
pub async fn search(
    ctx: &Context,
    text: &str,
    max: Option<usize>,
    calendar: &CalendarArg,
) -> ClientResult<()> {
    if text.trim().is_empty() {
        return Err(ClientError::validation("search query must not be empty"));
    }
    let max = check_max(max.unwrap_or(ctx.config.preferences.max_results))?;
    let calendar_id = ctx.calendar_id(calendar);

    let query = EventQuery::upcoming(chrono::Utc::now(), max).with_search(text.trim());
    let events = ctx.client()?.list_events(&calendar_id, &query).await?;

    if ctx.is_json() {
        return print_json(&events);
    }
    let empty = format!("No upcoming events match '{}'.", text.trim());
    println!("{}", ctx.formatter().event_list(&events, &empty));
    Ok(())
}

pub async fn get(ctx: &Context, event_id: &str, calendar: &CalendarArg) -> ClientResult<()> {
    let calendar_id = ctx.calendar_id(calendar);
    let event = ctx.client()?.get_event(&calendar_id, event_id).await?;

    if ctx.is_json() {
        return print_json(&event);
    }
    println!("{}", ctx.formatter().event_detail(&event));
    Ok(())
}

/// Builds the event to insert from command-line arguments.
///
/// The title falls back to the template's; the end falls back to start plus
/// the template duration, or one hour. Naive times are read in `now`'s zone.
fn build_event<Tz: TimeZone>(
    args: &CreateArgs,
    template: Option<&EventTemplate>,
    time_zone: Option<&str>,
    now: &DateTime<Tz>,
) -> ClientResult<Event> {
    let tz = now.timezone();
    let vars = parse_vars(args.vars.as_slice())?;
    let template = template.map(|t| t.render(&vars));

    let title = args
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .or_else(|| template_field(template.as_ref(), |t| t.title.as_str()))
        .ok_or_else(|| ClientError::validation("a title is required (or a template with one)"))?;

    let start: DateTime<FixedOffset> = match &args.start {
        Some(s) => parse_timestamp_in(s, &tz)?,
        None => now.fixed_offset(),
    };
    let end = match &args.end {
        Some(e) => parse_timestamp_in(e, &tz)?,
        None => {
            let minutes = template
                .as_ref()
                .map_or(DEFAULT_DURATION_MINUTES, |t| t.duration_minutes);
            start + Duration::minutes(i64::from(minutes))
        }
    };

    let mut event = Event::new(title)
        .with_start(EventDateTime::at(&start).with_time_zone(time_zone))
        .with_end(EventDateTime::at(&end).with_time_zone(time_zone));

    let description = args
        .description
        .clone()
        .or_else(|| template_field(template.as_ref(), |t| t.description.as_str()));
    if let Some(description) = description {
        event = event.with_description(description);
    }
    let location = args
        .location
        .clone()
        .or_else(|| template_field(template.as_ref(), |t| t.location.as_str()));
    if let Some(location) = location {
        event = event.with_location(location);
    }

    let mut attendees: Vec<String> = template
        .as_ref()
        .map(|t| t.attendees.clone())
        .unwrap_or_default();
    for email in &args.attendees {
        if !attendees.contains(email) {
            attendees.push(email.clone());
        }
    }
    attendees.retain(|a| !a.trim().is_empty());
    if !attendees.is_empty() {
        event = event.with_attendees(attendees);
    }

    if args.meet {
        event = event.with_meet_request(uuid::Uuid::new_v4().to_string());
    }
    Ok(event)
}

fn template_field<F>(template: Option<&EventTemplate>, pick: F) -> Option<String>
where
    F: Fn(&EventTemplate) -> &str,
{
    template
        .map(pick)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

pub async fn create(ctx: &Context, args: &CreateArgs) -> ClientResult<()> {
    let template = match &args.template {
        Some(name) => Some(ctx.templates().get(name)?),
        None => None,
    };
    let event = build_event(
        args,
        template.as_ref(),
        ctx.config.preferences.time_zone.as_deref(),
        &Local::now(),
    )?;
    let calendar_id = ctx.calendar_id(&args.calendar);
    debug!("creating event in {}: {:?}", calendar_id, event);

    let created = ctx.client()?.create_event(&calendar_id, &event).await?;
    record(ctx, Operation::Create, &created, &calendar_id);

    if ctx.is_json() {
        return print_json(&created);
    }
    println!("Event created.");
    println!("{}", ctx.formatter().event_detail(&created));
    Ok(())
}

/// Builds a patch holding only the fields given on the command line.
fn build_patch<Tz: TimeZone>(
    args: &UpdateArgs,
    time_zone: Option<&str>,
    tz: &Tz,
) -> ClientResult<Event> {
    let mut patch = Event::default();
    if let Some(title) = &args.title {
        patch.summary = Some(title.clone());
    }
    if let Some(start) = &args.start {
        let start = parse_timestamp_in(start, tz)?;
        patch.start = Some(EventDateTime::at(&start).with_time_zone(time_zone));
    }
    if let Some(end) = &args.end {
        let end = parse_timestamp_in(end, tz)?;
        patch.end = Some(EventDateTime::at(&end).with_time_zone(time_zone));
    }
    if let Some(description) = &args.description {
        patch.description = Some(description.clone());
    }
    if let Some(location) = &args.location {
        patch.location = Some(location.clone());
    }

    if patch.is_empty() {
        return Err(ClientError::validation(
            "nothing to update; pass at least one of --title, --start, --end, --description, --location",
        ));
    }
    Ok(patch)
}

pub async fn update(ctx: &Context, args: &UpdateArgs) -> ClientResult<()> {
    let patch = build_patch(args, ctx.config.preferences.time_zone.as_deref(), &Local)?;
    let calendar_id = ctx.calendar_id(&args.calendar);

    let updated = ctx
        .client()?
        .patch_event(&calendar_id, &args.event_id, &patch)
        .await?;
    record(ctx, Operation::Update, &updated, &calendar_id);

    if ctx.is_json() {
        return print_json(&updated);
    }
    println!("Event updated.");
    println!("{}", ctx.formatter().event_detail(&updated));
    Ok(())
}

pub async fn delete(
    ctx: &Context,
    event_id: &str,
    calendar: &CalendarArg,
    yes: bool,
) -> ClientResult<()> {
    let calendar_id = ctx.calendar_id(calendar);
    if !yes {
        require_confirmation(&format!(
            "Delete event {} from calendar {}?",
            event_id, calendar_id
        ))?;
    }

    ctx.client()?.delete_event(&calendar_id, event_id).await?;
    ctx.history().record(HistoryEntry::new(
        Operation::Delete,
        event_id,
        &calendar_id,
        &ctx.account,
    ));

    if ctx.is_json() {
        return print_json(&serde_json::json!({
            "deleted": true,
            "id": event_id,
            "calendarId": calendar_id,
        }));
    }
    println!("Event {} deleted.", event_id);
    Ok(())
}

pub async fn quick_add(ctx: &Context, text: &str, calendar: &CalendarArg) -> ClientResult<()> {
    let calendar_id = ctx.calendar_id(calendar);
    let created = ctx.client()?.quick_add(&calendar_id, text).await?;
    record(ctx, Operation::QuickAdd, &created, &calendar_id);

    if ctx.is_json() {
        return print_json(&created);
    }
    println!("Event created.");
    println!("{}", ctx.formatter().event_detail(&created));
    Ok(())
}

/// Events overlapping the local day.
pub async fn today(ctx: &Context, calendar: &CalendarArg) -> ClientResult<()> {
    let window = TimeWindow::for_date(Local::now().date_naive(), &Local);
    let events = fetch_window(ctx, calendar, &window).await?;

    if ctx.is_json() {
        return print_json(&events);
    }
    println!("{}", ctx.formatter().agenda(&events, "No events today."));
    Ok(())
}

/// Events of the local Monday-to-Sunday week, grouped by day.
pub async fn week(ctx: &Context, calendar: &CalendarArg) -> ClientResult<()> {
    let window = TimeWindow::week_of(Local::now().date_naive(), &Local);
    let events = fetch_window(ctx, calendar, &window).await?;

    if ctx.is_json() {
        return print_json(&events);
    }
    println!("{}", ctx.formatter().week(&events, "No events this week."));
    Ok(())
}

async fn fetch_window(
    ctx: &Context,
    calendar: &CalendarArg,
    window: &TimeWindow,
) -> ClientResult<Vec<Event>> {
    let calendar_id = ctx.calendar_id(calendar);
    let query = EventQuery::between(window.start, window.end, WINDOW_MAX_RESULTS);
    Ok(ctx.client()?.list_events(&calendar_id, &query).await?)
}

fn record(ctx: &Context, operation: Operation, event: &Event, calendar_id: &str) {
    let Some(id) = event.id.as_deref() else {
        return;
    };
    ctx.history().record(
        HistoryEntry::new(operation, id, calendar_id, &ctx.account).with_title(event.title()),
    );
}
