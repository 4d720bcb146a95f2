//! Calendar commands: `me` and `calendars`.

use super::{Context, print_json};
use crate::error::ClientResult;

/// Shows the primary calendar: name, id and time zone.
pub async fn me(ctx: &Context) -> ClientResult<()> {
    let calendar = ctx.client()?.get_calendar("primary").await?;

    if ctx.is_json() {
        return print_json(&calendar);
    }
    println!("Primary calendar: {}", calendar.summary);
    println!("  ID:        {}", calendar.id);
    println!(
        "  Time zone: {}",
        calendar.time_zone.as_deref().unwrap_or("unknown")
    );
    println!("  Account:   {}", ctx.account);
    Ok(())
}

pub async fn calendars(ctx: &Context) -> ClientResult<()> {
    let entries = ctx.client()?.list_calendars().await?;

    if ctx.is_json() {
        return print_json(&entries);
    }
    println!("{}", ctx.formatter().calendars(&entries, "No calendars found."));
    Ok(())
}
