//! `history` command.

use chrono::Local;

use super::{Context, print_json};
use crate::error::{ClientError, ClientResult};
use crate::history::HistoryEntry;

pub fn show(ctx: &Context, limit: usize) -> ClientResult<()> {
    if limit == 0 {
        return Err(ClientError::validation("--limit must be at least 1"));
    }
    let entries = ctx.history().recent(limit)?;

    if ctx.is_json() {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No operations recorded yet.");
        return Ok(());
    }
    for entry in &entries {
        println!("{}", render_entry(entry));
    }
    Ok(())
}

fn render_entry(entry: &HistoryEntry) -> String {
    let mut line = format!(
        "{}  {:<9} {}",
        entry.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
        entry.operation.as_str(),
        entry.event_id,
    );
    if let Some(title) = &entry.title {
        line.push_str(&format!(" \"{}\"", title));
    }
    line.push_str(&format!(" [{} / {}]", entry.calendar_id, entry.account));
    line
}
