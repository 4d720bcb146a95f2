//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// google-calendar - Google Calendar from the command line
#[derive(Debug, Parser)]
#[command(name = "google-calendar")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Account to use (token slot name, usually an e-mail address)
    #[arg(long, short, global = true, env = "GOOGLE_CALENDAR_ACCOUNT")]
    pub account: Option<String>,

    /// Directory holding configuration, credentials and tokens
    #[arg(long, global = true, env = "GOOGLE_CALENDAR_HOME")]
    pub config_dir: Option<PathBuf>,

    /// Print the API's JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// `--calendar` shared by event commands.
#[derive(Debug, Clone, Default, Args)]
pub struct CalendarArg {
    /// Calendar ID (defaults to the `default_calendar` preference)
    #[arg(long, short)]
    pub calendar: Option<String>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authorize access to Google Calendar and save a token
    Init {
        /// OAuth client ID (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_ID", requires = "client_secret")]
        client_id: Option<String>,

        /// OAuth client secret (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_SECRET", requires = "client_id")]
        client_secret: Option<String>,

        /// Path to the client secret JSON downloaded from Google Cloud Console
        #[arg(long, conflicts_with = "client_id")]
        credentials_file: Option<PathBuf>,

        /// Re-authorize even if a valid token exists
        #[arg(long, short)]
        force: bool,
    },

    /// Show the primary calendar
    Me,

    /// List upcoming events
    List {
        /// Maximum number of events
        #[arg(long, short)]
        max: Option<usize>,

        #[command(flatten)]
        calendar: CalendarArg,
    },

    /// Show one event
    Get {
        event_id: String,

        #[command(flatten)]
        calendar: CalendarArg,
    },

    /// Create an event
    Create(CreateArgs),

    /// Change fields of an event
    Update(UpdateArgs),

    /// Delete an event
    Delete {
        event_id: String,

        #[command(flatten)]
        calendar: CalendarArg,

        /// Do not ask for confirmation
        #[arg(long, short)]
        yes: bool,
    },

    /// List calendars
    Calendars,

    /// Today's events
    Today {
        #[command(flatten)]
        calendar: CalendarArg,
    },

    /// This week's events (Monday to Sunday), grouped by day
    Week {
        #[command(flatten)]
        calendar: CalendarArg,
    },

    /// Search upcoming events by text
    Search {
        query: String,

        /// Maximum number of events
        #[arg(long, short)]
        max: Option<usize>,

        #[command(flatten)]
        calendar: CalendarArg,
    },

    /// Create an event from a sentence, e.g. "Lunch with Ann tomorrow at noon"
    QuickAdd {
        text: String,

        #[command(flatten)]
        calendar: CalendarArg,
    },

    /// Show the state of the stored token
    Status,

    /// Delete the stored token for the account
    Logout,

    /// List configured accounts
    Accounts,

    /// Set the default account
    Use { account: String },

    /// Show recent create/update/delete operations
    History {
        /// Number of entries
        #[arg(long, short, default_value_t = 10)]
        limit: usize,
    },

    /// Manage event templates
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// Show or change preferences
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Event title (may be omitted when --template supplies one)
    pub title: Option<String>,

    /// Start time (RFC 3339, `YYYY-MM-DD HH:MM` or `YYYY-MM-DD`); defaults to now
    #[arg(long, short)]
    pub start: Option<String>,

    /// End time; defaults to start plus the template duration or one hour
    #[arg(long, short)]
    pub end: Option<String>,

    #[arg(long, short)]
    pub description: Option<String>,

    #[arg(long, short)]
    pub location: Option<String>,

    #[command(flatten)]
    pub calendar: CalendarArg,

    /// Start from a saved template
    #[arg(long, short)]
    pub template: Option<String>,

    /// Template variable as key=value (can be repeated)
    #[arg(long = "var", value_name = "KEY=VALUE", action = clap::ArgAction::Append)]
    pub vars: Vec<String>,

    /// Invite an attendee (can be repeated)
    #[arg(long = "attendee", value_name = "EMAIL", action = clap::ArgAction::Append)]
    pub attendees: Vec<String>,

    /// Attach a Google Meet link
    #[arg(long)]
    pub meet: bool,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    pub event_id: String,

    /// New title
    #[arg(long, short)]
    pub title: Option<String>,

    #[arg(long, short)]
    pub start: Option<String>,

    #[arg(long, short)]
    pub end: Option<String>,

    #[arg(long, short)]
    pub description: Option<String>,

    #[arg(long, short)]
    pub location: Option<String>,

    #[command(flatten)]
    pub calendar: CalendarArg,
}

/// Template actions.
#[derive(Debug, Subcommand)]
pub enum TemplateAction {
    /// List saved templates
    List,

    /// Show a template
    Show { name: String },

    /// Create or replace a template
    Save {
        name: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        location: Option<String>,

        /// Duration in minutes
        #[arg(long, default_value_t = crate::templates::DEFAULT_DURATION_MINUTES)]
        duration: u32,

        /// Attendee e-mail (can be repeated)
        #[arg(long = "attendee", action = clap::ArgAction::Append)]
        attendees: Vec<String>,
    },

    /// Delete a template
    Delete { name: String },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective preferences and accounts
    Show,

    /// Show file locations
    Path,

    /// Print one preference
    Get { key: String },

    /// Change one preference (empty value clears `time_zone`)
    Set { key: String, value: String },
}
