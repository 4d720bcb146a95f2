//! google-calendar command-line client
//!
//! Preferences, accounts, operation history and event templates, plus the
//! command implementations that drive `gcal-google`.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod history;
pub mod secret;
pub mod templates;

pub use cli::Cli;
pub use commands::Context;
pub use error::{ClientError, ClientResult};
