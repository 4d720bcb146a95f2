//! google-calendar CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use gcal_cli::cli::{Cli, Command};
use gcal_cli::commands::{self, Context};
use gcal_cli::config::{CalendarConfig, ConfigPaths, resolve_account};
use gcal_cli::error::ClientResult;
use gcal_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::cli()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: logging disabled: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let paths = ConfigPaths::from_override(cli.config_dir);
    let config = CalendarConfig::load(&paths)?;
    let cwd = std::env::current_dir()?;
    let account = resolve_account(cli.account.as_deref(), &cwd, &config)?;
    let ctx = Context::new(paths, config, account, cli.json);
    tracing::debug!("account {} under {:?}", ctx.account, ctx.paths.root());

    match cli.command {
        Command::Init {
            client_id,
            client_secret,
            credentials_file,
            force,
        } => commands::auth::init(&ctx, client_id, client_secret, credentials_file, force).await,
        Command::Status => commands::auth::status(&ctx),
        Command::Logout => commands::auth::logout(&ctx),

        Command::Me => commands::calendars::me(&ctx).await,
        Command::Calendars => commands::calendars::calendars(&ctx).await,

        Command::List { max, calendar } => commands::events::list(&ctx, max, &calendar).await,
        Command::Get { event_id, calendar } => {
            commands::events::get(&ctx, &event_id, &calendar).await
        }
        Command::Create(args) => commands::events::create(&ctx, &args).await,
        Command::Update(args) => commands::events::update(&ctx, &args).await,
        Command::Delete {
            event_id,
            calendar,
            yes,
        } => commands::events::delete(&ctx, &event_id, &calendar, yes).await,
        Command::Today { calendar } => commands::events::today(&ctx, &calendar).await,
        Command::Week { calendar } => commands::events::week(&ctx, &calendar).await,
        Command::Search {
            query,
            max,
            calendar,
        } => commands::events::search(&ctx, &query, max, &calendar).await,
        Command::QuickAdd { text, calendar } => {
            commands::events::quick_add(&ctx, &text, &calendar).await
        }

        Command::Accounts => commands::accounts::list(&ctx),
        Command::Use { account } => commands::accounts::use_account(&ctx, &account),
        Command::History { limit } => commands::history::show(&ctx, limit),
        Command::Template { action } => commands::template::run(&ctx, action),
        Command::Config { action } => commands::config::run(&ctx, action),
    }
}
