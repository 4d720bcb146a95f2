//! `config` subcommands.

use serde_json::json;

use super::{Context, print_json};
use crate::cli::ConfigAction;
use crate::config::{CalendarConfig, ConfigDocument};
use crate::error::{ClientError, ClientResult};

pub fn run(ctx: &Context, action: ConfigAction) -> ClientResult<()> {
    match action {
        ConfigAction::Show => show(ctx),
        ConfigAction::Path => path(ctx),
        ConfigAction::Get { key } => get(ctx, &key),
        ConfigAction::Set { key, value } => set(ctx, &key, &value),
    }
}

/// Prints the effective configuration. Inline credentials are masked.
fn show(ctx: &Context) -> ClientResult<()> {
    let mut config = ctx.config.clone();
    if let Some(google) = config.google.as_mut()
        && google.client_secret.is_some()
    {
        google.client_secret = Some("********".to_string());
    }

    if ctx.is_json() {
        return print_json(&config);
    }
    let toml_str = toml::to_string_pretty(&config)
        .map_err(|e| ClientError::config(format!("failed to serialize config: {}", e)))?;
    println!("# {}", ctx.paths.config_file().display());
    println!("# account in use: {}", ctx.account);
    println!("{}", toml_str);
    Ok(())
}

fn path(ctx: &Context) -> ClientResult<()> {
    let paths = &ctx.paths;
    if ctx.is_json() {
        return print_json(&json!({
            "root": paths.root().display().to_string(),
            "config": paths.config_file().display().to_string(),
            "credentials": paths.credentials_file().display().to_string(),
            "token": paths.token_file(&ctx.account).display().to_string(),
            "history": paths.history_file().display().to_string(),
            "templates": paths.templates_dir().display().to_string(),
        }));
    }
    println!("config:      {}", paths.config_file().display());
    println!("credentials: {}", paths.credentials_file().display());
    println!("token:       {}", paths.token_file(&ctx.account).display());
    println!("history:     {}", paths.history_file().display());
    println!("templates:   {}", paths.templates_dir().display());
    Ok(())
}

fn get(ctx: &Context, key: &str) -> ClientResult<()> {
    match ctx.config.preferences.get(key)? {
        Some(value) => println!("{}", value),
        None => println!("(not set)"),
    }
    Ok(())
}

fn set(ctx: &Context, key: &str, value: &str) -> ClientResult<()> {
    let path = ctx.paths.config_file();
    let mut doc = ConfigDocument::open(&path)?;
    doc.set_preference(key, value)?;
    doc.save()?;

    // read back what was written
    let stored = CalendarConfig::load_from(&path)?.preferences.get(key)?;
    match stored {
        Some(v) => println!("{} = {}", key, v),
        None => println!("{} cleared", key),
    }
    Ok(())
}
