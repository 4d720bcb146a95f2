//! Account commands: `accounts` and `use`.

use serde_json::json;

use super::{Context, print_json};
use crate::config::{ConfigDocument, validate_account_name};
use crate::error::{ClientError, ClientResult};

/// Lists known accounts, marking the default and the one in use.
pub fn list(ctx: &Context) -> ClientResult<()> {
    let accounts = &ctx.config.accounts;

    if ctx.is_json() {
        return print_json(&json!({
            "accounts": accounts.known,
            "default": accounts.default,
            "current": ctx.account,
        }));
    }

    if accounts.known.is_empty() {
        println!("No accounts configured. Run `google-calendar init` to add one.");
        return Ok(());
    }

    println!("Configured accounts ({}):", accounts.known.len());
    for name in &accounts.known {
        let mut marks = Vec::new();
        if accounts.default.as_deref() == Some(name.as_str()) {
            marks.push("default");
        }
        if *name == ctx.account {
            marks.push("in use");
        }
        if marks.is_empty() {
            println!("  • {}", name);
        } else {
            println!("  • {} ({})", name, marks.join(", "));
        }
    }
    Ok(())
}

/// Makes `name` the default account. The account must already be known.
pub fn use_account(ctx: &Context, name: &str) -> ClientResult<()> {
    validate_account_name(name)?;
    if !ctx.config.accounts.contains(name) {
        let available = if ctx.config.accounts.known.is_empty() {
            "none".to_string()
        } else {
            ctx.config.accounts.known.join(", ")
        };
        return Err(ClientError::validation(format!(
            "account '{}' not found (available: {}); run `google-calendar init -a {}` to add it",
            name, available, name
        )));
    }

    let mut doc = ConfigDocument::open(ctx.paths.config_file())?;
    doc.set_default_account(name)?;
    doc.save()?;
    println!("Default account set to '{}'.", name);
    Ok(())
}
