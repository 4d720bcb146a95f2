//! `env::VAR` references for credential values in `calendar.toml`.
//!
//! A value written as `env::GOOGLE_CLIENT_SECRET` is read from that
//! environment variable when the config is used; any other value is taken
//! literally.

use crate::error::{ClientError, ClientResult};

const ENV_PREFIX: &str = "env::";

/// Returns `value`, or the variable it names when it starts with `env::`.
pub fn resolve(value: &str) -> ClientResult<String> {
    let Some(var) = value.strip_prefix(ENV_PREFIX) else {
        return Ok(value.to_string());
    };
    if var.is_empty() {
        return Err(ClientError::config("`env::` needs a variable name"));
    }
    std::env::var(var)
        .map_err(|_| ClientError::config(format!("environment variable `{}` is not set", var)))
}
