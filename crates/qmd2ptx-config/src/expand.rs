//! `${VAR}` expansion for configuration strings.

use std::borrow::Cow;

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in `value`.
///
/// Strings without `${` are returned untouched, so a lone `$` in a path
/// survives. `field` names the setting in error messages.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, lookup)
        .map(Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.cause.0),
        })
}

/// Unset variable name.
struct Unset(String);

fn lookup(var: &str) -> Result<Option<String>, Unset> {
    std::env::var(var)
        .map(Some)
        .map_err(|_| Unset(var.to_owned()))
}
