use regex::{Captures, Regex};
use std::env;
use std::sync::OnceLock;

use crate::ConfigError;

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex is valid")
    })
}

/// Interpolate environment variables in a string.
/// Replaces `${VAR_NAME}` with the value of the environment variable.
pub fn interpolate_env(input: &str) -> Result<String, ConfigError> {
    let mut missing = Vec::new();

    let result = placeholder().replace_all(input, |cap: &Captures<'_>| {
        let var_name = &cap[1];
        match env::var(var_name) {
            Ok(value) => value,
            Err(_) => {
                if !missing.iter().any(|m| m == var_name) {
                    missing.push(var_name.to_string());
                }
                String::new()
            }
        }
    });

    if !missing.is_empty() {
        return Err(ConfigError::MissingEnvVars(missing));
    }

    Ok(result.into_owned())
}

/// Split a comma-separated endpoint list, trimming whitespace and dropping empty entries.
pub fn parse_endpoint_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|ep| !ep.is_empty())
        .map(str::to_string)
        .collect()
}
