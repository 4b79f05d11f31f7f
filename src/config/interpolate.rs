use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::error::ConfigError;

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("variable pattern is valid")
    })
}

/// Expands `${VAR}` and `${VAR:-default}` using `lookup`.
///
/// Every unset variable without a default is reported at once.
pub fn interpolate<F>(text: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut unset = Vec::new();
    let expanded = variable_pattern().replace_all(text, |caps: &Captures<'_>| {
        let name = &caps[1];
        match (lookup(name), caps.get(2)) {
            (Some(value), _) => value,
            (None, Some(default)) => default.as_str().to_string(),
            (None, None) => {
                if !unset.iter().any(|n| n == name) {
                    unset.push(name.to_string());
                }
                String::new()
            }
        }
    });

    if unset.is_empty() {
        Ok(expanded.into_owned())
    } else {
        Err(ConfigError::UnsetVariables(unset))
    }
}
