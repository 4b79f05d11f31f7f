use std::collections::BTreeMap;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: usize = 2;
/// Per-attempt timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration of one backend under evaluation.
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    /// System name used in logs and report columns.
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Template family; defaults to `name`.
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub api_key: Option<SecretString>,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Backend-specific identifiers such as `app_id`, `chat_id`, `user_id` or `model`.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

fn default_enabled() -> bool {
    true
}

impl BackendConfig {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            template: Some(template.into()),
            api_key: None,
            base_url: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(api_key.into()));
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn template_name(&self) -> &str {
        self.template.as_deref().unwrap_or(&self.name)
    }

    /// Resolves a field by name. Blank values count as missing.
    ///
    /// `api_key` exposes the secret; `base_url` is returned without a trailing slash.
    pub fn value(&self, key: &str) -> Option<String> {
        let value = match key {
            "api_key" => self
                .api_key
                .as_ref()
                .map(|secret| secret.expose_secret().to_string()),
            "base_url" => self
                .base_url
                .as_ref()
                .map(|url| url.trim_end_matches('/').to_string()),
            "name" => Some(self.name.clone()),
            other => self.fields.get(other).cloned(),
        };
        value.filter(|v| !v.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_missing() {
        let config = BackendConfig::new("dify", "dify")
            .with_api_key("   ")
            .with_field("app_id", "");
        assert_eq!(config.value("api_key"), None);
        assert_eq!(config.value("app_id"), None);
    }

    #[test]
    fn base_url_is_trimmed() {
        let config = BackendConfig::new("dify", "dify").with_base_url("http://host/v1//");
        assert_eq!(config.value("base_url").as_deref(), Some("http://host/v1"));
    }

    #[test]
    fn template_defaults_to_name() {
        let config: BackendConfig = toml::from_str(
            r#"
            name = "ragflow"
            api_key = "k"
            fields = { chat_id = "abc" }
            "#,
        )
        .unwrap();
        assert!(config.enabled);
        assert_eq!(config.template_name(), "ragflow");
        assert_eq!(config.value("chat_id").as_deref(), Some("abc"));
        assert_eq!(config.value("api_key").as_deref(), Some("k"));
    }
}
