use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::connector::BackendConfig;
use crate::evaluation::RunSettings;
use crate::evaluator::EvaluatorConfig;
use crate::template::{Template, TemplateLibrary};

use super::error::ConfigError;
use super::interpolate::interpolate;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Contents of a `rag-bench.toml` file.
///
/// ```toml
/// evaluators = ["academic", "lexical"]
///
/// [[backends]]
/// name = "dify"
/// api_key = "app-..."
/// base_url = "http://localhost/v1"
///
/// [run]
/// max_retries = 2
/// pacing_ms = 2000
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub backends: Vec<BackendConfig>,
    /// Extra backend families on top of the built-in ones.
    pub templates: Vec<Template>,
    pub evaluator: EvaluatorConfig,
    /// Evaluator types to activate; the registry priority list when unset.
    pub evaluators: Option<Vec<String>>,
    pub run: RunSettings,
    pub logging: LoggingConfig,
}

impl RunConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Reads a config file verbatim.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    /// Reads a config file, expanding `${VAR}` references through `lookup` first.
    pub fn load_with<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&interpolate(&raw, lookup)?)
    }

    pub fn enabled_backends(&self) -> impl Iterator<Item = &BackendConfig> {
        self.backends.iter().filter(|backend| backend.enabled)
    }

    /// Built-in templates plus the ones declared in this config.
    pub fn template_library(&self) -> TemplateLibrary {
        let mut library = TemplateLibrary::builtin();
        for template in &self.templates {
            library.insert(template.clone());
        }
        library
    }

    /// Problems that make the whole config unusable; empty means usable.
    ///
    /// Per-backend credential problems are left to connector construction, which
    /// only excludes the affected backend.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.enabled_backends().next().is_none() {
            problems.push("no enabled backend".to_string());
        }

        let mut names = BTreeSet::new();
        for backend in &self.backends {
            if !names.insert(backend.name.as_str()) {
                problems.push(format!("duplicate backend name {}", backend.name));
            }
        }

        let library = self.template_library();
        for backend in self.enabled_backends() {
            if library.get(backend.template_name()).is_none() {
                problems.push(format!(
                    "backend {} uses unknown template {}",
                    backend.name,
                    backend.template_name()
                ));
            }
        }

        if self.run.timeout_seconds == 0 {
            problems.push("run.timeout_seconds must be positive".to_string());
        }
        if matches!(self.evaluators.as_deref(), Some([])) {
            problems.push("evaluators list is empty".to_string());
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::ParseFailurePolicy;
    use secrecy::ExposeSecret;
    use std::io::Write;

    const SAMPLE: &str = r#"
evaluators = ["academic", "lexical"]

[[backends]]
name = "dify"
api_key = "app-123"
base_url = "http://localhost/v1/"

[[backends]]
name = "ragflow"
enabled = false
api_key = "rf"
base_url = "http://localhost:9380"
fields = { chat_id = "abc" }

[evaluator]
parse_failure = "worst"

[evaluator.judge]
api_key = "sk-judge"
model = "gpt-4o-mini"

[run]
max_retries = 3
pacing_ms = 0
extras = { user_id = "bench" }

[logging]
level = "debug"
"#;

    #[test]
    fn parses_full_config() {
        let config = RunConfig::from_toml_str(SAMPLE).unwrap();

        assert_eq!(config.backends.len(), 2);
        assert_eq!(config.enabled_backends().count(), 1);
        assert_eq!(config.backends[0].value("base_url").as_deref(), Some("http://localhost/v1"));
        assert_eq!(config.evaluator.parse_failure, ParseFailurePolicy::Worst);
        assert_eq!(
            config.evaluator.judge.api_key.as_ref().unwrap().expose_secret(),
            "sk-judge"
        );
        assert_eq!(config.evaluator.judge.model, "gpt-4o-mini");
        assert_eq!(config.run.max_retries, 3);
        assert_eq!(config.run.timeout_seconds, 60);
        assert_eq!(config.run.extras["user_id"], "bench");
        assert_eq!(config.logging.level, "debug");
        assert!(config.validate().is_empty());
    }

    #[test]
    fn empty_config_uses_defaults_and_is_invalid() {
        let config = RunConfig::from_toml_str("").unwrap();
        assert_eq!(config.run, RunSettings::default());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.validate(), vec!["no enabled backend"]);
    }

    #[test]
    fn validate_flags_duplicates_and_unknown_templates() {
        let config = RunConfig::from_toml_str(
            r#"
[[backends]]
name = "a"
template = "mystery"

[[backends]]
name = "a"
template = "dify"
"#,
        )
        .unwrap();
        let problems = config.validate();
        assert!(problems.iter().any(|p| p.contains("duplicate backend name a")));
        assert!(problems.iter().any(|p| p.contains("unknown template mystery")));
    }

    #[test]
    fn config_templates_extend_the_library() {
        let config = RunConfig::from_toml_str(
            r#"
[[templates]]
name = "echo"
required = ["base_url"]

[templates.request]
url = "{base_url}/ask"
body = { q = "{question}" }

[templates.response]
answer = "/reply"

[[backends]]
name = "local"
template = "echo"
base_url = "http://127.0.0.1:8080"
"#,
        )
        .unwrap();
        assert!(config.template_library().get("echo").is_some());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn load_with_interpolates_before_parsing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "[[backends]]\nname = \"dify\"\napi_key = \"${{DIFY_KEY}}\"\nbase_url = \"http://x\"\n"
        )
        .unwrap();

        let config = RunConfig::load_with(file.path(), |name| {
            (name == "DIFY_KEY").then(|| "secret".to_string())
        })
        .unwrap();
        assert_eq!(config.backends[0].value("api_key").as_deref(), Some("secret"));

        let err = RunConfig::load_with(file.path(), |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::UnsetVariables(_)));
    }
}
