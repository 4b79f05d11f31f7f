use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use regex::{Captures, Regex};
use reqwest::Url;
use serde_json::Value;

use crate::{connector::BackendConfig, error::BenchError};

use super::types::{ContextSpec, Extras, HttpRequest, ParsedResponse, Template};

const RAW_RESPONSE_PREVIEW: usize = 500;

/// Stateless translation between a normalized question and one backend's wire shape.
#[derive(Debug, Clone)]
pub struct TemplateProcessor {
    template: Arc<Template>,
}

impl TemplateProcessor {
    pub fn new(template: Arc<Template>) -> Self {
        Self { template }
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Returns the missing or invalid fields of `config`. Empty means valid.
    pub fn validate_config(&self, config: &BackendConfig) -> Vec<String> {
        let mut problems: Vec<String> = self
            .template
            .required
            .iter()
            .filter(|field| {
                config.value(field).is_none() && !self.template.defaults.contains_key(*field)
            })
            .cloned()
            .collect();

        if let Some(base_url) = config.value("base_url") {
            if Url::parse(&base_url).is_err() {
                problems.push(format!("base_url (invalid URL: {base_url})"));
            }
        }
        problems
    }

    /// Renders the template for `question`. Never mutates its inputs.
    pub fn build_request(
        &self,
        config: &BackendConfig,
        question: &str,
        extras: &Extras,
    ) -> Result<HttpRequest, BenchError> {
        let lookup = |key: &str| -> Option<String> {
            if key == "question" {
                return Some(question.to_string());
            }
            extras
                .get(key)
                .cloned()
                .or_else(|| config.value(key))
                .or_else(|| self.template.defaults.get(key).cloned())
        };

        let spec = &self.template.request;
        let url = render(&spec.url, &lookup)?;
        let headers = spec
            .headers
            .iter()
            .map(|(name, value)| Ok((name.clone(), render(value, &lookup)?)))
            .collect::<Result<BTreeMap<_, _>, BenchError>>()?;
        let body = render_value(&spec.body, &lookup)?;

        Ok(HttpRequest {
            method: spec.method,
            url,
            headers,
            body,
        })
    }

    /// Extracts `{answer, contexts, metadata}` from a raw JSON body.
    pub fn parse_response(&self, raw: &str) -> Result<ParsedResponse, BenchError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|err| malformed(format!("invalid JSON body: {err}"), raw))?;

        let spec = &self.template.response;
        let answer = value
            .pointer(&spec.answer)
            .and_then(Value::as_str)
            .ok_or_else(|| malformed(format!("missing answer field at {}", spec.answer), raw))?
            .to_string();

        let contexts = spec
            .contexts
            .as_ref()
            .map(|ctx| extract_contexts(&value, ctx))
            .unwrap_or_default();

        let metadata = spec
            .metadata
            .iter()
            .filter_map(|(name, pointer)| {
                value
                    .pointer(pointer)
                    .filter(|v| !v.is_null())
                    .map(|v| (name.clone(), v.clone()))
            })
            .collect();

        Ok(ParsedResponse {
            answer,
            contexts,
            metadata,
        })
    }
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
    })
}

/// Substitutes placeholders in one pass; substituted values are not re-scanned.
fn render<F>(text: &str, lookup: &F) -> Result<String, BenchError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut unresolved = Vec::new();
    let rendered = placeholder_pattern().replace_all(text, |caps: &Captures<'_>| {
        lookup(&caps[1]).unwrap_or_else(|| {
            unresolved.push(caps[1].to_string());
            String::new()
        })
    });

    if !unresolved.is_empty() {
        return Err(BenchError::InvalidRequest(format!(
            "unresolved template placeholders: {}",
            unresolved.join(", ")
        )));
    }
    Ok(rendered.into_owned())
}

fn render_value<F>(value: &Value, lookup: &F) -> Result<Value, BenchError>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(match value {
        Value::String(text) => Value::String(render(text, lookup)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| render_value(item, lookup))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| Ok((key.clone(), render_value(item, lookup)?)))
                .collect::<Result<_, BenchError>>()?,
        ),
        other => other.clone(),
    })
}

fn extract_contexts(value: &Value, spec: &ContextSpec) -> Vec<String> {
    let Some(items) = value.pointer(&spec.path).and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match (&spec.field, item) {
            (_, Value::String(text)) => Some(text.clone()),
            (Some(field), Value::Object(map)) => {
                map.get(field).and_then(Value::as_str).map(str::to_string)
            }
            _ => None,
        })
        .collect()
}

fn malformed(message: String, raw: &str) -> BenchError {
    BenchError::MalformedResponse {
        message,
        raw_response: raw.chars().take(RAW_RESPONSE_PREVIEW).collect(),
    }
}
