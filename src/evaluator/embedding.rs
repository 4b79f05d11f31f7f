use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::BenchError;

use super::config::EmbeddingConfig;

/// Scoring dependency that turns texts into vectors.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>, BenchError>;
}

/// Client for Ollama's `/api/embed` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaEmbeddings {
    client: Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbeddings {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, BenchError> {
        let mut problems = Vec::new();
        if Url::parse(&config.base_url).is_err() {
            problems.push(format!(
                "embedding.base_url (invalid URL: {})",
                config.base_url
            ));
        }
        if config.model.trim().is_empty() {
            problems.push("embedding.model".to_string());
        }
        if !problems.is_empty() {
            return Err(BenchError::configuration("embedding", problems));
        }

        Ok(Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddings {
    async fn embed(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>, BenchError> {
        let expected = input.len();
        let body = EmbedRequest {
            model: &self.model,
            input,
        };

        let resp = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| BenchError::JudgeError(format!("embedding request failed: {err}")))?;

        if !resp.status().is_success() {
            return Err(BenchError::JudgeError(format!(
                "embedding endpoint returned HTTP {}",
                resp.status()
            )));
        }

        let parsed: EmbedResponse = resp.json().await.map_err(|err| {
            BenchError::JudgeError(format!("unreadable embedding reply: {err}"))
        })?;

        if parsed.embeddings.len() != expected {
            return Err(BenchError::JudgeError(format!(
                "expected {expected} embeddings, got {}",
                parsed.embeddings.len()
            )));
        }
        Ok(parsed.embeddings)
    }
}

/// Cosine similarity in `[-1, 1]`; `None` when dimensions differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();

    if norm_a < 1e-9 || norm_b < 1e-9 {
        return Some(0.0);
    }
    Some((dot / (norm_a * norm_b)).clamp(-1.0, 1.0))
}
