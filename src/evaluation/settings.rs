use std::time::Duration;

use serde::Deserialize;

use crate::connector::{DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS};
use crate::template::Extras;

/// Delay between successive calls to the same backend.
pub const DEFAULT_PACING_MS: u64 = 2_000;

/// Knobs for one benchmark run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub max_retries: usize,
    pub pacing_ms: u64,
    pub timeout_seconds: u64,
    pub evaluator_timeout_seconds: Option<u64>,
    /// Per-query placeholder values passed to every template.
    pub extras: Extras,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            pacing_ms: DEFAULT_PACING_MS,
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            evaluator_timeout_seconds: None,
            extras: Extras::new(),
        }
    }
}

impl RunSettings {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn evaluator_timeout(&self) -> Option<Duration> {
        self.evaluator_timeout_seconds.map(Duration::from_secs)
    }
}
