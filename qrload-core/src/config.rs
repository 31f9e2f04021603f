use crate::{ConfigError, DEFAULT_CONCURRENCY, DEFAULT_REQUESTS};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::time::Duration;

/// Shape of a single scenario: how many requests, how many at once, and how to pace batches.
///
/// The payload source is kept alongside this in `qrload::ScenarioSpec`; this half is the part
/// that ends up in the persisted report.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    pub requests: usize,
    pub concurrency: usize,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<Duration>,
    #[serde(default)]
    pub clear_cache: bool,
}

impl ScenarioConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            requests: DEFAULT_REQUESTS,
            concurrency: DEFAULT_CONCURRENCY,
            delay: None,
            clear_cache: false,
        }
    }

    pub fn requests(mut self, requests: usize) -> Self {
        self.requests = requests;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Pause between consecutive batches. Never applied after the last batch.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn clear_cache(mut self, clear_cache: bool) -> Self {
        self.clear_cache = clear_cache;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(self.concurrency));
        }
        Ok(())
    }

    /// Number of barrier-separated batches this scenario runs in.
    pub fn batch_count(&self) -> usize {
        if self.concurrency == 0 {
            0
        } else {
            self.requests.div_ceil(self.concurrency)
        }
    }
}

impl std::fmt::Display for ScenarioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} requests, concurrency {}",
            self.name, self.requests, self.concurrency
        )?;
        if let Some(delay) = self.delay {
            write!(f, ", delay {}", humantime::format_duration(delay))?;
        }
        if self.clear_cache {
            write!(f, ", cold cache")?;
        }
        write!(f, ")")
    }
}
