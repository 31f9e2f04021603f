use crate::{AggregateStats, Outcome, ScenarioConfig};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Cache counters reported by the service. Every field is optional since service builds differ
/// in what they expose.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hits: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub misses: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Percent, as reported by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hit_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<f64>,
}

impl CacheSnapshot {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// What the service said about itself at one point in time. Empty when it could not be reached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheSnapshot>,
}

impl ProbeSnapshot {
    pub fn is_empty(&self) -> bool {
        self.health.is_none() && self.version.is_none() && self.cache.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub config: ScenarioConfig,
    pub stats: AggregateStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_after: Option<CacheSnapshot>,
    pub outcomes: Vec<Outcome>,
}

/// Everything one invocation measured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    pub target: String,
    /// Warm-up traffic, kept apart from `overall`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warmup: Option<AggregateStats>,
    pub scenarios: Vec<ScenarioReport>,
    pub overall: AggregateStats,
    pub before: ProbeSnapshot,
    pub after: ProbeSnapshot,
}

impl RunReport {
    pub fn scenario(&self, name: &str) -> Option<&ScenarioReport> {
        self.scenarios.iter().find(|s| s.config.name == name)
    }

    /// Every measured outcome, scenario by scenario.
    pub fn outcomes(&self) -> impl Iterator<Item = &Outcome> {
        self.scenarios.iter().flat_map(|s| s.outcomes.iter())
    }
}
