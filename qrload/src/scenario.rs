//! Scenario definition: the only point of variation between load tests.
use qrload_core::{RequestSpec, ScenarioConfig};
use std::fmt;
use std::sync::Arc;

/// Produces the request for a given index within a scenario.
///
/// Called once per request, in index order, from the scheduling task. Any closure
/// `Fn(usize) -> RequestSpec` is a payload source.
pub trait PayloadSource: Send + Sync {
    fn request(&self, index: usize) -> RequestSpec;
}

impl<F> PayloadSource for F
where
    F: Fn(usize) -> RequestSpec + Send + Sync,
{
    fn request(&self, index: usize) -> RequestSpec {
        self(index)
    }
}

/// A named scenario: its [`ScenarioConfig`] plus where its payloads come from.
#[derive(Clone)]
pub struct ScenarioSpec {
    config: ScenarioConfig,
    source: Arc<dyn PayloadSource>,
}

impl ScenarioSpec {
    pub fn new<P>(config: ScenarioConfig, source: P) -> Self
    where
        P: PayloadSource + 'static,
    {
        Self {
            config,
            source: Arc::new(source),
        }
    }

    pub fn from_shared(config: ScenarioConfig, source: Arc<dyn PayloadSource>) -> Self {
        Self { config, source }
    }

    /// Same payloads, different shape. Used to derive a warm-up run from a real scenario.
    pub fn with_config(&self, config: ScenarioConfig) -> Self {
        Self {
            config,
            source: self.source.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn source(&self) -> &Arc<dyn PayloadSource> {
        &self.source
    }
}

impl fmt::Debug for ScenarioSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioSpec")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
