//! Sequencing of scenarios into a single [`RunReport`].
use crate::executor::{Execute, HttpExecutor};
use crate::probe::ServiceProbe;
use crate::scenario::ScenarioSpec;
use crate::scheduler::{BatchPlan, ConcurrencyScheduler, ScheduledRun};
use crate::RunError;
use qrload_core::{
    AggregateStats, CacheSnapshot, ConfigError, ProbeSnapshot, RunReport, ScenarioReport,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn};

/// Builder for a load-test run.
///
/// ```no_run
/// # use qrload::prelude::*;
/// # use serde_json::json;
/// # async fn example() -> Result<(), RunError> {
/// let executor = HttpExecutor::new("http://localhost:3002")?;
/// let payload = |_idx: usize| RequestSpec::new(GENERATE_ENDPOINT, json!({ "data": "hello" }));
///
/// let report = Runner::new(executor)
///     .scenario(ScenarioSpec::new(
///         ScenarioConfig::new("cold").requests(100).concurrency(10).clear_cache(true),
///         payload,
///     ))
///     .scenario(ScenarioSpec::new(
///         ScenarioConfig::new("warm").requests(100).concurrency(10),
///         payload,
///     ))
///     .run()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct Runner<E> {
    executor: Arc<E>,
    probe: Option<ServiceProbe>,
    target: String,
    warmup: Option<ScenarioSpec>,
    scenarios: Vec<ScenarioSpec>,
}

impl Runner<HttpExecutor> {
    /// Probes the same service the executor targets.
    pub fn new(executor: HttpExecutor) -> Self {
        let probe = ServiceProbe::from_executor(&executor);
        let target = executor.base_url().to_string();
        Self::with_executor(executor, Some(probe), target)
    }
}

impl<E> Runner<E>
where
    E: Execute + 'static,
{
    /// Without a probe there is no pre-flight check, no cache clearing and no snapshots.
    pub fn with_executor(executor: E, probe: Option<ServiceProbe>, target: impl Into<String>) -> Self {
        Self {
            executor: Arc::new(executor),
            probe,
            target: target.into(),
            warmup: None,
            scenarios: vec![],
        }
    }

    pub fn probe(mut self, probe: ServiceProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn without_probe(mut self) -> Self {
        self.probe = None;
        self
    }

    /// Unmeasured traffic issued before the first scenario. Reported on its own, never part of
    /// the overall statistics.
    pub fn warmup(mut self, spec: ScenarioSpec) -> Self {
        self.warmup = Some(spec);
        self
    }

    pub fn scenario(mut self, spec: ScenarioSpec) -> Self {
        self.scenarios.push(spec);
        self
    }

    pub fn scenarios(mut self, specs: impl IntoIterator<Item = ScenarioSpec>) -> Self {
        self.scenarios.extend(specs);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scenarios.is_empty() {
            return Err(ConfigError::NoScenarios);
        }

        let mut names = HashSet::new();
        for spec in &self.scenarios {
            spec.config().validate()?;
            if !names.insert(spec.name()) {
                return Err(ConfigError::DuplicateName(spec.name().to_string()));
            }
        }

        if let Some(warmup) = &self.warmup {
            warmup.config().validate()?;
        }

        Ok(())
    }

    /// Runs every scenario in order.
    ///
    /// Errors only for invalid configuration or a failed pre-flight health check, both before
    /// any load is generated. Request failures are part of the report.
    #[instrument(name = "run", skip_all, fields(target = %self.target))]
    pub async fn run(self) -> Result<RunReport, RunError> {
        self.validate()?;
        let started_at = OffsetDateTime::now_utc();

        let before = self.preflight().await?;

        let warmup = match &self.warmup {
            Some(spec) => {
                let run = self.run_scenario(spec).await?;
                Some(AggregateStats::reduce(run.outcomes(), Some(run.elapsed)))
            }
            None => None,
        };

        let mut scenarios = Vec::with_capacity(self.scenarios.len());
        let mut elapsed = Duration::ZERO;
        for spec in &self.scenarios {
            let run = self.run_scenario(spec).await?;
            elapsed += run.elapsed;

            let stats = AggregateStats::reduce(run.outcomes(), Some(run.elapsed));
            info!("{}: {}", spec.name(), stats);

            let cache_after = self.cache_snapshot().await;
            scenarios.push(ScenarioReport {
                config: spec.config().clone(),
                stats,
                cache_after,
                outcomes: run.into_outcomes(),
            });
        }

        let overall = AggregateStats::reduce(
            scenarios.iter().flat_map(|s| s.outcomes.iter()),
            Some(elapsed),
        );

        let after = match &self.probe {
            Some(probe) => probe.snapshot().await,
            None => ProbeSnapshot::default(),
        };

        Ok(RunReport {
            started_at,
            target: self.target,
            warmup,
            scenarios,
            overall,
            before,
            after,
        })
    }

    async fn preflight(&self) -> Result<ProbeSnapshot, RunError> {
        let Some(probe) = &self.probe else {
            debug!("No probe configured, skipping pre-flight check");
            return Ok(ProbeSnapshot::default());
        };

        let health = probe.health().await.map_err(|err| {
            error!("Pre-flight check failed: {err}");
            err
        })?;
        info!("Service at {} is {health}", self.target);

        let mut snapshot = probe.snapshot().await;
        snapshot.health.get_or_insert(health);
        Ok(snapshot)
    }

    #[instrument(name = "scenario", skip_all, fields(name = spec.name()))]
    async fn run_scenario(&self, spec: &ScenarioSpec) -> Result<ScheduledRun, ConfigError> {
        let config = spec.config();
        info!("Running {config}");

        if config.clear_cache {
            match &self.probe {
                Some(probe) => match probe.clear_cache().await {
                    Ok(()) => info!("Cache cleared"),
                    Err(err) => warn!("Cache clear failed, continuing: {err}"),
                },
                None => debug!("No probe configured, not clearing cache"),
            }
        }

        let plan = BatchPlan::new(config.requests, config.concurrency)?;
        let run = ConcurrencyScheduler::new(plan)
            .delay(config.delay)
            .run(&self.executor, spec.source().as_ref())
            .await;

        info!("Scenario complete in {:.2?}", run.elapsed);
        Ok(run)
    }

    async fn cache_snapshot(&self) -> Option<CacheSnapshot> {
        let probe = self.probe.as_ref()?;
        match probe.cache_stats().await {
            Ok(cache) if !cache.is_empty() => Some(cache),
            Ok(_) => None,
            Err(err) => {
                warn!("Cache stats unavailable: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qrload_core::{FailureKind, Outcome, RequestSpec, ScenarioConfig};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replies instantly; requests for `"cold"` data miss the cache, everything else hits.
    #[derive(Default)]
    struct FakeExecutor {
        issued: AtomicUsize,
    }

    impl Execute for FakeExecutor {
        async fn execute(&self, request: RequestSpec) -> Outcome {
            self.issued.fetch_add(1, Ordering::SeqCst);
            match request.body["data"].as_str() {
                Some("cold") => Outcome::success(Duration::from_millis(50), 200, false, 100),
                Some("broken") => {
                    Outcome::failure(Duration::from_millis(1), 500, FailureKind::Http, "HTTP 500")
                }
                _ => Outcome::success(Duration::from_millis(10), 200, true, 100),
            }
        }
    }

    fn spec(name: &str, data: &'static str, requests: usize) -> ScenarioSpec {
        ScenarioSpec::new(
            ScenarioConfig::new(name).requests(requests).concurrency(4),
            move |_idx: usize| RequestSpec::new("/api/qr/generate", json!({ "data": data })),
        )
    }

    fn runner() -> Runner<FakeExecutor> {
        Runner::with_executor(FakeExecutor::default(), None, "fake")
    }

    #[test]
    fn validation() {
        assert_eq!(runner().validate(), Err(ConfigError::NoScenarios));

        let dup = runner()
            .scenario(spec("a", "x", 1))
            .scenario(spec("a", "y", 1));
        assert_eq!(dup.validate(), Err(ConfigError::DuplicateName("a".to_string())));

        let zero = runner().scenario(ScenarioSpec::new(
            ScenarioConfig::new("zero").concurrency(0),
            |_idx: usize| RequestSpec::new("/", json!({})),
        ));
        assert_eq!(zero.validate(), Err(ConfigError::InvalidConcurrency(0)));
    }

    #[tokio::test]
    async fn invalid_configuration_issues_nothing() {
        let runner = runner()
            .scenario(spec("ok", "x", 10))
            .scenario(spec("", "x", 10));
        let executor = runner.executor.clone();

        let err = runner.run().await.unwrap_err();
        assert!(matches!(err, RunError::Config(ConfigError::EmptyName)));
        assert_eq!(executor.issued.load(Ordering::SeqCst), 0);
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn scenarios_and_overall() {
        let runner = runner()
            .warmup(spec("warmup", "cold", 3))
            .scenario(spec("cold", "cold", 10))
            .scenario(spec("warm", "warm", 10))
            .scenario(spec("broken", "broken", 5));
        let executor = runner.executor.clone();

        let report = runner.run().await.unwrap();
        assert_eq!(executor.issued.load(Ordering::SeqCst), 28);

        let names: Vec<_> = report.scenarios.iter().map(|s| s.config.name.as_str()).collect();
        assert_eq!(names, ["cold", "warm", "broken"]);

        let cold = &report.scenario("cold").unwrap().stats;
        assert_eq!((cold.total, cold.cache_hits), (10, 0));
        let warm = &report.scenario("warm").unwrap().stats;
        assert_eq!(warm.cache_hit_rate, 100.0);
        let broken = &report.scenario("broken").unwrap().stats;
        assert_eq!((broken.successful, broken.failed), (0, 5));
        assert!(broken.latency.is_none());

        // Warm-up traffic is reported, but kept out of the overall numbers.
        assert_eq!(report.warmup.as_ref().unwrap().total, 3);
        assert_eq!(report.overall.total, 25);
        assert_eq!(report.overall.successful, 20);
        assert_eq!(report.overall.cache_hits, 10);
        assert_eq!(report.overall.speedup, Some(5.0));
        assert_eq!(report.overall, AggregateStats::reduce(report.outcomes(), report.overall.elapsed));

        assert!(report.before.is_empty());
        assert!(report.after.is_empty());
        assert!(logs_contain("Running cold"));
    }
}
