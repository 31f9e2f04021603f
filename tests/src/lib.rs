//! Shared fixtures for the integration tests.
use mock_service::{MockConfig, MockService};
use qrload::core::{RequestSpec, ScenarioConfig, GENERATE_ENDPOINT};
use qrload::{HttpExecutor, Runner, ScenarioSpec};
use serde_json::{json, Value};
use std::sync::OnceLock;
use tracing_subscriber::FmtSubscriber;

pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();
    ONCE_LOCK.get_or_init(|| {
        let _ = FmtSubscriber::builder()
            .with_env_filter("qrload=debug,mock_service=info")
            .with_test_writer()
            .try_init();
    });
}

pub async fn mock(config: MockConfig) -> anyhow::Result<MockService> {
    init();
    mock_service::spawn(config).await
}

pub fn runner(mock: &MockService) -> anyhow::Result<Runner<HttpExecutor>> {
    Ok(Runner::new(HttpExecutor::new(&mock.url())?))
}

/// A render request whose cache key is unique per index.
pub fn unique(idx: usize) -> RequestSpec {
    RequestSpec::new(GENERATE_ENDPOINT, json!({ "data": format!("item-{idx}") }))
}

pub fn render(data: &str, options: Value) -> RequestSpec {
    RequestSpec::new(GENERATE_ENDPOINT, json!({ "data": data, "options": options }))
}

pub fn scenario(name: &str, requests: usize, concurrency: usize) -> ScenarioConfig {
    ScenarioConfig::new(name)
        .requests(requests)
        .concurrency(concurrency)
}

pub fn spec<F>(config: ScenarioConfig, source: F) -> ScenarioSpec
where
    F: Fn(usize) -> RequestSpec + Send + Sync + 'static,
{
    ScenarioSpec::new(config, source)
}
