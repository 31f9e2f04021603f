use clap::Parser;
use mock_service::MockConfig;
use qrload::core::RunReport;
use qrload_cli::Cli;
use qrload_tests::*;
use std::time::Duration;

fn cli(url: &str, extra: &[&str]) -> Cli {
    let args = ["qrload", "-u", url, "-r", "10", "-c", "5", "--seed", "1"];
    Cli::try_parse_from(args.iter().chain(extra)).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn standard_suite() {
    let mock = mock(MockConfig::default().delay(Duration::from_millis(1)))
        .await
        .unwrap();

    let report = qrload_cli::run(&cli(&mock.url(), &["--no-save"]))
        .await
        .unwrap();

    let names: Vec<_> = report
        .scenarios
        .iter()
        .map(|s| s.config.name.as_str())
        .collect();
    assert_eq!(
        names,
        ["basic-cold", "basic-warm", "medium", "advanced", "mixed-patterns", "batch"]
    );
    assert_eq!(report.overall.failed, 0, "{:?}", report.overall.errors);
    assert_eq!(report.overall.total, 38);
    assert_eq!(mock.generated(), 38);
    assert_eq!(report.scenario("basic-warm").unwrap().stats.cache_hit_rate, 100.);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn random_suite_with_report() {
    let mock = mock(MockConfig::default().delay(Duration::from_millis(1)))
        .await
        .unwrap();
    let path = std::env::temp_dir().join(format!("qrload-cli-{}.json", std::process::id()));

    let report = qrload_cli::run(&cli(
        &mock.url(),
        &["--suite", "random", "-w", "4", "-o", path.to_str().unwrap()],
    ))
    .await
    .unwrap();

    assert_eq!(report.scenarios.len(), 1);
    assert_eq!(report.warmup.as_ref().unwrap().total, 4);
    assert_eq!(mock.generated(), 14);

    let saved: RunReport = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(saved.overall.total, 10);
    assert_eq!(saved.scenarios[0].outcomes.len(), 10);
    assert_eq!(saved.scenarios[0].config.name, "random-customization");
    std::fs::remove_file(path).unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn legacy_endpoint_with_separate_housekeeping() {
    let target = mock(MockConfig::default().delay(Duration::from_millis(1)))
        .await
        .unwrap();
    let housekeeping = mock(MockConfig::default()).await.unwrap();

    let report = qrload_cli::run(&cli(
        &target.url(),
        &[
            "--suite",
            "random",
            "--endpoint",
            "/generate",
            "--probe-url",
            &housekeeping.url(),
            "--no-save",
        ],
    ))
    .await
    .unwrap();

    assert_eq!(report.overall.successful, 10);
    assert_eq!(target.generated(), 10);
    assert_eq!(target.probes(), 0);
    assert_eq!(housekeeping.generated(), 0);
    assert!(housekeeping.probes() > 0);
    assert_eq!(report.before.version.as_deref(), Some(mock_service::VERSION));
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn unhealthy_service_is_an_error() {
    let mock = mock(MockConfig::default().healthy(false)).await.unwrap();

    let err = qrload_cli::run(&cli(&mock.url(), &["--no-save"]))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Pre-flight"));
    assert_eq!(mock.generated(), 0);
}
