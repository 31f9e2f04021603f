use mock_service::{HealthStatus, MockConfig};
use qrload::core::{FailureKind, GENERATE_ENDPOINT};
use qrload::{HttpExecutor, ProbeError, RunError, Runner};
use qrload_tests::*;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
#[ntest::timeout(10_000)]
async fn unhealthy_service_aborts_before_load() {
    let mock = mock(MockConfig::default().healthy(false)).await.unwrap();

    let err = runner(&mock)
        .unwrap()
        .scenario(spec(scenario("never", 50, 10), unique))
        .run()
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            RunError::Preflight(ProbeError::Status { status: 503, .. })
        ),
        "{err}"
    );
    assert_eq!(mock.generated(), 0);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn health_must_be_exactly_ok() {
    let mock = mock(MockConfig::default().health_status(HealthStatus::ACCEPTED))
        .await
        .unwrap();

    let err = runner(&mock)
        .unwrap()
        .scenario(spec(scenario("never", 5, 5), unique))
        .run()
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            RunError::Preflight(ProbeError::Status { status: 202, .. })
        ),
        "{err}"
    );
    assert_eq!(mock.generated(), 0);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn unreachable_service_aborts() {
    init();
    let executor = HttpExecutor::new("http://127.0.0.1:9").unwrap();
    let err = Runner::new(executor)
        .scenario(spec(scenario("never", 5, 5), unique))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RunError::Preflight(ProbeError::Unreachable { .. })
    ));
    assert!(err.to_string().starts_with("Pre-flight check failed"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(10_000)]
async fn slow_requests_fail_alone() {
    let mock = mock(MockConfig::default().delay(Duration::from_millis(10)))
        .await
        .unwrap();
    let executor = HttpExecutor::new(&mock.url())
        .unwrap()
        .timeout(Duration::from_millis(200));

    let report = Runner::new(executor)
        .scenario(spec(scenario("isolation", 10, 10), |idx: usize| {
            let delay_ms = if idx == 3 || idx == 7 { 1_000 } else { 10 };
            render(&format!("item-{idx}"), json!({ "delay_ms": delay_ms }))
        }))
        .run()
        .await
        .unwrap();

    let scenario = report.scenario("isolation").unwrap();
    assert_eq!(scenario.stats.successful, 8);
    assert_eq!(scenario.stats.failed, 2);
    assert_eq!(
        scenario.stats.errors.get("Request timed out after 200ms"),
        Some(&2)
    );

    for (idx, outcome) in scenario.outcomes.iter().enumerate() {
        if idx == 3 || idx == 7 {
            assert_eq!(outcome.failure, Some(FailureKind::Timeout));
            assert_eq!(outcome.status_code, 0);
            assert!(!outcome.cached);
        } else {
            assert!(outcome.success, "request {idx}: {:?}", outcome.error);
            assert_eq!(outcome.status_code, 200);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(10_000)]
async fn every_failure_mode_is_an_outcome() {
    let mock = mock(MockConfig::default().delay(Duration::from_millis(1)))
        .await
        .unwrap();

    let report = runner(&mock)
        .unwrap()
        .scenario(spec(scenario("mixed", 8, 4), |idx: usize| {
            let data = format!("item-{idx}");
            match idx % 4 {
                0 => render(&data, json!({ "status": 503 })),
                1 => render(&data, json!({ "respond": "garbage" })),
                2 => render(&data, json!({ "respond": "reject" })),
                _ => render(&data, json!({})),
            }
        }))
        .run()
        .await
        .unwrap();

    let scenario = report.scenario("mixed").unwrap();
    assert_eq!(scenario.stats.total, 8);
    assert_eq!(scenario.stats.successful, 2);
    assert_eq!(scenario.stats.success_rate, 25.);
    assert_eq!(scenario.stats.errors.get("HTTP 503"), Some(&2));
    assert_eq!(scenario.stats.errors.get("invalid customization"), Some(&2));

    for (idx, outcome) in scenario.outcomes.iter().enumerate() {
        match idx % 4 {
            0 => {
                assert_eq!(outcome.failure, Some(FailureKind::Http));
                assert_eq!(outcome.status_code, 503);
            }
            1 => {
                assert_eq!(outcome.failure, Some(FailureKind::Decode));
                assert_eq!(outcome.status_code, 200);
                assert_eq!(outcome.body.as_deref(), Some("<html>upstream hiccup</html>"));
            }
            2 => assert_eq!(outcome.failure, Some(FailureKind::Rejected)),
            _ => assert!(outcome.success),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(10_000)]
async fn rate_limited_requests_fail() {
    let mock = mock(
        MockConfig::default()
            .delay(Duration::from_millis(1))
            .rate_limit(5),
    )
    .await
    .unwrap();

    let report = runner(&mock)
        .unwrap()
        .scenario(spec(scenario("burst", 20, 20), unique))
        .run()
        .await
        .unwrap();

    let stats = &report.scenario("burst").unwrap().stats;
    assert_eq!(stats.total, 20);
    assert!(stats.successful <= 6, "{stats}");
    assert_eq!(stats.errors.get("HTTP 429").copied(), Some(stats.failed));
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn unknown_endpoint_is_http_failure() {
    let mock = mock(MockConfig::default()).await.unwrap();

    let report = runner(&mock)
        .unwrap()
        .scenario(spec(scenario("missing", 2, 2), |_idx: usize| {
            qrload::core::RequestSpec::new(
                GENERATE_ENDPOINT.replace("generate", "missing"),
                json!({ "data": "x" }),
            )
        }))
        .run()
        .await
        .unwrap();

    let stats = &report.scenario("missing").unwrap().stats;
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.errors.get("HTTP 404"), Some(&2));
    assert!(stats.latency.is_none());
    assert!(stats.throughput_rps.is_none() || stats.throughput_rps == Some(0.));
}
