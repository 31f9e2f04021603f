use mock_service::MockConfig;
use qrload::core::AggregateStats;
use qrload_tests::*;
use serde_json::json;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn hundred_requests_ten_at_a_time() {
    let mock = mock(
        MockConfig::default()
            .delay(Duration::from_millis(20))
            .cache(false),
    )
    .await
    .unwrap();

    let report = runner(&mock)
        .unwrap()
        .scenario(spec(scenario("steady", 100, 10), unique))
        .run()
        .await
        .unwrap();

    let stats = &report.scenario("steady").unwrap().stats;
    assert_eq!(stats.total, 100);
    assert_eq!(stats.successful, 100);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.cache_hits, 0);
    assert_eq!(stats.cache_hit_rate, 0.);
    assert!(stats.errors.is_empty());

    let latency = stats.latency.unwrap();
    assert!(latency.min >= 20., "min {}", latency.min);
    assert!(latency.mean < 40., "mean {}", latency.mean);
    assert!(latency.min <= latency.median && latency.median <= latency.p95);
    assert!(latency.p95 <= latency.p99 && latency.p99 <= latency.max);

    // Ten barrier-separated batches of at least 20ms each.
    assert!(stats.elapsed.unwrap() >= Duration::from_millis(200));
    assert!(stats.throughput_rps.unwrap() > 0.);

    assert_eq!(mock.generated(), 100);
    assert_eq!(&report.overall, stats);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn cold_then_warm_cache() {
    let mock = mock(
        MockConfig::default()
            .delay(Duration::from_millis(30))
            .hit_delay(Duration::from_millis(1)),
    )
    .await
    .unwrap();

    // Leftovers from an earlier run must not count as hits.
    prime_cache(&mock).await;

    let payload = |_idx: usize| render("https://example.com/test", json!({ "size": 300 }));
    let report = runner(&mock)
        .unwrap()
        .scenario(spec(scenario("cold", 20, 5).clear_cache(true), payload))
        .scenario(spec(scenario("warm", 20, 5), payload))
        .run()
        .await
        .unwrap();

    let cold = &report.scenario("cold").unwrap().stats;
    let warm = &report.scenario("warm").unwrap().stats;

    // The first batch races to fill the cache; everything after it hits.
    assert_eq!(cold.cache_hits, 15);
    assert_eq!(warm.cache_hits, 20);
    assert_eq!(warm.cache_hit_rate, 100.);
    assert!(cold.latency.unwrap().mean > warm.latency.unwrap().mean);
    assert!(report.overall.speedup.unwrap() > 1.);
    assert!(report.overall.bytes > 0);

    let cache = report.scenario("warm").unwrap().cache_after.as_ref().unwrap();
    assert_eq!(cache.size, Some(1));
    assert_eq!(cache.mode.as_deref(), Some("memory"));

    assert_eq!(report.before.health.as_deref(), Some("healthy"));
    assert_eq!(report.before.version.as_deref(), Some(mock_service::VERSION));
    assert_eq!(report.after.cache.as_ref().unwrap().hits, Some(35));
    assert_eq!(mock.cache_size(), 1);
}

/// Put an entry for the benchmark payload in the cache through a throwaway run.
async fn prime_cache(mock: &mock_service::MockService) {
    runner(mock)
        .unwrap()
        .scenario(spec(scenario("prime", 1, 1), |_idx: usize| {
            render("https://example.com/test", json!({ "size": 300 }))
        }))
        .run()
        .await
        .unwrap();
    assert_eq!(mock.cache_size(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn warmup_is_reported_separately() {
    let mock = mock(MockConfig::default().delay(Duration::from_millis(2)))
        .await
        .unwrap();

    let measured = spec(scenario("measured", 12, 4), unique);
    let report = runner(&mock)
        .unwrap()
        .warmup(measured.with_config(scenario("warmup", 6, 3)))
        .scenario(measured)
        .run()
        .await
        .unwrap();

    assert_eq!(report.warmup.as_ref().unwrap().total, 6);
    assert_eq!(report.overall.total, 12);
    assert_eq!(mock.generated(), 18);
    // The first six items were rendered during warm-up.
    assert_eq!(report.overall.cache_hits, 6);
    assert_eq!(
        report.overall,
        AggregateStats::reduce(report.outcomes(), report.overall.elapsed)
    );
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn legacy_field_names() {
    let mock = mock(MockConfig::default().delay(Duration::ZERO))
        .await
        .unwrap();

    let report = runner(&mock)
        .unwrap()
        .scenario(spec(scenario("legacy", 2, 1), |_idx: usize| {
            render("legacy", json!({ "respond": "legacy" }))
        }))
        .run()
        .await
        .unwrap();

    let outcomes = &report.scenario("legacy").unwrap().outcomes;
    assert!(outcomes.iter().all(|o| o.success && o.response_size_bytes > 0));
    assert!(!outcomes[0].cached);
    assert!(outcomes[1].cached);
}
