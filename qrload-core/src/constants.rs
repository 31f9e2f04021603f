use std::time::Duration;

/// Requests issued per scenario when none is given.
pub const DEFAULT_REQUESTS: usize = 1_000;

/// Requests in flight per batch when none is given.
pub const DEFAULT_CONCURRENCY: usize = 50;

/// Per-request timeout applied when a [`RequestSpec`](crate::RequestSpec) carries none.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub const HEALTH_ENDPOINT: &str = "/health";
pub const STATUS_ENDPOINT: &str = "/status";
pub const CACHE_STATS_ENDPOINT: &str = "/api/qr/cache/stats";
pub const CACHE_CLEAR_ENDPOINT: &str = "/api/qr/cache/clear";
pub const GENERATE_ENDPOINT: &str = "/api/qr/generate";
pub const BATCH_ENDPOINT: &str = "/api/qr/batch";

/// Response field carrying the cache-hit flag.
pub const CACHED_FIELD: &str = "cached";
/// Older service builds report the cache-hit flag under these names.
pub const CACHED_FIELD_ALIASES: &[&str] = &["from_cache"];

/// Response field carrying the rendered artifact, used as the size metric.
pub const ARTIFACT_FIELD: &str = "svg";
pub const ARTIFACT_FIELD_ALIASES: &[&str] = &["svgString"];

pub const P95: f64 = 0.95;
pub const P99: f64 = 0.99;
