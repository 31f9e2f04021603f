//! Stand-in for the QR rendering service.
//!
//! Renders fake SVGs with a configurable latency and keeps them in an in-memory cache keyed by
//! the request body. Individual requests can ask for misbehavior through their `options`:
//!
//! - `delay_ms`: respond after this many milliseconds instead of the configured latency
//! - `status`: respond with this HTTP status
//! - `respond`: `"garbage"` for a non-JSON 200, `"reject"` for a 200 with `success: false`,
//!   `"legacy"` for the old `from_cache`/`svgString` field names
use axum::{
    debug_handler,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
#[allow(unused)]
use metrics::{counter, gauge, histogram};
use rand_distr::{Distribution, Normal};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

pub use axum::http::StatusCode as HealthStatus;

pub mod prelude {
    pub use super::{spawn, MockConfig, MockService};
}

pub const VERSION: &str = "mock-0.2.0";

#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Latency of a cache miss.
    pub delay: Duration,
    /// Latency of a cache hit.
    pub hit_delay: Duration,
    /// Standard deviation applied to every delay.
    pub jitter: Option<Duration>,
    pub cache: bool,
    /// Requests per second above which `/api/qr/generate` answers 429.
    pub rate_limit: Option<NonZeroU32>,
    pub healthy: bool,
    /// Status `/health` answers with while healthy.
    pub health_status: StatusCode,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(20),
            hit_delay: Duration::from_millis(2),
            jitter: None,
            cache: true,
            rate_limit: None,
            healthy: true,
            health_status: StatusCode::OK,
        }
    }
}

impl MockConfig {
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn hit_delay(mut self, delay: Duration) -> Self {
        self.hit_delay = delay;
        self
    }

    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.jitter = Some(jitter);
        self
    }

    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    pub fn rate_limit(mut self, tps: u32) -> Self {
        self.rate_limit = NonZeroU32::new(tps);
        self
    }

    pub fn healthy(mut self, healthy: bool) -> Self {
        self.healthy = healthy;
        self
    }

    pub fn health_status(mut self, status: StatusCode) -> Self {
        self.health_status = status;
        self
    }
}

struct AppState {
    config: MockConfig,
    healthy: AtomicBool,
    limiter: Option<DefaultDirectRateLimiter>,
    cache: RwLock<HashMap<String, String>>,
    hits: AtomicU64,
    misses: AtomicU64,
    generated: AtomicU64,
    probes: AtomicU64,
}

impl AppState {
    fn new(config: MockConfig) -> Self {
        Self {
            healthy: AtomicBool::new(config.healthy),
            limiter: config
                .rate_limit
                .map(|tps| RateLimiter::direct(Quota::per_second(tps))),
            config,
            cache: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            generated: AtomicU64::new(0),
            probes: AtomicU64::new(0),
        }
    }

    fn cache_size(&self) -> usize {
        self.cache.read().map(|cache| cache.len()).unwrap_or(0)
    }

    fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let total = hits + self.misses.load(Ordering::Relaxed);
        if total == 0 {
            0.
        } else {
            hits as f64 / total as f64 * 100.
        }
    }

    fn jittered(&self, delay: Duration) -> Duration {
        let Some(jitter) = self.config.jitter else {
            return delay;
        };
        match Normal::new(delay.as_secs_f64(), jitter.as_secs_f64()) {
            Ok(normal) => Duration::from_secs_f64(normal.sample(&mut rand::thread_rng()).max(0.)),
            Err(_) => delay,
        }
    }
}

pub fn router(config: MockConfig) -> Router {
    app(Arc::new(AppState::new(config)))
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/api/qr/cache/stats", get(cache_stats))
        .route("/api/qr/cache/clear", post(cache_clear))
        .route("/api/qr/generate", post(generate))
        // Pre-API path still served by older deployments.
        .route("/generate", post(generate))
        .route("/api/qr/batch", post(batch))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until the process exits.
pub async fn run(addr: SocketAddr, config: MockConfig) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Mock QR service listening on {}", listener.local_addr()?);
    axum::serve(listener, router(config)).await?;
    Ok(())
}

/// Handle to a mock service running in the background on an ephemeral port.
pub struct MockService {
    addr: SocketAddr,
    state: Arc<AppState>,
    handle: JoinHandle<()>,
}

pub async fn spawn(config: MockConfig) -> anyhow::Result<MockService> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = Arc::new(AppState::new(config));
    let app = app(state.clone());

    let handle = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!("Mock service stopped: {err}");
        }
    });

    debug!("Mock QR service spawned on {addr}");
    Ok(MockService {
        addr,
        state,
        handle,
    })
}

impl MockService {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests received on the render endpoints, including rejected ones.
    pub fn generated(&self) -> u64 {
        self.state.generated.load(Ordering::SeqCst)
    }

    /// Requests received on the housekeeping endpoints.
    pub fn probes(&self) -> u64 {
        self.state.probes.load(Ordering::SeqCst)
    }

    pub fn cache_hits(&self) -> u64 {
        self.state.hits.load(Ordering::SeqCst)
    }

    pub fn cache_size(&self) -> usize {
        self.state.cache_size()
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.state.healthy.store(healthy, Ordering::SeqCst);
    }
}

impl Drop for MockService {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/** Housekeeping **/

#[debug_handler]
async fn health(State(state): State<Arc<AppState>>) -> Response {
    state.probes.fetch_add(1, Ordering::SeqCst);
    if state.healthy.load(Ordering::SeqCst) {
        (
            state.config.health_status,
            Json(json!({ "status": "healthy" })),
        )
            .into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy" })),
        )
            .into_response()
    }
}

#[debug_handler]
async fn status(State(state): State<Arc<AppState>>) -> Json<Value> {
    state.probes.fetch_add(1, Ordering::SeqCst);
    let status = if state.healthy.load(Ordering::SeqCst) {
        "healthy"
    } else {
        "unhealthy"
    };
    Json(json!({
        "status": status,
        "version": VERSION,
        "cache_stats": {
            "cache_hits": state.hits.load(Ordering::SeqCst),
            "cache_misses": state.misses.load(Ordering::SeqCst),
            "cache_size": state.cache_size(),
            "cache_hit_rate_percent": state.hit_rate(),
        }
    }))
}

#[debug_handler]
async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<Value> {
    state.probes.fetch_add(1, Ordering::SeqCst);
    let memory: usize = state
        .cache
        .read()
        .map(|cache| cache.iter().map(|(k, v)| k.len() + v.len()).sum())
        .unwrap_or(0);
    Json(json!({
        "success": true,
        "stats": {
            "hits": state.hits.load(Ordering::SeqCst),
            "misses": state.misses.load(Ordering::SeqCst),
            "total_keys": state.cache_size(),
            "hit_rate": state.hit_rate(),
            "mode": "memory",
            "memory_mb": memory as f64 / (1024. * 1024.),
        }
    }))
}

#[debug_handler]
async fn cache_clear(State(state): State<Arc<AppState>>) -> Response {
    state.probes.fetch_add(1, Ordering::SeqCst);
    let Ok(mut cache) = state.cache.write() else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    let cleared = cache.len();
    cache.clear();
    info!("Cleared {cleared} cached entries");
    Json(json!({ "success": true, "message": format!("Cleared {cleared} entries") }))
        .into_response()
}

/** Rendering **/

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    data: Value,
    #[serde(default)]
    options: Value,
}

#[derive(Debug, Deserialize)]
struct BatchRequest {
    #[serde(alias = "codes")]
    requests: Vec<Value>,
}

#[debug_handler]
async fn generate(State(state): State<Arc<AppState>>, Json(req): Json<GenerateRequest>) -> Response {
    state.generated.fetch_add(1, Ordering::SeqCst);
    counter!("mock-service.generate").increment(1);

    if let Some(limiter) = &state.limiter {
        if limiter.check().is_err() {
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "success": false, "error": "rate limited" })),
            )
                .into_response();
        }
    }

    let start = Instant::now();
    let key = format!("{}|{}", req.data, req.options);
    let hit = state.config.cache
        && state
            .cache
            .read()
            .map(|cache| cache.contains_key(&key))
            .unwrap_or(false);

    let delay = match req.options.get("delay_ms").and_then(Value::as_u64) {
        Some(ms) => Duration::from_millis(ms),
        None if hit => state.jittered(state.config.hit_delay),
        None => state.jittered(state.config.delay),
    };
    tokio::time::sleep(delay).await;

    if let Some(code) = req.options.get("status").and_then(Value::as_u64) {
        let code = u16::try_from(code)
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (code, Json(json!({ "success": false, "error": "forced status" }))).into_response();
    }

    let respond = req.options.get("respond").and_then(Value::as_str);
    match respond {
        Some("garbage") => return (StatusCode::OK, "<html>upstream hiccup</html>").into_response(),
        Some("reject") => {
            return Json(json!({ "success": false, "error": { "message": "invalid customization" } }))
                .into_response()
        }
        _ => {}
    }

    let svg = render(&req.data);
    if state.config.cache {
        if hit {
            state.hits.fetch_add(1, Ordering::SeqCst);
        } else {
            state.misses.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut cache) = state.cache.write() {
                cache.insert(key, svg.clone());
            }
        }
    }

    let elapsed = start.elapsed().as_secs_f64() * 1e3;
    histogram!("mock-service.latency_ms").record(elapsed);

    let body = if respond == Some("legacy") {
        json!({ "success": true, "from_cache": hit, "svgString": svg })
    } else {
        json!({ "success": true, "cached": hit, "svg": svg, "processing_time_ms": elapsed })
    };
    Json(body).into_response()
}

#[debug_handler]
async fn batch(State(state): State<Arc<AppState>>, Json(req): Json<BatchRequest>) -> Json<Value> {
    state.generated.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(state.jittered(state.config.delay)).await;

    let results: Vec<_> = req
        .requests
        .iter()
        .map(|item| {
            let data = item.get("data").cloned().unwrap_or(Value::Null);
            json!({ "id": item.get("id"), "success": true, "svg": render(&data) })
        })
        .collect();

    let svg = results
        .iter()
        .filter_map(|r| r["svg"].as_str())
        .collect::<String>();
    Json(json!({
        "success": true,
        "cached": false,
        "total": results.len(),
        "results": results,
        "svg": svg,
    }))
}

fn render(data: &Value) -> String {
    format!(r#"<svg xmlns="http://www.w3.org/2000/svg"><desc>{data}</desc></svg>"#)
}
