//! Housekeeping calls against the target service: health, cache statistics, status and cache
//! clearing.
use crate::executor::{endpoint_url, normalize_base, HttpExecutor};
use crate::ProbeError;
use qrload_core::{
    CacheSnapshot, ProbeSnapshot, CACHE_CLEAR_ENDPOINT, CACHE_STATS_ENDPOINT, HEALTH_ENDPOINT,
    STATUS_ENDPOINT,
};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Map, Value};
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use url::Url;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ServiceProbe {
    client: Client,
    base: Url,
    timeout: Duration,
}

impl ServiceProbe {
    pub fn new(client: Client, base: Url) -> Self {
        Self {
            client,
            base: normalize_base(base),
            timeout: PROBE_TIMEOUT,
        }
    }

    /// Shares the executor's connection pool and base URL.
    pub fn from_executor(executor: &HttpExecutor) -> Self {
        Self::new(executor.client().clone(), executor.base_url().clone())
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Returns the reported `status` (e.g. `"healthy"`). Anything but a 200 carrying a `status`
    /// field is an error.
    pub async fn health(&self) -> Result<String, ProbeError> {
        let body = self
            .call_expecting(Method::GET, HEALTH_ENDPOINT, |status| status == StatusCode::OK)
            .await?;
        match body.get("status") {
            Some(Value::String(status)) => Ok(status.clone()),
            Some(other) => Ok(other.to_string()),
            None => Err(ProbeError::Body {
                endpoint: HEALTH_ENDPOINT.to_string(),
                reason: "missing `status` field".to_string(),
            }),
        }
    }

    pub async fn cache_stats(&self) -> Result<CacheSnapshot, ProbeError> {
        let body = self.call(Method::GET, CACHE_STATS_ENDPOINT).await?;
        let stats = match body.get("stats") {
            Some(Value::Object(stats)) => stats,
            _ => &body,
        };
        Ok(parse_cache(stats))
    }

    /// Service version and the cache block of `/status`. Returns the snapshot with `health` set
    /// from the `status` field.
    pub async fn status(&self) -> Result<ProbeSnapshot, ProbeError> {
        let body = self.call(Method::GET, STATUS_ENDPOINT).await?;
        let cache = match body.get("cache_stats") {
            Some(Value::Object(stats)) => Some(parse_cache(stats)).filter(|c| !c.is_empty()),
            _ => None,
        };
        Ok(ProbeSnapshot {
            health: str_field(&body, "status"),
            version: str_field(&body, "version"),
            cache,
        })
    }

    pub async fn clear_cache(&self) -> Result<(), ProbeError> {
        let body = self.call(Method::POST, CACHE_CLEAR_ENDPOINT).await?;
        if let Some(message) = body.get("message").and_then(Value::as_str) {
            debug!("Cache cleared: {message}");
        }
        Ok(())
    }

    /// Best-effort picture of the service. Never fails; whatever could not be fetched is left
    /// empty.
    pub async fn snapshot(&self) -> ProbeSnapshot {
        let mut snapshot = match self.status().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                debug!("Status unavailable: {err}");
                ProbeSnapshot::default()
            }
        };

        if snapshot.health.is_none() {
            snapshot.health = self.health().await.ok();
        }

        match self.cache_stats().await {
            Ok(cache) if !cache.is_empty() => snapshot.cache = Some(cache),
            Ok(_) => {}
            Err(err) => warn!("Cache stats unavailable: {err}"),
        }

        snapshot
    }

    async fn call(&self, method: Method, endpoint: &str) -> Result<Map<String, Value>, ProbeError> {
        self.call_expecting(method, endpoint, |status| status.is_success())
            .await
    }

    async fn call_expecting(
        &self,
        method: Method,
        endpoint: &str,
        accept: fn(StatusCode) -> bool,
    ) -> Result<Map<String, Value>, ProbeError> {
        let url = endpoint_url(&self.base, endpoint).map_err(|source| ProbeError::Url {
            endpoint: endpoint.to_string(),
            source,
        })?;

        let res = self
            .client
            .request(method, url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| ProbeError::Unreachable {
                endpoint: endpoint.to_string(),
                source: source.without_url(),
            })?;

        let status = res.status();
        if !accept(status) {
            return Err(ProbeError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let body = res.bytes().await.map_err(|source| ProbeError::Unreachable {
            endpoint: endpoint.to_string(),
            source: source.without_url(),
        })?;

        match serde_json::from_slice(&body) {
            Ok(Value::Object(fields)) => Ok(fields),
            Ok(_) => Err(ProbeError::Body {
                endpoint: endpoint.to_string(),
                reason: "expected a JSON object".to_string(),
            }),
            Err(err) => Err(ProbeError::Body {
                endpoint: endpoint.to_string(),
                reason: err.to_string(),
            }),
        }
    }
}

/// Service builds name their counters differently; take the first spelling present.
fn parse_cache(stats: &Map<String, Value>) -> CacheSnapshot {
    let uint = |keys: &[&str]| keys.iter().find_map(|k| stats.get(*k).and_then(Value::as_u64));
    let float = |keys: &[&str]| keys.iter().find_map(|k| stats.get(*k).and_then(Value::as_f64));

    CacheSnapshot {
        hits: uint(&["hits", "cache_hits"]),
        misses: uint(&["misses", "cache_misses"]),
        size: uint(&["size", "total_keys", "cache_size"]),
        hit_rate: float(&["hit_rate", "cache_hit_rate_percent"]),
        mode: str_field(stats, "mode"),
        memory_mb: float(&["memory_mb"]),
    }
}

fn str_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(Value::as_str).map(str::to_string)
}
