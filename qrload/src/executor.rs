//! Single-request execution and outcome classification.
use crate::RunError;
use qrload_core::{
    FailureKind, Outcome, RequestSpec, ARTIFACT_FIELD, ARTIFACT_FIELD_ALIASES, CACHED_FIELD,
    CACHED_FIELD_ALIASES, DEFAULT_REQUEST_TIMEOUT,
};
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use std::error::Error as StdError;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::trace;
use url::Url;

/// Raw bodies kept for diagnostics are cut to this many bytes.
const MAX_DIAGNOSTIC_BODY: usize = 4096;

/// Issues one request and classifies what happened.
///
/// Implementations make exactly one attempt per call and never return an error: every failure
/// mode is folded into the returned [`Outcome`]. One executor is shared by every request of a
/// run, so it must be safe to use concurrently.
pub trait Execute: Send + Sync {
    fn execute(&self, request: RequestSpec) -> impl Future<Output = Outcome> + Send;
}

/// [`Execute`] implementation that POSTs the request body as JSON to the target service.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
    base: Url,
    timeout: Duration,
}

impl HttpExecutor {
    pub fn new(base: &str) -> Result<Self, RunError> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, Url::parse(base)?))
    }

    pub fn with_client(client: Client, base: Url) -> Self {
        Self {
            client,
            base: normalize_base(base),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Timeout for requests whose [`RequestSpec`] does not set one.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, url::ParseError> {
        endpoint_url(&self.base, endpoint)
    }

    async fn attempt(&self, url: Url, request: &RequestSpec) -> Result<Rendered, Failure> {
        let timeout = request.timeout.unwrap_or(self.timeout);
        let res = self
            .client
            .post(url)
            .json(&request.body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| Failure::transport(err, timeout))?;

        let status = res.status();
        if !status.is_success() {
            return Err(Failure::Http(status));
        }

        let body = res
            .bytes()
            .await
            .map_err(|err| Failure::transport(err, timeout))?;

        decode(status, &body)
    }
}

impl Execute for HttpExecutor {
    async fn execute(&self, request: RequestSpec) -> Outcome {
        let url = match self.endpoint_url(&request.endpoint) {
            Ok(url) => url,
            Err(err) => {
                return Outcome::failure(
                    Duration::ZERO,
                    0,
                    FailureKind::Transport,
                    format!("Invalid endpoint `{}`: {err}", request.endpoint),
                )
            }
        };

        let start = Instant::now();
        let res = self.attempt(url, &request).await;
        let latency = start.elapsed();

        let outcome = match res {
            Ok(rendered) => {
                Outcome::success(latency, rendered.status, rendered.cached, rendered.size)
            }
            Err(failure) => failure.into_outcome(latency),
        };

        trace!(
            endpoint = %request.endpoint,
            success = outcome.success,
            cached = outcome.cached,
            status = outcome.status_code,
            "{:.2}ms",
            outcome.latency_ms
        );

        #[cfg(feature = "metrics")]
        record_metrics(&outcome);

        outcome
    }
}

/// A successfully decoded response.
#[derive(Debug, PartialEq)]
struct Rendered {
    status: u16,
    cached: bool,
    size: u64,
}

#[derive(Debug, PartialEq)]
enum Failure {
    Transport(String),
    Timeout(Duration),
    Http(StatusCode),
    Decode {
        status: u16,
        reason: String,
        body: String,
    },
    Rejected {
        status: u16,
        reason: String,
    },
}

impl Failure {
    fn transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Failure::Timeout(timeout)
        } else {
            Failure::Transport(describe(&err.without_url()))
        }
    }

    fn into_outcome(self, latency: Duration) -> Outcome {
        match self {
            Failure::Transport(cause) => {
                Outcome::failure(latency, 0, FailureKind::Transport, cause)
            }
            Failure::Timeout(timeout) => Outcome::failure(
                latency,
                0,
                FailureKind::Timeout,
                format!(
                    "Request timed out after {}",
                    humantime::format_duration(timeout)
                ),
            ),
            Failure::Http(status) => Outcome::failure(
                latency,
                status.as_u16(),
                FailureKind::Http,
                format!("HTTP {}", status.as_u16()),
            ),
            Failure::Decode {
                status,
                reason,
                body,
            } => Outcome::failure(
                latency,
                status,
                FailureKind::Decode,
                format!("Malformed response body: {reason}"),
            )
            .with_body(body),
            Failure::Rejected { status, reason } => {
                Outcome::failure(latency, status, FailureKind::Rejected, reason)
            }
        }
    }
}

fn decode(status: StatusCode, body: &[u8]) -> Result<Rendered, Failure> {
    let status = status.as_u16();
    let decode_err = |reason: String| Failure::Decode {
        status,
        reason,
        body: diagnostic_body(body),
    };

    let value: Value = serde_json::from_slice(body).map_err(|err| decode_err(err.to_string()))?;
    let Value::Object(fields) = value else {
        return Err(decode_err("expected a JSON object".to_string()));
    };

    if let Some(false) = fields.get("success").and_then(Value::as_bool) {
        let reason = fields
            .get("error")
            .and_then(error_message)
            .unwrap_or_else(|| "Service reported failure".to_string());
        return Err(Failure::Rejected { status, reason });
    }

    let cached = lookup(&fields, CACHED_FIELD, CACHED_FIELD_ALIASES)
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let size = lookup(&fields, ARTIFACT_FIELD, ARTIFACT_FIELD_ALIASES)
        .and_then(Value::as_str)
        .map(|artifact| artifact.len() as u64)
        .unwrap_or(0);

    Ok(Rendered {
        status,
        cached,
        size,
    })
}

/// Canonical field first; aliases are only consulted when it is missing.
fn lookup<'a>(fields: &'a Map<String, Value>, name: &str, aliases: &[&str]) -> Option<&'a Value> {
    fields
        .get(name)
        .or_else(|| aliases.iter().find_map(|alias| fields.get(*alias)))
}

fn error_message(value: &Value) -> Option<String> {
    match value {
        Value::String(msg) => Some(msg.clone()),
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn diagnostic_body(body: &[u8]) -> String {
    let mut body = String::from_utf8_lossy(body).into_owned();
    if body.len() > MAX_DIAGNOSTIC_BODY {
        let mut end = MAX_DIAGNOSTIC_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}

/// Error message including its source chain, since reqwest keeps the useful part in sources.
fn describe(err: &dyn StdError) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}

pub(crate) fn normalize_base(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

pub(crate) fn endpoint_url(base: &Url, endpoint: &str) -> Result<Url, url::ParseError> {
    base.join(endpoint.trim_start_matches('/'))
}

#[cfg(feature = "metrics")]
fn record_metrics(outcome: &Outcome) {
    metrics::histogram!("qrload_request_latency_ms").record(outcome.latency_ms);
    if outcome.success {
        metrics::counter!("qrload_request_success").increment(1);
        if outcome.cached {
            metrics::counter!("qrload_cache_hit").increment(1);
        }
    } else {
        let kind = outcome
            .failure
            .map(|kind| kind.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        metrics::counter!("qrload_request_error", "kind" => kind).increment(1);
    }
}
