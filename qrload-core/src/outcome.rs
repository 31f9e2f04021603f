use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// A single request to issue against the target service.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    /// Path relative to the service base URL, e.g. `/api/qr/generate`.
    pub endpoint: String,
    pub body: Value,
    pub timeout: Option<Duration>,
}

impl RequestSpec {
    pub fn new(endpoint: impl Into<String>, body: Value) -> Self {
        Self {
            endpoint: endpoint.into(),
            body,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Why a request did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connection refused, DNS, reset, or an unreadable body stream.
    Transport,
    Timeout,
    /// Non-2xx status.
    Http,
    /// 2xx with a body that is not the expected JSON object.
    Decode,
    /// 2xx where the service itself reported `success: false`.
    Rejected,
    /// The request task panicked or was cancelled.
    Aborted,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Transport => "transport",
            FailureKind::Timeout => "timeout",
            FailureKind::Http => "http",
            FailureKind::Decode => "decode",
            FailureKind::Rejected => "rejected",
            FailureKind::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// The result of exactly one request. Never mutated once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub success: bool,
    pub latency_ms: f64,
    pub cached: bool,
    /// `0` when the request never got a status line back.
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    pub response_size_bytes: u64,
    /// Raw response body, kept only when it could not be decoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl Outcome {
    pub fn success(latency: Duration, status_code: u16, cached: bool, size: u64) -> Self {
        Self {
            success: true,
            latency_ms: as_millis(latency),
            cached,
            status_code,
            error: None,
            failure: None,
            response_size_bytes: size,
            body: None,
        }
    }

    pub fn failure(
        latency: Duration,
        status_code: u16,
        kind: FailureKind,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            latency_ms: as_millis(latency),
            cached: false,
            status_code,
            error: Some(error.into()),
            failure: Some(kind),
            response_size_bytes: 0,
            body: None,
        }
    }

    pub fn with_body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }

    pub fn latency(&self) -> Duration {
        Duration::from_secs_f64(self.latency_ms.max(0.) / 1e3)
    }

    /// Key used to group failures in the error breakdown.
    pub fn error_cause(&self) -> Option<&str> {
        if self.success {
            None
        } else {
            Some(self.error.as_deref().unwrap_or("unknown"))
        }
    }
}

fn as_millis(latency: Duration) -> f64 {
    latency.as_nanos() as f64 / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_is_never_cached() {
        let outcome = Outcome::failure(
            Duration::from_millis(3),
            503,
            FailureKind::Http,
            "HTTP 503",
        );
        assert!(!outcome.success);
        assert!(!outcome.cached);
        assert_eq!(outcome.response_size_bytes, 0);
        assert_eq!(outcome.error_cause(), Some("HTTP 503"));
    }

    #[test]
    fn latency_is_milliseconds() {
        let outcome = Outcome::success(Duration::from_micros(20_500), 200, true, 12);
        assert!((outcome.latency_ms - 20.5).abs() < 1e-9);
        assert_eq!(outcome.latency().as_millis(), 20);
        assert_eq!(outcome.error_cause(), None);
    }

    #[test]
    fn diagnostics_are_omitted_when_absent() {
        let outcome = Outcome::success(Duration::from_millis(1), 200, false, 0);
        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json.get("error").is_none());
        assert!(json.get("body").is_none());

        let decode = Outcome::failure(Duration::ZERO, 200, FailureKind::Decode, "bad json")
            .with_body("<html>".to_string());
        let json = serde_json::to_value(&decode).unwrap();
        assert_eq!(json["failure"], "decode");
        assert_eq!(json["body"], "<html>");
    }
}
