use qrload_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid base URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Unable to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Pre-flight check failed: {0}")]
    Preflight(#[from] ProbeError),
}

/// Failure to talk to one of the service's housekeeping endpoints.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{endpoint} is unreachable: {source}")]
    Unreachable {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("{endpoint} returned an unexpected body: {reason}")]
    Body { endpoint: String, reason: String },

    #[error("Invalid endpoint {endpoint}: {source}")]
    Url {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
}
