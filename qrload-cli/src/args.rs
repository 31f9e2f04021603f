use clap::builder::RangedU64ValueParser;
use clap::{Parser, ValueEnum};
use qrload::core::{DEFAULT_CONCURRENCY, DEFAULT_REQUESTS, GENERATE_ENDPOINT};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_URL: &str = "http://localhost:3002";

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Load test a QR rendering service and measure its cache")]
pub struct Cli {
    /// Requests per scenario
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_REQUESTS,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub requests: usize,

    /// Requests in flight at once
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_CONCURRENCY,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub concurrency: usize,

    /// Base URL of the service
    #[arg(short, long, default_value = DEFAULT_URL)]
    pub url: String,

    /// Render endpoint, relative to `--url`
    #[arg(short, long, default_value = GENERATE_ENDPOINT)]
    pub endpoint: String,

    /// Base URL for health checks and cache housekeeping, when not served by `--url`
    #[arg(long)]
    pub probe_url: Option<String>,

    /// Unmeasured requests issued before the first scenario
    #[arg(short, long, default_value_t = 0)]
    pub warmup: usize,

    /// Keep whatever the cache holds when the run starts
    #[arg(long)]
    pub skip_cache_clear: bool,

    /// Per-request timeout, e.g. `15s` or `500ms`
    #[arg(long, value_parser = humantime::parse_duration, default_value = "15s")]
    pub timeout: Duration,

    /// Pause between batches
    #[arg(long, value_parser = humantime::parse_duration)]
    pub delay: Option<Duration>,

    #[arg(long, value_enum, default_value_t = Suite::Standard)]
    pub suite: Suite,

    /// Where to write the JSON report. Defaults to `qrload_results_<unix time>.json`
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Do not write a JSON report
    #[arg(long, conflicts_with = "output")]
    pub no_save: bool,

    /// Expose Prometheus metrics on this address while running
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,

    /// Seed for randomized payloads
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suite {
    /// Cold and warm cache, increasing customization, mixed data and batch scenarios
    Standard,
    /// A single scenario of randomly customized codes
    Random,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["qrload"]).unwrap();
        assert_eq!(cli.requests, 1_000);
        assert_eq!(cli.concurrency, 50);
        assert_eq!(cli.url, DEFAULT_URL);
        assert_eq!(cli.endpoint, GENERATE_ENDPOINT);
        assert_eq!(cli.probe_url, None);
        assert_eq!(cli.warmup, 0);
        assert_eq!(cli.timeout, qrload::core::DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(cli.suite, Suite::Standard);
        assert!(!cli.skip_cache_clear);
    }

    #[test]
    fn short_flags() {
        let cli = Cli::try_parse_from([
            "qrload", "-r", "200", "-c", "20", "-u", "http://qr:8080", "-w", "10", "--timeout",
            "500ms", "--delay", "1s", "--suite", "random", "--seed", "7",
        ])
        .unwrap();
        assert_eq!(cli.requests, 200);
        assert_eq!(cli.concurrency, 20);
        assert_eq!(cli.url, "http://qr:8080");
        assert_eq!(cli.warmup, 10);
        assert_eq!(cli.timeout, Duration::from_millis(500));
        assert_eq!(cli.delay, Some(Duration::from_secs(1)));
        assert_eq!(cli.suite, Suite::Random);
        assert_eq!(cli.seed, Some(7));
    }

    #[test]
    fn separate_targets() {
        let cli = Cli::try_parse_from([
            "qrload", "-u", "http://gateway:3004", "-e", "/api/generate", "--probe-url",
            "http://qr:3002",
        ])
        .unwrap();
        assert_eq!(cli.endpoint, "/api/generate");
        assert_eq!(cli.probe_url.as_deref(), Some("http://qr:3002"));
    }

    #[test]
    fn rejects_zero() {
        assert!(Cli::try_parse_from(["qrload", "-c", "0"]).is_err());
        assert!(Cli::try_parse_from(["qrload", "-r", "0"]).is_err());
        assert!(Cli::try_parse_from(["qrload", "-c", "-3"]).is_err());
    }
}
