use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use mock_service::MockConfig;
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(version, about = "Mock QR rendering service")]
struct Cli {
    #[arg(short, long, default_value = "127.0.0.1:3002")]
    addr: SocketAddr,

    /// Latency of a cache miss, e.g. `20ms`
    #[arg(short, long, value_parser = humantime::parse_duration, default_value = "20ms")]
    delay: Duration,

    /// Latency of a cache hit
    #[arg(long, value_parser = humantime::parse_duration, default_value = "2ms")]
    hit_delay: Duration,

    /// Standard deviation added to every delay
    #[arg(long, value_parser = humantime::parse_duration)]
    jitter: Option<Duration>,

    #[arg(long)]
    no_cache: bool,

    /// Answer 429 above this many renders per second
    #[arg(long)]
    rate_limit: Option<u32>,

    /// Expose Prometheus metrics on this address
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter("mock_service=info,tower_http=debug")
        .init();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
    }

    let mut config = MockConfig::default()
        .delay(cli.delay)
        .hit_delay(cli.hit_delay)
        .cache(!cli.no_cache);
    if let Some(jitter) = cli.jitter {
        config = config.jitter(jitter);
    }
    if let Some(tps) = cli.rate_limit {
        config = config.rate_limit(tps);
    }

    mock_service::run(cli.addr, config).await
}
