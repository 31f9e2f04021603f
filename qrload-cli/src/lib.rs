//! Command line front end: suites of payloads, console output and report persistence around the
//! `qrload` engine.
pub mod args;
pub mod display;
pub mod payloads;
pub mod writer;

pub use args::{Cli, Suite};
pub use writer::{ReportWriter, WriteError};

use anyhow::Context;
use display::{ProbeBlock, ScenarioBlock, SummaryTable};
use metrics_exporter_prometheus::PrometheusBuilder;
use payloads::Entropy;
use qrload::core::RunReport;
use qrload::{HttpExecutor, Runner, ServiceProbe};
#[allow(unused)]
use tracing::{debug, error, info, warn};
use url::Url;

/// Run the selected suite and print its results.
///
/// Fails only when nothing was measured: bad configuration or an unreachable service. A report
/// that cannot be saved is logged and otherwise ignored.
pub async fn run(cli: &Cli) -> anyhow::Result<RunReport> {
    if let Some(addr) = cli.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Unable to start the metrics exporter")?;
        info!("Serving metrics on http://{addr}/metrics");
    }

    let executor = HttpExecutor::new(&cli.url)?.timeout(cli.timeout);

    let entropy = Entropy::new(cli.seed);
    let scenarios = payloads::suite(cli, &entropy);
    let probe = match &cli.probe_url {
        Some(probe_url) => {
            let base = Url::parse(probe_url)
                .with_context(|| format!("Invalid probe URL `{probe_url}`"))?;
            Some(ServiceProbe::new(executor.client().clone(), base))
        }
        None => None,
    };

    let mut runner = Runner::new(executor);
    if let Some(probe) = probe {
        runner = runner.probe(probe);
    }
    if let Some(warmup) = scenarios.first().and_then(|first| payloads::warmup(cli, first)) {
        runner = runner.warmup(warmup);
    }

    let report = runner.scenarios(scenarios).run().await?;

    println!("{}", ProbeBlock("before", &report.before));
    for scenario in &report.scenarios {
        println!("{}", ScenarioBlock(scenario));
    }
    println!("{}", SummaryTable(&report));
    println!("{}", ProbeBlock("after", &report.after));

    if !cli.no_save {
        match ReportWriter::new(cli.output.clone()).write(&report) {
            Ok(path) => info!("Detailed results saved to {}", path.display()),
            Err(err) => error!("{err}"),
        }
    }

    Ok(report)
}
