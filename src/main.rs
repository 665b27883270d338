use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use varnish_agent::collector::PeriodicRunner;
use varnish_agent::config::{configure, load_config, LogLevel};
use varnish_agent::sink::JsonLinesSink;
use varnish_agent::source::{SnapshotSource, VarnishstatSource};
use varnish_agent::util::logging;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "varnish-agent", version, about = "Collects Varnish statistics as metric samples")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Run a single collection pass and exit
    #[arg(long)]
    once: bool,

    /// Override the configured log level
    #[arg(short, long)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    logging::init(args.log_level.unwrap_or(config.log_level))?;

    info!("varnish-agent {} starting (variant {})", varnish_agent::VERSION, config.variant);

    let registry = configure(&config.plugin, config.variant);
    let source: Arc<dyn SnapshotSource> =
        Arc::new(VarnishstatSource::new(config.varnishstat.clone(), config.variant));
    let sink = Arc::new(JsonLinesSink::stdout());

    let mut runner = PeriodicRunner::new(config.collector_config(), &registry, source, sink);

    if args.once {
        let mut failures = 0;
        for result in runner.run_once().await {
            match result {
                Ok(report) => info!(
                    "{}: {} samples emitted, {} skipped, {} failed",
                    report.instance, report.emitted, report.skipped, report.failed
                ),
                Err(e) => {
                    failures += 1;
                    error!("{}", e);
                }
            }
        }
        if failures > 0 {
            warn!("{} instance(s) could not be read", failures);
        }
        return Ok(());
    }

    runner.start();
    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
    info!("Shutting down");
    runner.stop();
    runner.wait().await;

    Ok(())
}
