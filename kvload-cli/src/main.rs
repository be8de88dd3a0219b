mod cli;

use anyhow::Context;
use clap::Parser;
use cli::KvloadCli;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::process::ExitCode;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "kvload=info";

/// Exit status when the run completed but a threshold was crossed.
const EXIT_THRESHOLDS_CROSSED: u8 = 99;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    match run(KvloadCli::parse()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_THRESHOLDS_CROSSED),
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: KvloadCli) -> anyhow::Result<bool> {
    let config = args.run_config().context("Invalid configuration")?;

    if let Some(addr) = args.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Unable to start the metrics exporter")?;
        info!("Serving metrics on {addr}");
    }

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; stopping virtual users after their current request.");
            let _ = tx.send(true);
        }
    });

    let report = kvload::run_until(config, rx).await?;
    println!("{report}");

    if let Some(path) = &args.summary_export {
        report
            .export_summary(path)
            .with_context(|| format!("Unable to export summary to {}", path.display()))?;
    }
    if let Some(path) = &args.out {
        report
            .export_observations(path)
            .with_context(|| format!("Unable to export observations to {}", path.display()))?;
    }

    if !report.failures.is_empty() {
        anyhow::bail!("Run did not complete: {}", report.failures.join("; "));
    }
    Ok(report.passed())
}
