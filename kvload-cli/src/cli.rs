use clap::Parser;
use kvload::core::{ConfigError, RunConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Drive reads, writes and deletes against a key-value HTTP service and check the results
/// against thresholds.
///
/// Exits with 0 when every threshold passes, 99 when one is crossed and 1 on errors.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct KvloadCli {
    /// JSON run configuration. Without one, the built-in three-scenario run is used.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Base URL of the key-value service.
    #[arg(short, long)]
    pub target: Option<Url>,

    /// Virtual users for every scenario.
    #[arg(long)]
    pub vus: Option<usize>,

    /// Duration of every scenario (e.g. `30s`, `5m`).
    #[arg(short, long, value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// Pause after each iteration (e.g. `100ms`).
    #[arg(long, value_parser = humantime::parse_duration)]
    pub pause: Option<Duration>,

    /// Per-request timeout (e.g. `10s`).
    #[arg(long, value_parser = humantime::parse_duration)]
    pub request_timeout: Option<Duration>,

    /// Seed for the virtual users' random generators; random when omitted.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Accept invalid TLS certificates.
    #[arg(long)]
    pub insecure_skip_tls_verify: Option<bool>,

    /// Open a new connection for every request.
    #[arg(long)]
    pub no_connection_reuse: bool,

    /// Only run the named scenario. May be repeated.
    #[arg(short('s'), long = "scenario")]
    pub scenarios: Vec<String>,

    /// Write the end-of-run summary as JSON.
    #[arg(long)]
    pub summary_export: Option<PathBuf>,

    /// Write every observation as newline-delimited JSON.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Serve Prometheus metrics on this address while the run is in progress.
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}

impl KvloadCli {
    /// Loads the config file (or the defaults) and applies the flags on top of it.
    pub fn run_config(&self) -> Result<RunConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_file(path)?,
            None => RunConfig::default(),
        };

        if let Some(target) = &self.target {
            config.target = target.clone();
        }
        if let Some(timeout) = self.request_timeout {
            config.request_timeout = timeout;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(insecure) = self.insecure_skip_tls_verify {
            config.insecure_skip_tls_verify = insecure;
        }
        if self.no_connection_reuse {
            config.no_connection_reuse = true;
        }
        if !self.scenarios.is_empty() {
            config.retain_scenarios(&self.scenarios)?;
        }

        for scenario in &mut config.scenarios {
            if let Some(vus) = self.vus {
                scenario.vus = vus;
            }
            if let Some(duration) = self.duration {
                scenario.duration = duration;
            }
            if let Some(pause) = self.pause {
                scenario.pause = pause;
            }
        }

        config.validate()?;
        Ok(config)
    }
}
