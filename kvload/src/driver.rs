//! Running every scenario of a [`RunConfig`] concurrently.
use crate::error::Error;
use crate::issuer::Issuer;
use crate::selector::WeightTable;
use crate::sink::ObservationSink;
use crate::virtual_user::{vu_seed, VirtualUser};
use kvload_core::{Observation, RunConfig, ScenarioConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::Instant;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

/// Observations and counters of one finished scenario.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    pub config: ScenarioConfig,
    pub observations: Vec<Observation>,
    pub iterations: u64,
    pub elapsed: Duration,
    /// Virtual users whose task panicked or was cancelled.
    pub failed_vus: usize,
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub scenarios: Vec<ScenarioRun>,
    pub elapsed: Duration,
    pub seed: u64,
    /// Scenarios or virtual users that did not finish normally. A run with any of these
    /// never passes.
    pub failures: Vec<String>,
}

impl RunOutcome {
    pub fn observations(&self) -> impl Iterator<Item = &Observation> + Clone {
        self.scenarios.iter().flat_map(|s| s.observations.iter())
    }
}

/// Launches the virtual users of every scenario and waits for all of them to stop.
pub struct Driver<I> {
    config: RunConfig,
    tables: Vec<Arc<WeightTable>>,
    issuer: Arc<I>,
    stop: watch::Receiver<bool>,
    // Keeps the default stop channel open so that VUs only stop at their deadline.
    _stop_tx: Option<watch::Sender<bool>>,
}

impl<I> Driver<I>
where
    I: Issuer + Send + Sync + 'static,
{
    /// Validates `config` up front; nothing is started until [`Driver::run`].
    pub fn new(config: RunConfig, issuer: I) -> Result<Self, Error> {
        config.validate()?;
        let tables = config
            .scenarios
            .iter()
            .map(|s| WeightTable::new(&s.exec.weights()).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        let (tx, rx) = watch::channel(false);
        Ok(Self {
            config,
            tables,
            issuer: Arc::new(issuer),
            stop: rx,
            _stop_tx: Some(tx),
        })
    }

    /// Stops every virtual user early once `true` is sent on the channel.
    pub fn with_stop_signal(mut self, stop: watch::Receiver<bool>) -> Self {
        self.stop = stop;
        self._stop_tx = None;
        self
    }

    pub async fn run(self) -> RunOutcome {
        let seed = self.config.seed.unwrap_or_else(rand::random);
        info!(
            "Starting {} scenarios against {} (seed {seed})",
            self.config.scenarios.len(),
            self.config.target
        );

        let start = Instant::now();
        let handles: Vec<_> = self
            .config
            .scenarios
            .iter()
            .cloned()
            .zip(self.tables.iter().cloned())
            .enumerate()
            .map(|(index, (scenario, table))| {
                let name = scenario.name.clone();
                let handle = tokio::spawn(
                    run_scenario(
                        index,
                        scenario,
                        table,
                        self.issuer.clone(),
                        seed,
                        self.stop.clone(),
                    )
                    .in_current_span(),
                );
                (name, handle)
            })
            .collect();

        let mut scenarios = Vec::with_capacity(handles.len());
        let mut failures = vec![];
        for (name, handle) in handles {
            match handle.await {
                Ok(run) => {
                    if run.failed_vus > 0 {
                        failures.push(format!(
                            "scenario {name}: {} virtual users failed",
                            run.failed_vus
                        ));
                    }
                    scenarios.push(run);
                }
                Err(err) => {
                    error!("Scenario {name} failed: {err}");
                    failures.push(format!("scenario {name}: {err}"));
                }
            }
        }

        RunOutcome {
            scenarios,
            elapsed: start.elapsed(),
            seed,
            failures,
        }
    }
}

#[instrument(name = "scenario", skip_all, fields(name = config.name))]
async fn run_scenario<I>(
    index: usize,
    config: ScenarioConfig,
    table: Arc<WeightTable>,
    issuer: Arc<I>,
    seed: u64,
    stop: watch::Receiver<bool>,
) -> ScenarioRun
where
    I: Issuer + Send + Sync + 'static,
{
    info!("Running {} with config {:?}", config.name, &config);

    let sink = ObservationSink::new(&config.name);
    let start = Instant::now();
    let Some(deadline) = start.checked_add(config.duration) else {
        error!("Duration {:?} cannot be scheduled", config.duration);
        let failed_vus = config.vus;
        return ScenarioRun {
            config,
            observations: vec![],
            iterations: 0,
            elapsed: Duration::ZERO,
            failed_vus,
        };
    };

    let mut users = JoinSet::new();
    for vu in 0..config.vus {
        let user = VirtualUser::new(
            vu,
            issuer.clone(),
            table.clone(),
            config.key_space,
            config.pause,
            deadline,
            vu_seed(seed, index, vu),
            sink.clone(),
            stop.clone(),
        );
        users.spawn(user.run().in_current_span());
    }
    debug!("Spawned {} virtual users", config.vus);

    let mut iterations = 0;
    let mut failed_vus = 0;
    while let Some(res) = users.join_next().await {
        match res {
            Ok(count) => iterations += count,
            Err(err) => {
                error!("Virtual user failed: {err}");
                failed_vus += 1;
            }
        }
    }

    let elapsed = start.elapsed();
    let observations = sink.drain();
    info!(
        "Scenario complete: {} iterations, {} observations",
        iterations,
        observations.len()
    );

    ScenarioRun {
        config,
        observations,
        iterations,
        elapsed,
        failed_vus,
    }
}
