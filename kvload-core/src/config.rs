use crate::{
    ConfigError, OperationKind, Thresholds, DEFAULT_DURATION, DEFAULT_KEY_SPACE, DEFAULT_PAUSE,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_TARGET, DEFAULT_VUS, WEIGHT_SUM_TOLERANCE,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds, DurationSecondsWithFrac};
use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use url::Url;

/// Relative frequency of each operation within a scenario. Must sum to one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationWeights {
    pub get: f64,
    pub put: f64,
    pub delete: f64,
}

impl OperationWeights {
    pub fn new(get: f64, put: f64, delete: f64) -> Self {
        Self { get, put, delete }
    }

    pub fn weight(&self, operation: OperationKind) -> f64 {
        match operation {
            OperationKind::Get => self.get,
            OperationKind::Put => self.put,
            OperationKind::Delete => self.delete,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for op in OperationKind::ALL {
            let weight = self.weight(op);
            if !weight.is_finite() || weight < 0. {
                return Err(ConfigError::InvalidWeights(format!(
                    "weight for {op} must be a non-negative number, found {weight}"
                )));
            }
        }

        let sum: f64 = OperationKind::ALL.iter().map(|op| self.weight(*op)).sum();
        if sum == 0. {
            return Err(ConfigError::InvalidWeights(
                "at least one weight must be positive".to_string(),
            ));
        }
        if (sum - 1.).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::InvalidWeights(format!(
                "weights must sum to 1.0, found {sum}"
            )));
        }
        Ok(())
    }
}

/// What each iteration of a scenario does.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exec {
    /// Reads only.
    ReadHeavy,
    /// Writes only.
    WriteHeavy,
    /// 70% reads, 20% writes, 10% deletes.
    #[default]
    Mixed,
    Weighted(OperationWeights),
}

impl Exec {
    pub fn weights(&self) -> OperationWeights {
        match self {
            Self::ReadHeavy => OperationWeights::new(1., 0., 0.),
            Self::WriteHeavy => OperationWeights::new(0., 1., 0.),
            Self::Mixed => OperationWeights::new(0.7, 0.2, 0.1),
            Self::Weighted(weights) => *weights,
        }
    }
}

/// A named workload with its own concurrency and duration.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    pub vus: usize,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_duration")]
    pub duration: Duration,
    #[serde(default)]
    pub exec: Exec,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    #[serde(default = "default_pause")]
    pub pause: Duration,
    #[serde(default = "default_key_space")]
    pub key_space: u32,
}

impl ScenarioConfig {
    pub fn new(name: &str, exec: Exec) -> Self {
        Self {
            name: name.to_string(),
            vus: DEFAULT_VUS,
            duration: DEFAULT_DURATION,
            exec,
            pause: DEFAULT_PAUSE,
            key_space: DEFAULT_KEY_SPACE,
        }
    }

    pub fn vus(mut self, vus: usize) -> Self {
        self.vus = vus;
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn key_space(mut self, key_space: u32) -> Self {
        self.key_space = key_space;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.vus == 0 {
            return Err(ConfigError::ZeroVus(self.name.clone()));
        }
        if self.duration.is_zero() {
            return Err(ConfigError::ZeroDuration(self.name.clone()));
        }
        if self.key_space == 0 {
            return Err(ConfigError::ZeroKeySpace(self.name.clone()));
        }

        // Deadlines and wake-ups are computed as `Instant + Duration`.
        let now = Instant::now();
        for (field, value) in [("duration", self.duration), ("pause", self.pause)] {
            if now.checked_add(value).is_none() {
                return Err(ConfigError::OutOfRange {
                    scenario: self.name.clone(),
                    field,
                });
            }
        }
        self.exec.weights().validate()
    }
}

/// Everything needed to start a run. Built once and never changed while the run is in
/// progress.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_target")]
    pub target: Url,
    #[serde(default = "default_scenarios")]
    pub scenarios: Vec<ScenarioConfig>,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default = "default_insecure_skip_tls_verify")]
    pub insecure_skip_tls_verify: bool,
    #[serde(default)]
    pub no_connection_reuse: bool,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    /// Three 1000-VU, five minute scenarios (`readHeavy`, `writeHeavy`, `mixed`) against
    /// `http://localhost:8080`, failing above 1% errors or a 100ms p95.
    fn default() -> Self {
        Self {
            target: default_target(),
            scenarios: default_scenarios(),
            thresholds: Thresholds::default(),
            insecure_skip_tls_verify: default_insecure_skip_tls_verify(),
            no_connection_reuse: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            seed: None,
        }
    }
}

impl RunConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        debug!("Loading run config from {}", path.as_ref().display());
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scenarios.is_empty() {
            return Err(ConfigError::NoScenarios);
        }

        let mut names = HashSet::new();
        for scenario in &self.scenarios {
            scenario.validate()?;
            if !names.insert(scenario.name.as_str()) {
                return Err(ConfigError::DuplicateScenario(scenario.name.clone()));
            }
        }

        if self.thresholds.is_empty() {
            warn!("No thresholds configured; every run will pass.");
        }
        Ok(())
    }

    /// Keeps only the named scenarios, in their configured order.
    pub fn retain_scenarios(&mut self, names: &[String]) -> Result<(), ConfigError> {
        if let Some(unknown) = names
            .iter()
            .find(|name| !self.scenarios.iter().any(|s| &s.name == *name))
        {
            return Err(ConfigError::UnknownScenario(unknown.clone()));
        }
        self.scenarios.retain(|s| names.contains(&s.name));
        Ok(())
    }
}

fn default_target() -> Url {
    Url::parse(DEFAULT_TARGET).expect("default target is a valid URL")
}

fn default_scenarios() -> Vec<ScenarioConfig> {
    vec![
        ScenarioConfig::new("readHeavy", Exec::ReadHeavy),
        ScenarioConfig::new("writeHeavy", Exec::WriteHeavy),
        ScenarioConfig::new("mixed", Exec::Mixed),
    ]
}

fn default_duration() -> Duration {
    DEFAULT_DURATION
}

fn default_pause() -> Duration {
    DEFAULT_PAUSE
}

fn default_key_space() -> u32 {
    DEFAULT_KEY_SPACE
}

fn default_insecure_skip_tls_verify() -> bool {
    true
}

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}
