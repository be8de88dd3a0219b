use thiserror::Error;

/// Problems found while loading or validating a run configuration.
///
/// All of these are fatal at startup; nothing in here is raised once the
/// virtual users are running.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No scenarios configured")]
    NoScenarios,

    #[error("Scenario name must not be empty")]
    EmptyName,

    #[error("Scenario `{0}` is defined more than once")]
    DuplicateScenario(String),

    #[error("Scenario `{0}` must have at least one virtual user")]
    ZeroVus(String),

    #[error("Scenario `{0}` must have a non-zero duration")]
    ZeroDuration(String),

    #[error("Scenario `{scenario}`: {field} is too long to schedule")]
    OutOfRange { scenario: String, field: &'static str },

    #[error("Scenario `{0}` must have a non-zero key space")]
    ZeroKeySpace(String),

    #[error("Invalid operation weights: {0}")]
    InvalidWeights(String),

    #[error("Unknown metric `{0}`")]
    UnknownMetric(String),

    #[error("Invalid threshold expression `{expr}`: {reason}")]
    InvalidThreshold { expr: String, reason: String },

    #[error("Aggregation `{aggregation}` is not available for metric `{metric}`")]
    UnsupportedAggregation { metric: String, aggregation: String },

    #[error("Unknown scenario `{0}`")]
    UnknownScenario(String),
}
