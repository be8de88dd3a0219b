use kvload_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Unable to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Unable to write export: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unable to serialize export: {0}")]
    Serialize(#[from] serde_json::Error),
}
