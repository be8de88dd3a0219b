#![cfg_attr(docsrs, feature(doc_cfg))]
//! kvload drives synthetic reads, writes and deletes against a key-value HTTP service and
//! judges the run against latency and error-rate thresholds.
//!
//! # Example
//! ```no_run
//! use kvload::prelude::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), kvload::Error> {
//!     let config = RunConfig {
//!         scenarios: vec![ScenarioConfig::new("mixed", Exec::Mixed)
//!             .vus(50)
//!             .duration(Duration::from_secs(30))],
//!         ..RunConfig::default()
//!     };
//!
//!     let report = kvload::run(config).await?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```
pub mod driver;
mod error;
pub mod issuer;
pub mod report;
pub mod selector;
pub mod sink;
pub mod thresholds;
pub(crate) mod virtual_user;
pub mod workload;

pub use driver::{Driver, RunOutcome, ScenarioRun};
pub use error::Error;
pub use issuer::{HttpIssuer, Issuer};
pub use report::RunReport;

/// Re-export of the core types.
pub mod core {
    pub use kvload_core::*;
}

pub mod prelude {
    pub use crate::driver::Driver;
    pub use crate::issuer::{HttpIssuer, Issuer};
    pub use crate::report::RunReport;
    pub use kvload_core::{Exec, OperationWeights, RunConfig, ScenarioConfig, Thresholds};
}

use kvload_core::RunConfig;
use tokio::sync::watch;

/// Runs `config` against its target over HTTP and evaluates its thresholds.
pub async fn run(config: RunConfig) -> Result<RunReport, Error> {
    let (_tx, rx) = watch::channel(false);
    run_until(config, rx).await
}

/// Like [`run`], but every virtual user stops early once `true` is sent on `stop`.
pub async fn run_until(config: RunConfig, stop: watch::Receiver<bool>) -> Result<RunReport, Error> {
    let issuer = HttpIssuer::new(&config)?;
    let specs = config.thresholds.specs().to_vec();
    let outcome = Driver::new(config, issuer)?
        .with_stop_signal(stop)
        .run()
        .await;
    Ok(RunReport::new(outcome, &specs))
}
