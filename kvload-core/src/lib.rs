//! Core types shared by the kvload engine and its command line.
mod config;
mod constants;
mod error;
mod observation;
mod stats;
mod threshold;

pub use config::*;
pub use constants::*;
pub use error::*;
pub use observation::*;
pub use stats::*;
pub use threshold::*;
