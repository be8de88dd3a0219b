use std::time::Duration;

/// Target used when neither the config file nor the command line names one.
pub const DEFAULT_TARGET: &str = "http://localhost:8080";

pub const DEFAULT_VUS: usize = 1000;

pub const DEFAULT_DURATION: Duration = Duration::from_secs(5 * 60);

/// Pause taken by every virtual user after each iteration.
pub const DEFAULT_PAUSE: Duration = Duration::from_millis(100);

/// Keys are drawn uniformly from `key0..key{DEFAULT_KEY_SPACE - 1}`.
pub const DEFAULT_KEY_SPACE: u32 = 1000;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Length of the random base-36 string sent as the value of a put.
pub const PAYLOAD_VALUE_LEN: usize = 6;

/// Tolerance applied when checking that operation weights sum to one.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Default error rate threshold (`http_req_failed: rate<0.01`).
pub const DEFAULT_ERROR_RATE_THRESHOLD: &str = "rate<0.01";

/// Default latency threshold (`http_req_duration: p(95)<100`).
pub const DEFAULT_LATENCY_THRESHOLD: &str = "p(95)<100";
