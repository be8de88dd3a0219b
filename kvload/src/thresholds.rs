//! Pass/fail evaluation of thresholds over a finished run.
use kvload_core::{
    error_rate, per_sec, Aggregation, Metric, Observation, SortedLatencies, ThresholdSpec,
};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdResult {
    #[serde(serialize_with = "serialize_display")]
    pub spec: ThresholdSpec,
    /// `None` when the metric had no data to aggregate.
    pub observed: Option<f64>,
    pub passed: bool,
}

impl fmt::Display for ThresholdResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.passed { "✓" } else { "✗" };
        match self.observed {
            Some(observed) => write!(f, "{mark} {} (observed {observed:.4})", self.spec),
            None => write!(f, "{mark} {} (no data)", self.spec),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdReport {
    pub results: Vec<ThresholdResult>,
    /// All thresholds passed.
    pub passed: bool,
}

/// Evaluates every threshold against `observations`, collected over `elapsed`.
pub fn evaluate<'a>(
    observations: impl IntoIterator<Item = &'a Observation> + Clone,
    elapsed: Duration,
    specs: &[ThresholdSpec],
) -> ThresholdReport {
    let metrics = RunMetrics::new(observations, elapsed);

    let results: Vec<_> = specs
        .iter()
        .map(|spec| {
            let observed = metrics.observe(spec.metric, spec.aggregation);
            let passed = match observed {
                Some(value) => spec.comparison.holds(value, spec.limit),
                None => {
                    warn!("No data for threshold `{spec}`; treating it as passed.");
                    true
                }
            };
            if !passed {
                debug!("Threshold `{spec}` crossed: observed {observed:?}");
            }
            ThresholdResult {
                spec: spec.clone(),
                observed,
                passed,
            }
        })
        .collect();

    let passed = results.iter().all(|r| r.passed);
    ThresholdReport { results, passed }
}

struct RunMetrics {
    total: u64,
    failed: u64,
    elapsed: Duration,
    latencies: SortedLatencies,
}

impl RunMetrics {
    fn new<'a>(
        observations: impl IntoIterator<Item = &'a Observation> + Clone,
        elapsed: Duration,
    ) -> Self {
        let (total, failed) = observations
            .clone()
            .into_iter()
            .fold((0, 0), |(total, failed), o| {
                (total + 1, failed + u64::from(o.is_failure()))
            });
        Self {
            total,
            failed,
            elapsed,
            latencies: SortedLatencies::from_observations(observations),
        }
    }

    fn observe(&self, metric: Metric, aggregation: Aggregation) -> Option<f64> {
        match (metric, aggregation) {
            (Metric::HttpReqFailed, Aggregation::Rate) => {
                (self.total > 0).then(|| error_rate(self.failed, self.total))
            }
            (Metric::HttpReqs, Aggregation::Count) => Some(self.total as f64),
            (Metric::HttpReqs, Aggregation::Rate) => {
                (!self.elapsed.is_zero()).then(|| per_sec(self.total, self.elapsed))
            }
            (Metric::HttpReqDuration, aggregation) => {
                let latency = match aggregation {
                    Aggregation::Avg => self.latencies.mean(),
                    Aggregation::Min => self.latencies.min(),
                    Aggregation::Max => self.latencies.max(),
                    Aggregation::Med => self.latencies.percentile(50.),
                    Aggregation::Percentile(p) => self.latencies.percentile(p),
                    Aggregation::Rate | Aggregation::Count => None,
                };
                latency.map(|l| l.as_secs_f64() * 1e3)
            }
            // Rejected when the threshold is parsed.
            _ => None,
        }
    }
}

fn serialize_display<T: fmt::Display, S: serde::Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}
