use crate::{Observation, OperationKind};
use serde::Serialize;
use serde_with::{serde_as, DurationMilliSecondsWithFrac, DurationSecondsWithFrac};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Request latencies in ascending order.
#[derive(Debug, Clone, Default)]
pub struct SortedLatencies(Vec<Duration>);

impl SortedLatencies {
    pub fn from_observations<'a>(observations: impl IntoIterator<Item = &'a Observation>) -> Self {
        let mut latencies: Vec<Duration> = observations.into_iter().map(|o| o.latency()).collect();
        latencies.sort_unstable();
        Self(latencies)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn min(&self) -> Option<Duration> {
        self.0.first().copied()
    }

    pub fn max(&self) -> Option<Duration> {
        self.0.last().copied()
    }

    pub fn mean(&self) -> Option<Duration> {
        if self.0.is_empty() {
            return None;
        }
        let total: u128 = self.0.iter().map(Duration::as_nanos).sum();
        Some(Duration::from_nanos((total / self.0.len() as u128) as u64))
    }

    /// Percentile `p` in `[0, 100]`, linearly interpolated between the closest ranks.
    pub fn percentile(&self, p: f64) -> Option<Duration> {
        let last = self.0.len().checked_sub(1)?;
        let rank = (p.clamp(0., 100.) / 100.) * last as f64;
        let lower = rank.floor() as usize;
        let upper = rank.ceil() as usize;
        let (lo, hi) = (self.0[lower], self.0[upper]);
        Some(lo + (hi - lo).mul_f64(rank - lower as f64))
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySummary {
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub avg: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub min: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub med: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub max: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub p90: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub p95: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub p99: Duration,
}

impl LatencySummary {
    pub fn from_sorted(latencies: &SortedLatencies) -> Option<Self> {
        Some(Self {
            avg: latencies.mean()?,
            min: latencies.min()?,
            med: latencies.percentile(50.)?,
            max: latencies.max()?,
            p90: latencies.percentile(90.)?,
            p95: latencies.percentile(95.)?,
            p99: latencies.percentile(99.)?,
        })
    }
}

/// Summary statistics for a scenario, or for a whole run.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStatistics {
    pub requests: u64,
    pub failed: u64,
    pub error_rate: f64,
    pub requests_per_sec: f64,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub elapsed: Duration,
    pub operations: BTreeMap<OperationKind, u64>,
    pub latency: Option<LatencySummary>,
}

impl RunStatistics {
    pub fn from_observations<'a>(
        observations: impl IntoIterator<Item = &'a Observation> + Clone,
        elapsed: Duration,
    ) -> Self {
        let mut requests = 0u64;
        let mut failed = 0u64;
        let mut operations = BTreeMap::new();
        for obs in observations.clone() {
            requests += 1;
            if obs.is_failure() {
                failed += 1;
            }
            *operations.entry(obs.operation()).or_insert(0) += 1;
        }

        let latency = LatencySummary::from_sorted(&SortedLatencies::from_observations(observations));

        Self {
            requests,
            failed,
            error_rate: error_rate(failed, requests),
            requests_per_sec: per_sec(requests, elapsed),
            elapsed,
            operations,
            latency,
        }
    }
}

/// `failed / total`, defined as zero when nothing was sent.
pub fn error_rate(failed: u64, total: u64) -> f64 {
    if total == 0 {
        0.
    } else {
        failed as f64 / total as f64
    }
}

/// `count` spread over `elapsed`, zero for an empty interval.
pub fn per_sec(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0. {
        count as f64 / secs
    } else {
        0.
    }
}

fn ms(dur: Duration) -> String {
    format!("{:.2}ms", dur.as_secs_f64() * 1e3)
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = Duration::from_millis(self.elapsed.as_millis() as u64);
        writeln!(f, "  duration..........: {}", humantime::format_duration(elapsed))?;
        match &self.latency {
            Some(l) => writeln!(
                f,
                "  http_req_duration.: avg={} min={} med={} max={} p(90)={} p(95)={} p(99)={}",
                ms(l.avg),
                ms(l.min),
                ms(l.med),
                ms(l.max),
                ms(l.p90),
                ms(l.p95),
                ms(l.p99),
            )?,
            None => writeln!(f, "  http_req_duration.: no data")?,
        }
        writeln!(
            f,
            "  http_req_failed...: {:.2}% ({} of {})",
            self.error_rate * 100.,
            self.failed,
            self.requests
        )?;
        writeln!(
            f,
            "  http_reqs.........: {} ({:.2}/s)",
            self.requests, self.requests_per_sec
        )?;
        let ops: Vec<_> = self
            .operations
            .iter()
            .map(|(op, count)| format!("{op}={count}"))
            .collect();
        write!(f, "  operations........: {}", ops.join(" "))
    }
}
