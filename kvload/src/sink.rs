use kvload_core::Observation;
use metrics_util::AtomicBucket;
use std::sync::Arc;

/// Append-only, lock-free collection of the observations of one scenario execution.
///
/// Cloning is cheap and every clone appends to the same bucket; each virtual user holds one.
#[derive(Clone)]
pub struct ObservationSink {
    #[cfg(feature = "metrics")]
    scenario: Arc<str>,
    bucket: Arc<AtomicBucket<Observation>>,
}

impl ObservationSink {
    pub fn new(scenario: &str) -> Self {
        #[cfg(not(feature = "metrics"))]
        let _ = scenario;
        Self {
            #[cfg(feature = "metrics")]
            scenario: Arc::from(scenario),
            bucket: Arc::new(AtomicBucket::new()),
        }
    }

    pub fn record(&self, observation: Observation) {
        #[cfg(feature = "metrics")]
        self.publish(&observation);

        self.bucket.push(observation);
    }

    pub fn is_empty(&self) -> bool {
        self.bucket.is_empty()
    }

    /// Takes every observation recorded so far, leaving the sink empty.
    pub fn drain(&self) -> Vec<Observation> {
        let mut observations = vec![];
        self.bucket
            .clear_with(|block| observations.extend_from_slice(block));
        observations
    }

    #[cfg(feature = "metrics")]
    fn publish(&self, observation: &Observation) {
        let scenario = self.scenario.to_string();
        let operation = observation.operation().as_str();
        metrics::histogram!(
            "kvload_http_req_duration_seconds",
            "scenario" => scenario.clone(),
            "operation" => operation
        )
        .record(observation.latency().as_secs_f64());
        metrics::counter!(
            "kvload_http_reqs_total",
            "scenario" => scenario.clone(),
            "operation" => operation
        )
        .increment(1);
        if observation.is_failure() {
            metrics::counter!(
                "kvload_http_req_failed_total",
                "scenario" => scenario,
                "operation" => operation
            )
            .increment(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvload_core::{OperationKind, Outcome};
    use std::time::Duration;
    use time::OffsetDateTime;

    fn obs(ms: u64) -> Observation {
        Observation::new(
            OperationKind::Get,
            Outcome::Status(200),
            Duration::from_millis(ms),
            OffsetDateTime::UNIX_EPOCH,
        )
    }

    #[test]
    fn drain_returns_everything_once() {
        let sink = ObservationSink::new("s");
        assert!(sink.is_empty());
        sink.record(obs(1));
        sink.clone().record(obs(2));
        assert!(!sink.is_empty());

        let mut latencies: Vec<_> = sink.drain().iter().map(|o| o.latency()).collect();
        latencies.sort();
        assert_eq!(
            latencies,
            vec![Duration::from_millis(1), Duration::from_millis(2)]
        );
        assert!(sink.drain().is_empty());
    }

    #[test]
    fn concurrent_appends() {
        let sink = ObservationSink::new("s");
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    for i in 0..1_000 {
                        sink.record(obs(i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(sink.drain().len(), 8_000);
    }
}
