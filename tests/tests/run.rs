mod utils;
#[allow(unused)]
use utils::*;

mod tests {
    use super::*;
    use kvload::core::{Exec, OperationKind, ScenarioConfig, Thresholds};
    use mock_service::MockConfig;
    use std::time::Duration;
    use tokio::sync::watch;

    fn scenario(name: &str, exec: Exec) -> ScenarioConfig {
        ScenarioConfig::new(name, exec)
            .vus(5)
            .duration(Duration::from_secs(2))
            .pause(Duration::from_millis(50))
            .key_space(50)
    }

    #[tokio::test]
    #[ntest::timeout(10_000)]
    async fn mock_run_passes_default_thresholds() {
        init();
        let target = mock(MockConfig::default()).await;
        let config = run_config(
            target,
            vec![
                scenario("readHeavy", Exec::ReadHeavy),
                scenario("writeHeavy", Exec::WriteHeavy),
                scenario("mixed", Exec::Mixed),
            ],
        );

        let report = kvload::run(config).await.unwrap();

        assert!(report.passed(), "{report}");
        assert_eq!(report.scenarios.len(), 3);
        assert!(report.overall.requests > 0);
        // Missing keys answer 404, which gets and deletes accept.
        assert_eq!(report.overall.failed, 0);
        assert!(report.thresholds.results.iter().all(|r| r.passed));

        let reads = &report.scenarios[0].stats.operations;
        let writes = &report.scenarios[1].stats.operations;
        assert!(reads[&OperationKind::Get] > reads.get(&OperationKind::Put).copied().unwrap_or(0));
        assert!(writes[&OperationKind::Put] > writes.get(&OperationKind::Get).copied().unwrap_or(0));
    }

    #[tokio::test]
    #[ntest::timeout(10_000)]
    async fn injected_failures_cross_error_rate() {
        init();
        let target = mock(MockConfig::default().fail_every(10)).await;
        let config = run_config(target, vec![scenario("mixed", Exec::Mixed)]);

        let report = kvload::run(config).await.unwrap();

        assert!(!report.passed());
        let rate = report.overall.error_rate;
        assert!((0.05..=0.15).contains(&rate), "error rate {rate}");

        let failed: Vec<_> = report
            .thresholds
            .results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| r.spec.to_string())
            .collect();
        assert_eq!(failed, vec!["http_req_failed: rate<0.01"]);
    }

    #[tokio::test]
    #[ntest::timeout(10_000)]
    async fn unreachable_target_fails_every_request() {
        init();
        let target = dead_target().await;
        let config = run_config(
            target,
            vec![ScenarioConfig::new("reads", Exec::ReadHeavy)
                .vus(2)
                .duration(Duration::from_secs(1))
                .pause(Duration::from_millis(100))],
        );

        let report = kvload::run(config).await.unwrap();

        assert!(!report.passed());
        assert!(report.overall.requests > 0);
        assert_eq!(report.overall.failed, report.overall.requests);
        assert_eq!(report.overall.error_rate, 1.0);
    }

    #[tokio::test]
    #[ntest::timeout(10_000)]
    async fn observation_count_follows_pacing() {
        init();
        let target = mock(MockConfig::default().delay(Duration::from_millis(20))).await;
        let config = run_config(
            target,
            vec![ScenarioConfig::new("reads", Exec::ReadHeavy)
                .vus(4)
                .duration(Duration::from_secs(2))
                .pause(Duration::from_millis(80))],
        );

        let report = kvload::run(config).await.unwrap();

        // 4 VUs for 2s at roughly 100ms per iteration.
        let count = report.outcome().scenarios[0].observations.len();
        assert!((60..=84).contains(&count), "{count} observations");
        assert_eq!(report.scenarios[0].iterations, count as u64);

        let latency = report.overall.latency.as_ref().unwrap();
        assert!(latency.min >= Duration::from_millis(20));
    }

    #[tokio::test]
    #[ntest::timeout(10_000)]
    async fn stop_signal_ends_long_run() {
        init();
        let target = mock(MockConfig::default()).await;
        let config = run_config(
            target,
            vec![scenario("mixed", Exec::Mixed).duration(Duration::from_secs(3600))],
        );
        let (tx, rx) = watch::channel(false);

        let run = tokio::spawn(kvload::run_until(config, rx));
        tokio::time::sleep(Duration::from_millis(500)).await;
        tx.send(true).unwrap();

        let report = run.await.unwrap().unwrap();
        assert!(report.overall.elapsed < Duration::from_secs(5));
        assert!(report.overall.requests > 0);
    }

    #[tokio::test]
    async fn empty_threshold_list_passes() {
        init();
        let target = mock(MockConfig::default()).await;
        let mut config = run_config(
            target,
            vec![scenario("mixed", Exec::Mixed).duration(Duration::from_secs(1))],
        );
        config.thresholds = Thresholds::new(vec![]);

        let report = kvload::run(config).await.unwrap();
        assert!(report.passed());
        assert!(report.thresholds.results.is_empty());
    }

    #[cfg(feature = "integration")]
    #[tokio::test]
    #[ntest::timeout(60_000)]
    async fn default_profile_against_mock() {
        use kvload::core::RunConfig;

        init();
        let target = mock(MockConfig::default().delay(Duration::from_millis(5))).await;
        let mut config = RunConfig {
            target,
            ..RunConfig::default()
        };
        for scenario in &mut config.scenarios {
            scenario.vus = 200;
            scenario.duration = Duration::from_secs(10);
        }

        let report = kvload::run(config).await.unwrap();
        println!("{report}");
        assert!(report.passed());
    }
}
