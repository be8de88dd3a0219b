mod utils;
#[allow(unused)]
use utils::*;

mod tests {
    use super::*;
    use kvload::core::{Exec, ScenarioConfig};
    use mock_service::MockConfig;
    use std::time::Duration;

    #[tracing_test::traced_test]
    #[tokio::test]
    #[ntest::timeout(10_000)]
    async fn summary_and_observations_are_exported() {
        let target = mock(MockConfig::default()).await;
        let config = run_config(
            target,
            vec![
                ScenarioConfig::new("reads", Exec::ReadHeavy)
                    .vus(2)
                    .duration(Duration::from_secs(1)),
                ScenarioConfig::new("writes", Exec::WriteHeavy)
                    .vus(2)
                    .duration(Duration::from_secs(1)),
            ],
        );

        let report = kvload::run(config).await.unwrap();

        let dir = std::env::temp_dir().join(format!("kvload-export-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let summary = dir.join("summary.json");
        report.export_summary(&summary).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&summary).unwrap()).unwrap();
        assert_eq!(value["seed"], 42);
        assert_eq!(value["passed"], true);
        assert_eq!(value["overall"]["requests"], report.overall.requests);
        assert_eq!(value["scenarios"][1]["name"], "writes");
        let specs: Vec<_> = value["thresholds"]["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["spec"].as_str().unwrap().to_string())
            .collect();
        assert!(specs.contains(&"http_req_duration: p(95)<100".to_string()));

        let out = dir.join("observations.ndjson");
        report.export_observations(&out).unwrap();
        let text = std::fs::read_to_string(&out).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len() as u64, report.overall.requests);
        assert!(lines
            .iter()
            .filter(|l| l["scenario"] == "writes")
            .all(|l| l["operation"] == "put" && l["outcome"]["status"] == 201));
        assert!(logs_contain("observations written to"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
