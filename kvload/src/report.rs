//! End-of-run summary and exports.
use crate::driver::RunOutcome;
use crate::error::Error;
use crate::thresholds::{evaluate, ThresholdReport};
use kvload_core::{Observation, RunStatistics, ThresholdSpec};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioSummary {
    pub name: String,
    pub vus: usize,
    pub iterations: u64,
    pub stats: RunStatistics,
}

/// Statistics and threshold verdicts for a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub seed: u64,
    pub passed: bool,
    pub overall: RunStatistics,
    pub scenarios: Vec<ScenarioSummary>,
    pub thresholds: ThresholdReport,
    /// Scenarios or virtual users that ended abnormally.
    pub failures: Vec<String>,
    #[serde(skip)]
    outcome: RunOutcome,
}

impl RunReport {
    pub fn new(outcome: RunOutcome, specs: &[ThresholdSpec]) -> Self {
        let overall = RunStatistics::from_observations(outcome.observations(), outcome.elapsed);
        let scenarios = outcome
            .scenarios
            .iter()
            .map(|run| ScenarioSummary {
                name: run.config.name.clone(),
                vus: run.config.vus,
                iterations: run.iterations,
                stats: RunStatistics::from_observations(&run.observations, run.elapsed),
            })
            .collect();
        let thresholds = evaluate(outcome.observations(), outcome.elapsed, specs);
        let failures = outcome.failures.clone();

        Self {
            seed: outcome.seed,
            passed: thresholds.passed && failures.is_empty(),
            overall,
            scenarios,
            thresholds,
            failures,
            outcome,
        }
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn outcome(&self) -> &RunOutcome {
        &self.outcome
    }

    /// Writes the summary as a single JSON document.
    pub fn export_summary(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        info!("Summary written to {}", path.as_ref().display());
        Ok(())
    }

    /// Writes every observation as one JSON object per line.
    pub fn export_observations(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        #[derive(Serialize)]
        struct Line<'a> {
            scenario: &'a str,
            #[serde(flatten)]
            observation: &'a Observation,
        }

        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        let mut count = 0usize;
        for run in &self.outcome.scenarios {
            for observation in &run.observations {
                serde_json::to_writer(
                    &mut writer,
                    &Line {
                        scenario: &run.config.name,
                        observation,
                    },
                )?;
                writer.write_all(b"\n")?;
                count += 1;
            }
        }
        writer.flush()?;
        info!("{count} observations written to {}", path.as_ref().display());
        Ok(())
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for scenario in &self.scenarios {
            writeln!(
                f,
                "scenario {} ({} VUs, {} iterations)",
                scenario.name, scenario.vus, scenario.iterations
            )?;
            writeln!(f, "{}", scenario.stats)?;
        }
        writeln!(f, "overall (seed {})", self.seed)?;
        writeln!(f, "{}", self.overall)?;

        if !self.thresholds.results.is_empty() {
            writeln!(f, "thresholds")?;
            for result in &self.thresholds.results {
                writeln!(f, "  {result}")?;
            }
        }

        for failure in &self.failures {
            writeln!(f, "error: {failure}")?;
        }

        if self.passed {
            write!(f, "PASSED")
        } else if !self.failures.is_empty() {
            write!(f, "FAILED: run did not complete")
        } else {
            write!(f, "FAILED: thresholds crossed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::ScenarioRun;
    use kvload_core::{Exec, OperationKind, Outcome, ScenarioConfig, Thresholds};
    use std::time::Duration;
    use time::OffsetDateTime;

    fn outcome(failures: usize) -> RunOutcome {
        let observations = (0..100)
            .map(|i| {
                let status = if i < failures { 500 } else { 200 };
                Observation::new(
                    OperationKind::Get,
                    Outcome::Status(status),
                    Duration::from_millis(20),
                    OffsetDateTime::UNIX_EPOCH,
                )
            })
            .collect();
        RunOutcome {
            scenarios: vec![ScenarioRun {
                config: ScenarioConfig::new("reads", Exec::ReadHeavy).vus(2),
                observations,
                iterations: 100,
                elapsed: Duration::from_secs(10),
                failed_vus: 0,
            }],
            elapsed: Duration::from_secs(10),
            seed: 3,
            failures: vec![],
        }
    }

    #[test]
    fn report_passes_default_thresholds() {
        let report = RunReport::new(outcome(0), Thresholds::default().specs());
        assert!(report.passed());
        assert_eq!(report.overall.requests, 100);
        assert_eq!(report.scenarios[0].stats.requests_per_sec, 10.);

        let text = report.to_string();
        assert!(text.contains("scenario reads (2 VUs, 100 iterations)"));
        assert!(text.contains("http_req_failed: rate<0.01"));
        assert!(text.ends_with("PASSED"));
    }

    #[test]
    fn report_fails_on_errors() {
        let report = RunReport::new(outcome(2), Thresholds::default().specs());
        assert!(!report.passed());
        assert_eq!(report.overall.failed, 2);
        assert!(report.to_string().ends_with("FAILED: thresholds crossed"));
    }

    #[test]
    fn incomplete_run_never_passes() {
        let mut outcome = outcome(0);
        outcome
            .failures
            .push("scenario reads: 1 virtual users failed".to_string());

        let report = RunReport::new(outcome, Thresholds::default().specs());
        assert!(report.thresholds.passed);
        assert!(!report.passed());

        let text = report.to_string();
        assert!(text.contains("error: scenario reads: 1 virtual users failed"));
        assert!(text.ends_with("FAILED: run did not complete"));
    }

    #[test]
    fn exports() {
        let report = RunReport::new(outcome(1), Thresholds::default().specs());
        let dir = std::env::temp_dir().join(format!("kvload-report-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let summary = dir.join("summary.json");
        report.export_summary(&summary).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&summary).unwrap()).unwrap();
        assert_eq!(value["seed"], 3);
        assert_eq!(value["passed"], false);
        assert_eq!(value["overall"]["failed"], 1);
        assert_eq!(value["scenarios"][0]["name"], "reads");

        let out = dir.join("observations.ndjson");
        report.export_observations(&out).unwrap();
        let text = std::fs::read_to_string(&out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 100);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["scenario"], "reads");
        assert_eq!(first["operation"], "get");
        assert_eq!(first["outcome"]["status"], 500);
        assert_eq!(first["latency"], 20.0);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
