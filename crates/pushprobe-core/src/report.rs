//! Run reports.
//!
//! Each suite run produces a [`RunReport`]: one [`ScenarioReport`] per
//! scenario, with its duration and, for failures, the error kind and
//! message. Reports are appended as JSON lines to
//! `~/.pushprobe/logs/runs.jsonl` so that flaky runs can be compared later.

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::logs_dir;
use crate::error::ProbeError;
use crate::scenario::ScenarioKind;

const RUNS_FILENAME: &str = "runs.jsonl";

/// How a scenario ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScenarioOutcome {
    /// Every step succeeded.
    Passed,
    /// A step failed and the scenario stopped there.
    Failed {
        /// Static error kind (see [`ProbeError::kind`]).
        kind: String,
        /// Human readable failure.
        message: String,
    },
}

/// Result of one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Which scenario ran.
    pub scenario: ScenarioKind,
    /// When it started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds, setup included.
    pub duration_ms: u64,
    /// Pass or fail.
    #[serde(flatten)]
    pub outcome: ScenarioOutcome,
}

impl ScenarioReport {
    /// A passing report.
    pub fn passed(scenario: ScenarioKind, started_at: DateTime<Utc>, duration_ms: u64) -> Self {
        Self {
            scenario,
            started_at,
            duration_ms,
            outcome: ScenarioOutcome::Passed,
        }
    }

    /// A failing report carrying the error that ended the scenario.
    pub fn failed(
        scenario: ScenarioKind,
        started_at: DateTime<Utc>,
        duration_ms: u64,
        error: &ProbeError,
    ) -> Self {
        Self {
            scenario,
            started_at,
            duration_ms,
            outcome: ScenarioOutcome::Failed {
                kind: error.kind().to_string(),
                message: error.to_string(),
            },
        }
    }

    /// Returns true if the scenario passed.
    pub fn is_passed(&self) -> bool {
        self.outcome == ScenarioOutcome::Passed
    }
}

/// Result of one suite run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique run identifier.
    pub id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished, once it has.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// adb serial of the device, if one was selected explicitly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Scenario results in execution order.
    #[serde(default)]
    pub scenarios: Vec<ScenarioReport>,
}

impl RunReport {
    /// Starts a new, empty report.
    pub fn new(device: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            device,
            scenarios: Vec::new(),
        }
    }

    /// Default location of the run history.
    pub fn default_path() -> PathBuf {
        logs_dir().join(RUNS_FILENAME)
    }

    /// Records a scenario result.
    pub fn push(&mut self, report: ScenarioReport) {
        self.scenarios.push(report);
    }

    /// Stamps the finish time.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn passed_count(&self) -> usize {
        self.scenarios.iter().filter(|s| s.is_passed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.scenarios.len() - self.passed_count()
    }

    /// True if every scenario passed. An empty run counts as passed.
    pub fn all_passed(&self) -> bool {
        self.failed_count() == 0
    }

    /// Appends this report as one JSON line to `path`, creating the file if needed.
    pub fn append_to(&self, path: &Path) -> std::io::Result<()> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        let mut writer = BufWriter::new(file);
        let json = serde_json::to_string(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        writeln!(writer, "{}", json)?;
        writer.flush()
    }

    /// Reads every report from a JSON lines file, skipping lines that do not parse.
    pub fn load_all(path: &Path) -> std::io::Result<Vec<RunReport>> {
        let file = std::fs::File::open(path)?;
        let mut reports = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(report) = serde_json::from_str(&line) {
                reports.push(report);
            }
        }
        Ok(reports)
    }

    /// Plain-text summary, one line per scenario plus a totals line.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for s in &self.scenarios {
            match &s.outcome {
                ScenarioOutcome::Passed => {
                    out.push_str(&format!("PASS  {:<14} {:>7}ms\n", s.scenario.name(), s.duration_ms));
                }
                ScenarioOutcome::Failed { message, .. } => {
                    out.push_str(&format!(
                        "FAIL  {:<14} {:>7}ms  {}\n",
                        s.scenario.name(),
                        s.duration_ms,
                        message
                    ));
                }
            }
        }
        out.push_str(&format!(
            "{} passed, {} failed (run {})",
            self.passed_count(),
            self.failed_count(),
            self.id
        ));
        out
    }
}
