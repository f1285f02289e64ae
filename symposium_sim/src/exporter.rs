//! JSON exporter for single simulation runs.

use crate::runner::ClockMode;

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use symposium_core::{AgentReport, SimulationConfig, SimulationReport};

/// Per-philosopher summary in an export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentFrame {
    /// Philosopher index
    pub id: usize,

    /// Meals eaten
    pub meals: usize,

    /// Back-offs and refusals before meals
    pub retries: u64,

    /// Average wait for a pair of forks
    pub mean_wait_ms: f64,

    /// Longest wait for a pair of forks
    pub max_wait_ms: f64,
}

impl From<&AgentReport> for AgentFrame {
    fn from(report: &AgentReport) -> Self {
        Self {
            id: report.id,
            meals: report.meals,
            retries: report.retries,
            mean_wait_ms: report.mean_wait().as_secs_f64() * 1_000.0,
            max_wait_ms: report.max_wait.as_secs_f64() * 1_000.0,
        }
    }
}

/// Complete export of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunExport {
    /// Configuration that was run
    pub config: SimulationConfig,

    /// Seed used
    pub seed: u64,

    /// Clock the run slept on
    pub clock: ClockMode,

    /// Whether the run completed
    pub passed: bool,

    /// Run duration on its own clock, in seconds
    pub duration_sec: f64,

    /// One frame per philosopher
    pub agents: Vec<AgentFrame>,

    /// Failure message if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl RunExport {
    /// Creates a new export container.
    pub fn new(config: &SimulationConfig, seed: u64, clock: ClockMode) -> Self {
        Self {
            config: config.clone(),
            seed,
            clock,
            passed: false,
            duration_sec: 0.0,
            agents: Vec::new(),
            failure_reason: None,
        }
    }

    /// Finalizes the export with the run's outcome.
    pub fn finalize<E: std::fmt::Display>(&mut self, outcome: &Result<SimulationReport, E>) {
        match outcome {
            Ok(report) => {
                self.passed = true;
                self.duration_sec = report.elapsed.as_secs_f64();
                self.agents = report.agents.iter().map(AgentFrame::from).collect();
            }
            Err(err) => {
                self.passed = false;
                self.failure_reason = Some(err.to_string());
            }
        }
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
