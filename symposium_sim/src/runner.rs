//! Benchmark runner - sweeps philosopher counts × strategies.

use crate::context::VirtualContext;
use crate::timing::{ResultTable, Stopwatch};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use symposium_core::{Simulation, SimulationConfig, SimulationReport, Strategy, TimingProfile};
use symposium_env::{SimError, SystemContext};
use tracing::{debug, error, info};

/// Philosopher counts swept by default, bounded by the runner's ceiling.
pub const DEFAULT_COUNTS: [usize; 3] = [5, 10, 20];

/// Which clock a run sleeps on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockMode {
    /// Real sleeps on the system clock
    #[default]
    System,

    /// Sleeps advance a virtual clock and yield
    Virtual,
}

impl ClockMode {
    /// Returns the lowercase name used in logs and exports.
    pub fn name(&self) -> &'static str {
        match self {
            ClockMode::System => "system",
            ClockMode::Virtual => "virtual",
        }
    }
}

/// Runs one simulation on the requested clock.
///
/// `seed` seeds the context: on the system clock `0` means OS entropy, on
/// the virtual clock every seed (including `0`) is reproducible.
pub fn run_with_clock(
    config: SimulationConfig,
    clock: ClockMode,
    seed: u64,
) -> Result<SimulationReport, SimError> {
    match clock {
        ClockMode::System => {
            Simulation::new(config, Arc::new(SystemContext::with_seed(seed))).run()
        }
        ClockMode::Virtual => Simulation::new(config, VirtualContext::shared(seed)).run(),
    }
}

/// Result of one cell of the sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSample {
    /// `"{count}_philosophers_{strategy}"`
    pub label: String,

    /// Philosophers seated in this cell
    pub philosophers: usize,

    /// Strategy every philosopher used
    pub strategy: Strategy,

    /// Whether the run completed
    pub passed: bool,

    /// Wall-clock duration of the run
    pub elapsed: Duration,

    /// Duration on the run's own clock (zero if it failed)
    pub simulated: Duration,

    /// Total back-offs and refusals across all philosophers
    pub retries: u64,

    /// Failure message if any
    pub failure_reason: Option<String>,
}

/// Everything a sweep produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// Context seed shared by every cell
    pub seed: u64,

    /// Dining cycles per philosopher in every cell
    pub iterations: usize,

    /// Clock every cell ran on
    pub clock: ClockMode,

    /// One sample per cell, in sweep order
    pub samples: Vec<BenchmarkSample>,

    /// Timings of the cells that passed
    pub table: ResultTable,
}

impl BenchmarkReport {
    /// Returns the samples that failed.
    pub fn failures(&self) -> impl Iterator<Item = &BenchmarkSample> {
        self.samples.iter().filter(|s| !s.passed)
    }

    /// Returns true if every cell completed.
    pub fn all_passed(&self) -> bool {
        self.samples.iter().all(|s| s.passed)
    }
}

/// Runs the benchmark matrix.
pub struct BenchmarkRunner {
    /// Largest philosopher count to spawn
    max_philosophers: usize,

    /// Dining cycles per philosopher in every cell
    iterations: usize,

    /// Durations used by every cell
    timing: TimingProfile,

    /// Context seed
    seed: u64,

    /// Candidate philosopher counts
    counts: Vec<usize>,

    /// Clock every cell runs on
    clock: ClockMode,
}

impl BenchmarkRunner {
    /// Creates a new benchmark runner.
    pub fn new(max_philosophers: usize, iterations: usize) -> Self {
        Self {
            max_philosophers,
            iterations,
            timing: TimingProfile::default(),
            seed: 0,
            counts: DEFAULT_COUNTS.to_vec(),
            clock: ClockMode::System,
        }
    }

    /// Sets the timing profile.
    pub fn with_timing(mut self, timing: TimingProfile) -> Self {
        self.timing = timing;
        self
    }

    /// Sets the context seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Replaces the candidate philosopher counts.
    pub fn with_counts(mut self, counts: impl IntoIterator<Item = usize>) -> Self {
        self.counts = counts.into_iter().collect();
        self
    }

    /// Sets the clock.
    pub fn with_clock(mut self, clock: ClockMode) -> Self {
        self.clock = clock;
        self
    }

    /// Rejects sweeps that cannot run a single cell.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.max_philosophers < 2 {
            return Err(SimError::InvalidBenchmark(format!(
                "philosopher ceiling {} is below 2",
                self.max_philosophers
            )));
        }
        if self.iterations == 0 {
            return Err(SimError::InvalidBenchmark(
                "iterations must be positive".to_string(),
            ));
        }
        self.timing.validate()
    }

    /// Counts that will be swept: candidates within `2..=max`, or the
    /// ceiling itself when none qualify.
    pub fn counts(&self) -> Vec<usize> {
        let mut counts: Vec<usize> = self
            .counts
            .iter()
            .copied()
            .filter(|&n| n >= 2 && n <= self.max_philosophers)
            .collect();
        counts.sort_unstable();
        counts.dedup();

        if counts.is_empty() {
            counts.push(self.max_philosophers);
        }
        counts
    }

    /// Runs a single cell of the matrix.
    pub fn run_cell(&self, philosophers: usize, strategy: Strategy) -> BenchmarkSample {
        let config = SimulationConfig::new(philosophers, strategy, self.iterations)
            .with_timing(self.timing);
        let label = config.label();

        debug!("Starting cell: {} (seed={})", label, self.seed);
        let watch = Stopwatch::start(label.clone());
        let outcome = run_with_clock(config, self.clock, self.seed);
        let elapsed = watch.stop().duration;

        match outcome {
            Ok(report) => {
                info!("✓ {} completed in {:.3} ms", label, elapsed.as_secs_f64() * 1_000.0);
                BenchmarkSample {
                    label,
                    philosophers,
                    strategy,
                    passed: true,
                    elapsed,
                    simulated: report.elapsed,
                    retries: report.total_retries(),
                    failure_reason: None,
                }
            }
            Err(err) => {
                error!("✗ {} FAILED: {}", label, err);
                BenchmarkSample {
                    label,
                    philosophers,
                    strategy,
                    passed: false,
                    elapsed,
                    simulated: Duration::ZERO,
                    retries: 0,
                    failure_reason: Some(err.to_string()),
                }
            }
        }
    }

    /// Runs every cell; a failed cell is recorded and the sweep continues.
    pub fn run(&self) -> Result<BenchmarkReport, SimError> {
        self.validate()?;

        let counts = self.counts();
        info!(
            "Benchmark: counts={:?}, iterations={}, clock={}",
            counts,
            self.iterations,
            self.clock.name()
        );

        let mut samples = Vec::with_capacity(counts.len() * Strategy::all().len());
        let mut table = ResultTable::new("Dining philosophers benchmark");

        for &count in &counts {
            for strategy in Strategy::all() {
                let sample = self.run_cell(count, strategy);
                if sample.passed {
                    table.record(sample.label.clone(), sample.elapsed);
                }
                samples.push(sample);
            }
        }

        Ok(BenchmarkReport {
            seed: self.seed,
            iterations: self.iterations,
            clock: self.clock,
            samples,
            table,
        })
    }
}

/// Runs the default sweep on the system clock.
pub fn run_benchmark(max_philosophers: usize, iterations: usize) -> Result<BenchmarkReport, SimError> {
    BenchmarkRunner::new(max_philosophers, iterations).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick(max: usize) -> BenchmarkRunner {
        BenchmarkRunner::new(max, 3)
            .with_timing(TimingProfile::brisk())
            .with_clock(ClockMode::Virtual)
            .with_seed(7)
    }

    #[test]
    fn test_counts_bounded_by_ceiling() {
        assert_eq!(quick(20).counts(), vec![5, 10, 20]);
        assert_eq!(quick(12).counts(), vec![5, 10]);
        assert_eq!(quick(100).counts(), vec![5, 10, 20]);
        // Nothing fits: sweep the ceiling itself
        assert_eq!(quick(3).counts(), vec![3]);
        assert_eq!(quick(8).with_counts([8, 2, 8, 40]).counts(), vec![2, 8]);
    }

    #[test]
    fn test_clock_names() {
        assert_eq!(ClockMode::System.name(), "system");
        assert_eq!(ClockMode::Virtual.name(), "virtual");
        assert_eq!(ClockMode::default(), ClockMode::System);
    }

    #[test]
    fn test_rejects_bad_sweeps() {
        assert!(matches!(quick(1).run(), Err(SimError::InvalidBenchmark(_))));
        assert!(matches!(
            BenchmarkRunner::new(5, 0).run(),
            Err(SimError::InvalidBenchmark(_))
        ));
    }

    #[test]
    fn test_sweep_covers_matrix() {
        // Spread think times so fixed-order semaphores do not move in lock-step
        let mut timing = TimingProfile::brisk();
        timing.think = symposium_core::DurationRange::new(1, 6);
        let report = BenchmarkRunner::new(10, 3)
            .with_timing(timing)
            .with_seed(7)
            .run()
            .unwrap();

        assert_eq!(report.samples.len(), 2 * 5);
        assert!(report.all_passed());
        assert_eq!(report.table.len(), 10);
        assert_eq!(report.samples[0].label, "5_philosophers_mutex");
        assert_eq!(report.samples[9].label, "10_philosophers_resource_hierarchy");
        assert!(report.samples.iter().all(|s| s.failure_reason.is_none()));
    }

    #[test]
    fn test_failed_cell_is_recorded() {
        // A single-seat cell can only be requested directly
        let sample = quick(5).run_cell(1, Strategy::Mutex);

        assert!(!sample.passed);
        assert_eq!(sample.label, "1_philosophers_mutex");
        assert!(sample.failure_reason.unwrap().contains("Invalid philosopher count"));
    }

    #[test]
    fn test_system_clock_cell() {
        let sample = BenchmarkRunner::new(5, 2)
            .with_timing(TimingProfile::brisk())
            .run_cell(5, Strategy::Arbitrator);

        assert!(sample.passed);
        assert!(sample.elapsed > Duration::ZERO);
    }

    #[test]
    fn test_virtual_clock_accumulates_sleep() {
        let mut timing = TimingProfile::brisk();
        timing.think = symposium_core::DurationRange::fixed(100);
        timing.eat = symposium_core::DurationRange::fixed(100);
        let config = SimulationConfig::new(3, Strategy::ResourceHierarchy, 4).with_timing(timing);

        let report = run_with_clock(config, ClockMode::Virtual, 3).unwrap();

        // 3 philosophers × 4 meals × (100 ms think + 100 ms eat)
        assert!(report.elapsed >= Duration::from_millis(2_400));
        assert!(report.is_complete());
    }
}
