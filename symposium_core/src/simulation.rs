//! Simulation - the coordinator of one dining run.

use crate::agent::{AgentReport, Philosopher, VERBOSE_TRACE_LIMIT};
use crate::observer::{DiningObserver, NoopObserver};
use crate::policy::{DiningPolicy, TimingProfile};
use crate::strategy::Strategy;
use crate::table::DiningTable;

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use symposium_env::{Seat, SimError, SystemContext, TableContext};
use tracing::{debug, error, info};

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of philosophers (and forks), at least 2
    pub philosophers: usize,

    /// Acquisition strategy used by every philosopher
    pub strategy: Strategy,

    /// Dining cycles per philosopher, at least 1
    pub iterations: usize,

    /// Trace think/eat starts for the first iterations
    pub verbose: bool,

    /// Think, eat and retry durations
    pub timing: TimingProfile,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            philosophers: 5,
            strategy: Strategy::Mutex,
            iterations: 10,
            verbose: false,
            timing: TimingProfile::default(),
        }
    }
}

impl SimulationConfig {
    /// Creates a configuration with default timing.
    pub fn new(philosophers: usize, strategy: Strategy, iterations: usize) -> Self {
        Self {
            philosophers,
            strategy,
            iterations,
            ..Default::default()
        }
    }

    /// Sets verbose tracing.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Sets the timing profile.
    pub fn with_timing(mut self, timing: TimingProfile) -> Self {
        self.timing = timing;
        self
    }

    /// Rejects configurations that cannot run.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.philosophers < 2 {
            return Err(SimError::InvalidPhilosopherCount(self.philosophers));
        }
        if self.iterations == 0 {
            return Err(SimError::InvalidIterations(self.iterations));
        }
        self.timing.validate()
    }

    /// Short label used in logs and benchmark tables.
    pub fn label(&self) -> String {
        format!("{}_philosophers_{}", self.philosophers, self.strategy)
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Strategy that was run
    pub strategy: Strategy,

    /// Number of philosophers
    pub philosophers: usize,

    /// Dining cycles per philosopher
    pub iterations: usize,

    /// Run duration on the context clock
    pub elapsed: Duration,

    /// One entry per philosopher, by index
    pub agents: Vec<AgentReport>,
}

impl SimulationReport {
    /// Total meals eaten at the table.
    pub fn total_meals(&self) -> usize {
        self.agents.iter().map(|a| a.meals).sum()
    }

    /// Total failed attempts across all philosophers.
    pub fn total_retries(&self) -> u64 {
        self.agents.iter().map(|a| a.retries).sum()
    }

    /// Longest wait any philosopher had for a pair of forks.
    pub fn max_wait(&self) -> Duration {
        self.agents
            .iter()
            .map(|a| a.max_wait)
            .max()
            .unwrap_or_default()
    }

    /// Returns true if every philosopher finished every iteration.
    pub fn is_complete(&self) -> bool {
        self.agents.len() == self.philosophers
            && self.agents.iter().all(|a| a.meals == self.iterations)
    }
}

/// Coordinates one run: builds the table, spawns one thread per
/// philosopher, joins them all.
pub struct Simulation<C, O = NoopObserver>
where
    C: TableContext,
    O: DiningObserver,
{
    config: SimulationConfig,
    context: Arc<C>,
    observer: Arc<O>,
}

impl<C: TableContext> Simulation<C, NoopObserver> {
    /// Creates a new simulation without instrumentation.
    pub fn new(config: SimulationConfig, context: Arc<C>) -> Self {
        Self {
            config,
            context,
            observer: Arc::new(NoopObserver),
        }
    }
}

impl<C, O> Simulation<C, O>
where
    C: TableContext,
    O: DiningObserver,
{
    /// Attaches an observer to every philosopher.
    pub fn with_observer<P: DiningObserver>(self, observer: Arc<P>) -> Simulation<C, P> {
        Simulation {
            config: self.config,
            context: self.context,
            observer,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Runs the simulation to completion.
    ///
    /// Configuration errors are returned before any thread starts. Otherwise
    /// every spawned philosopher is joined and no partial report is produced.
    /// A panic or spawn failure is returned ahead of the errors it caused in
    /// neighbors (a panicking holder poisons its forks); among equals the
    /// lowest seat wins.
    pub fn run(&self) -> Result<SimulationReport, SimError> {
        self.config.validate()?;

        let config = &self.config;
        let count = config.philosophers;

        info!(
            "Starting simulation: {} philosophers, strategy={}, iterations={}",
            count, config.strategy, config.iterations
        );
        if config.verbose && config.iterations > VERBOSE_TRACE_LIMIT {
            info!("(trace limited to the first {} iterations)", VERBOSE_TRACE_LIMIT);
        }

        let table = Arc::new(DiningTable::new(count, config.strategy.fork_kind()));
        let policy = Arc::new(DiningPolicy::new(config.strategy, config.timing)?);
        let started = self.context.now();

        // Root causes (panics, spawn failures) outrank knock-on agent errors
        let mut root_cause: Option<SimError> = None;
        let mut knock_on: Option<SimError> = None;
        let mut handles = Vec::with_capacity(count);

        for id in 0..count {
            let philosopher = Philosopher::new(
                Seat::new(id, count),
                table.clone(),
                policy.clone(),
                self.context.clone(),
                self.observer.clone(),
                config.iterations,
                config.verbose,
            );

            let spawned = thread::Builder::new()
                .name(format!("philosopher-{}", id))
                .spawn(move || philosopher.run());

            match spawned {
                Ok(handle) => handles.push((id, handle)),
                Err(source) => {
                    error!("Failed to spawn philosopher {}: {}", id, source);
                    root_cause = Some(SimError::SpawnFailed { id, source });
                    break;
                }
            }
        }

        let mut agents = Vec::with_capacity(count);
        for (id, handle) in handles {
            let outcome = match handle.join() {
                Ok(Ok(report)) => {
                    agents.push(report);
                    continue;
                }
                Ok(Err(err)) => SimError::agent(id, err),
                Err(payload) => SimError::AgentPanicked {
                    id,
                    message: panic_message(payload.as_ref()),
                },
            };

            error!("{} ({})", outcome, config.label());
            let slot = match outcome {
                SimError::AgentFailed { .. } => &mut knock_on,
                _ => &mut root_cause,
            };
            if slot.is_none() {
                *slot = Some(outcome);
            }
        }

        if let Some(err) = root_cause.or(knock_on) {
            return Err(err);
        }

        let elapsed = self.context.now().saturating_sub(started);
        info!("Simulation completed successfully in {:?}", elapsed);
        if config.strategy.is_retrying() {
            debug!(
                "{} retries across {} philosophers",
                agents.iter().map(|a| a.retries).sum::<u64>(),
                count
            );
        }

        Ok(SimulationReport {
            strategy: config.strategy,
            philosophers: count,
            iterations: config.iterations,
            elapsed,
            agents,
        })
    }
}

/// Runs one simulation on the system clock.
///
/// Entry point for callers that already hold validated parameters.
pub fn run_simulation(config: SimulationConfig) -> Result<SimulationReport, SimError> {
    Simulation::new(config, SystemContext::shared()).run()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
