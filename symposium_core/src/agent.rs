//! Philosopher - the per-agent think → acquire → eat → release loop.

use crate::observer::DiningObserver;
use crate::policy::DiningPolicy;
use crate::table::DiningTable;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use symposium_env::{Seat, SimError, TableContext};
use tracing::{debug, info};

/// Verbose trace lines are emitted for at most this many iterations.
pub const VERBOSE_TRACE_LIMIT: usize = 10;

/// What one philosopher went through during a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentReport {
    /// Philosopher index
    pub id: usize,

    /// Completed dining cycles
    pub meals: usize,

    /// Total time spent waiting for forks
    pub total_wait: Duration,

    /// Longest single wait for a pair of forks
    pub max_wait: Duration,

    /// Failed attempts (try-lock back-offs or arbitrator refusals)
    pub retries: u64,
}

impl AgentReport {
    /// Creates an empty report for philosopher `id`.
    pub fn new(id: usize) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Records one meal.
    pub fn record_meal(&mut self, waited: Duration, retries: u64) {
        self.meals += 1;
        self.total_wait += waited;
        self.max_wait = self.max_wait.max(waited);
        self.retries += retries;
    }

    /// Average wait per meal.
    pub fn mean_wait(&self) -> Duration {
        if self.meals == 0 {
            Duration::ZERO
        } else {
            self.total_wait / self.meals as u32
        }
    }
}

/// A philosopher bound to one seat of one table.
///
/// Generic over the context and observer so the same loop runs against the
/// system clock or a virtual one, with or without instrumentation.
pub struct Philosopher<C, O>
where
    C: TableContext,
    O: DiningObserver,
{
    seat: Seat,
    table: Arc<DiningTable>,
    policy: Arc<DiningPolicy>,
    context: Arc<C>,
    observer: Arc<O>,
    iterations: usize,
    verbose: bool,
}

impl<C, O> Philosopher<C, O>
where
    C: TableContext,
    O: DiningObserver,
{
    /// Creates a new philosopher.
    ///
    /// # Arguments
    /// * `seat` - Position at the table (fixes both fork indices)
    /// * `table` - Forks shared with the neighbors
    /// * `policy` - Shared acquisition policy
    /// * `context` - Clock, sleep and randomness
    /// * `observer` - Instrumentation hooks
    /// * `iterations` - Dining cycles to run
    /// * `verbose` - Emit trace lines for the first iterations
    pub fn new(
        seat: Seat,
        table: Arc<DiningTable>,
        policy: Arc<DiningPolicy>,
        context: Arc<C>,
        observer: Arc<O>,
        iterations: usize,
        verbose: bool,
    ) -> Self {
        Self {
            seat,
            table,
            policy,
            context,
            observer,
            iterations,
            verbose,
        }
    }

    /// Returns the philosopher's seat.
    pub fn seat(&self) -> &Seat {
        &self.seat
    }

    /// Runs every dining cycle, then returns what happened.
    ///
    /// Any synchronization failure aborts the loop; forks held at that point
    /// are given back as the grip is dropped.
    pub fn run(self) -> Result<AgentReport, SimError> {
        let seat = self.seat;
        let timing = self.policy.timing();
        let mut rng = self.context.derive_rng(seat.id.index() as u64);
        let mut report = AgentReport::new(seat.id.index());

        for iteration in 0..self.iterations {
            let traced = self.verbose && iteration < VERBOSE_TRACE_LIMIT;

            if traced {
                info!("Philosopher {} is thinking (iteration {})", seat.id.index(), iteration + 1);
            }
            self.observer.on_think(&seat, iteration);
            self.context.sleep(timing.think.sample(&mut rng));

            let requested_at = self.context.now();
            let grip = self.policy.acquire(
                &seat,
                &self.table,
                self.context.as_ref(),
                &mut rng,
                self.observer.as_ref(),
            )?;
            let waited = self.context.now().saturating_sub(requested_at);
            report.record_meal(waited, grip.retries());

            if traced {
                info!("Philosopher {} is eating (iteration {})", seat.id.index(), iteration + 1);
            }
            self.observer.on_eat(&seat, iteration);
            self.context.sleep(timing.eat.sample(&mut rng));

            self.policy.release(&seat, grip, self.observer.as_ref());
        }

        debug!(
            "Philosopher {} done: {} meals, max wait {:?}, {} retries",
            seat.id.index(),
            report.meals,
            report.max_wait,
            report.retries
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::TimingProfile;
    use crate::strategy::Strategy;
    use crate::testing::RecordingObserver;
    use std::io::{self, Write};
    use std::sync::Mutex;
    use symposium_env::SystemContext;
    use tracing::Level;

    fn lone_philosopher(
        strategy: Strategy,
        iterations: usize,
        verbose: bool,
    ) -> (Philosopher<SystemContext, RecordingObserver>, Arc<RecordingObserver>) {
        let table = Arc::new(DiningTable::new(2, strategy.fork_kind()));
        let policy = Arc::new(DiningPolicy::new(strategy, TimingProfile::brisk()).unwrap());
        let observer = Arc::new(RecordingObserver::new(2));
        let philosopher = Philosopher::new(
            Seat::new(0, 2),
            table,
            policy,
            Arc::new(SystemContext::with_seed(11)),
            observer.clone(),
            iterations,
            verbose,
        );
        (philosopher, observer)
    }

    #[test]
    fn test_runs_exact_iterations() {
        for strategy in Strategy::all() {
            let (philosopher, observer) = lone_philosopher(strategy, 12, false);
            let report = philosopher.run().unwrap();

            assert_eq!(report.meals, 12, "{}", strategy);
            assert_eq!(observer.meals_of(0), 12);
            // Nobody else at the table: nothing to retry for
            assert_eq!(report.retries, 0);
        }
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLog {
        fn lines_containing(&self, needle: &str) -> usize {
            let bytes = self.0.lock().unwrap();
            String::from_utf8_lossy(&bytes)
                .lines()
                .filter(|line| line.contains(needle))
                .count()
        }
    }

    /// Runs `philosopher` on this thread with its log captured.
    fn run_captured(
        philosopher: Philosopher<SystemContext, RecordingObserver>,
    ) -> (AgentReport, CapturedLog) {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(Level::INFO)
            .with_ansi(false)
            .finish();

        let report = tracing::subscriber::with_default(subscriber, || philosopher.run()).unwrap();
        (report, log)
    }

    #[test]
    fn test_verbose_trace_is_capped() {
        let (philosopher, observer) = lone_philosopher(Strategy::ResourceHierarchy, 15, true);
        let (report, log) = run_captured(philosopher);

        assert_eq!(log.lines_containing("Philosopher 0 is thinking"), VERBOSE_TRACE_LIMIT);
        assert_eq!(log.lines_containing("Philosopher 0 is eating"), VERBOSE_TRACE_LIMIT);
        assert_eq!(log.lines_containing("(iteration 10)"), 2);
        assert_eq!(log.lines_containing("(iteration 11)"), 0);

        // Tracing never changes the cycle itself
        assert_eq!(report.meals, 15);
        assert_eq!(observer.acquired_by(0).len(), 30);
    }

    #[test]
    fn test_quiet_run_emits_no_trace() {
        let (philosopher, _observer) = lone_philosopher(Strategy::Mutex, 5, false);
        let (report, log) = run_captured(philosopher);

        assert_eq!(report.meals, 5);
        assert_eq!(log.lines_containing("is thinking"), 0);
        assert_eq!(log.lines_containing("is eating"), 0);
    }

    #[test]
    fn test_report_accounting() {
        let mut report = AgentReport::new(3);
        report.record_meal(Duration::from_millis(4), 0);
        report.record_meal(Duration::from_millis(10), 2);

        assert_eq!(report.meals, 2);
        assert_eq!(report.max_wait, Duration::from_millis(10));
        assert_eq!(report.mean_wait(), Duration::from_millis(7));
        assert_eq!(report.retries, 2);
        assert_eq!(AgentReport::new(0).mean_wait(), Duration::ZERO);
    }
}
