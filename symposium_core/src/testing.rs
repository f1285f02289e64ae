//! Test support: a recording observer and deadline-bounded runs.

use crate::observer::DiningObserver;
use crate::simulation::{Simulation, SimulationConfig, SimulationReport};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;
use symposium_env::{Seat, SimError, SystemContext};

const FREE: usize = 0;

/// Default deadline for an observed run; a hang fails the test instead of
/// stalling the suite.
pub(crate) const RUN_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Think,
    Eat,
    Request(usize),
    Acquired(usize),
    Released(usize),
    Backoff,
    Arbitration,
}

/// Observer that records every event and checks mutual exclusion on the side.
///
/// Holding intervals are tracked in a ledger of its own, independent of the
/// table's, so a double hold shows up as a violation even if the table's
/// ledger were wrong.
pub(crate) struct RecordingObserver {
    events: Mutex<Vec<(usize, Event)>>,
    fork_holders: Vec<AtomicUsize>,
    held_by_seat: Vec<AtomicUsize>,
    violations: AtomicUsize,
    backoffs: AtomicUsize,
    backoffs_while_holding: AtomicUsize,
    arbitrations: AtomicUsize,
    refusals: AtomicUsize,
    arbitrating: AtomicUsize,
    arbitration_overlaps: AtomicUsize,
    arbitration_pause: Option<Duration>,
}

impl RecordingObserver {
    pub(crate) fn new(count: usize) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fork_holders: (0..count).map(|_| AtomicUsize::new(FREE)).collect(),
            held_by_seat: (0..count).map(|_| AtomicUsize::new(0)).collect(),
            violations: AtomicUsize::new(0),
            backoffs: AtomicUsize::new(0),
            backoffs_while_holding: AtomicUsize::new(0),
            arbitrations: AtomicUsize::new(0),
            refusals: AtomicUsize::new(0),
            arbitrating: AtomicUsize::new(0),
            arbitration_overlaps: AtomicUsize::new(0),
            arbitration_pause: None,
        }
    }

    /// Sleeps inside every arbitration so interleavings would be caught.
    pub(crate) fn widen_arbitration(mut self, pause: Duration) -> Self {
        self.arbitration_pause = Some(pause);
        self
    }

    fn push(&self, seat: &Seat, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((seat.id.index(), event));
    }

    fn events_of(&self, id: usize) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(who, _)| *who == id)
            .map(|(_, event)| *event)
            .collect()
    }

    pub(crate) fn event_count(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub(crate) fn requested_by(&self, id: usize) -> Vec<usize> {
        self.events_of(id)
            .into_iter()
            .filter_map(|e| match e {
                Event::Request(fork) => Some(fork),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn acquired_by(&self, id: usize) -> Vec<usize> {
        self.events_of(id)
            .into_iter()
            .filter_map(|e| match e {
                Event::Acquired(fork) => Some(fork),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn released_by(&self, id: usize) -> Vec<usize> {
        self.events_of(id)
            .into_iter()
            .filter_map(|e| match e {
                Event::Released(fork) => Some(fork),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn meals_of(&self, id: usize) -> usize {
        self.events_of(id).iter().filter(|e| **e == Event::Eat).count()
    }

    pub(crate) fn thoughts_of(&self, id: usize) -> usize {
        self.events_of(id).iter().filter(|e| **e == Event::Think).count()
    }

    pub(crate) fn backoffs(&self) -> usize {
        self.backoffs.load(Ordering::SeqCst)
    }

    pub(crate) fn backoffs_while_holding(&self) -> usize {
        self.backoffs_while_holding.load(Ordering::SeqCst)
    }

    pub(crate) fn arbitrations(&self) -> usize {
        self.arbitrations.load(Ordering::SeqCst)
    }

    pub(crate) fn refusals(&self) -> usize {
        self.refusals.load(Ordering::SeqCst)
    }

    pub(crate) fn arbitration_overlaps(&self) -> usize {
        self.arbitration_overlaps.load(Ordering::SeqCst)
    }

    pub(crate) fn violations(&self) -> usize {
        self.violations.load(Ordering::SeqCst)
    }
}

impl DiningObserver for RecordingObserver {
    fn on_think(&self, seat: &Seat, _iteration: usize) {
        self.push(seat, Event::Think);
    }

    fn on_eat(&self, seat: &Seat, _iteration: usize) {
        // Eating requires exactly the two adjacent forks
        for fork in seat.forks() {
            if self.fork_holders[fork].load(Ordering::SeqCst) != seat.id.index() + 1 {
                self.violations.fetch_add(1, Ordering::SeqCst);
            }
        }
        self.push(seat, Event::Eat);
    }

    fn on_request(&self, seat: &Seat, fork: usize) {
        self.push(seat, Event::Request(fork));
    }

    fn on_acquired(&self, seat: &Seat, fork: usize) {
        let claimed = self.fork_holders[fork].compare_exchange(
            FREE,
            seat.id.index() + 1,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        if claimed.is_err() {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
        self.held_by_seat[seat.id.index()].fetch_add(1, Ordering::SeqCst);
        self.push(seat, Event::Acquired(fork));
    }

    fn on_released(&self, seat: &Seat, fork: usize) {
        self.held_by_seat[seat.id.index()].fetch_sub(1, Ordering::SeqCst);
        let cleared = self.fork_holders[fork].compare_exchange(
            seat.id.index() + 1,
            FREE,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        if cleared.is_err() {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
        self.push(seat, Event::Released(fork));
    }

    fn on_backoff(&self, seat: &Seat, _delay: Duration) {
        self.backoffs.fetch_add(1, Ordering::SeqCst);
        if self.held_by_seat[seat.id.index()].load(Ordering::SeqCst) > 0 {
            self.backoffs_while_holding.fetch_add(1, Ordering::SeqCst);
        }
        self.push(seat, Event::Backoff);
    }

    fn on_arbitration(&self, seat: &Seat, granted: bool) {
        if self.arbitrating.fetch_add(1, Ordering::SeqCst) > 0 {
            self.arbitration_overlaps.fetch_add(1, Ordering::SeqCst);
        }
        if let Some(pause) = self.arbitration_pause {
            thread::sleep(pause);
        }
        self.arbitrations.fetch_add(1, Ordering::SeqCst);
        if !granted {
            self.refusals.fetch_add(1, Ordering::SeqCst);
        }
        self.push(seat, Event::Arbitration);
        self.arbitrating.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs `config` on the system clock with `observer`, failing the test if it
/// does not finish within `deadline`.
pub(crate) fn run_within<O: DiningObserver>(
    config: SimulationConfig,
    observer: Arc<O>,
    deadline: Duration,
) -> Result<SimulationReport, SimError> {
    let label = config.label();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let outcome = Simulation::new(config, SystemContext::shared())
            .with_observer(observer)
            .run();
        let _ = tx.send(outcome);
    });

    match rx.recv_timeout(deadline) {
        Ok(outcome) => outcome,
        Err(_) => panic!("{} did not finish within {:?}", label, deadline),
    }
}

/// [`run_within`] with the default deadline.
pub(crate) fn run_observed<O: DiningObserver>(
    config: SimulationConfig,
    observer: Arc<O>,
) -> Result<SimulationReport, SimError> {
    run_within(config, observer, RUN_DEADLINE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::Strategy;
    use crate::TimingProfile;

    #[test]
    fn test_recorder_flags_double_hold() {
        let observer = RecordingObserver::new(3);
        observer.on_acquired(&Seat::new(0, 3), 1);
        observer.on_acquired(&Seat::new(1, 3), 1);

        assert_eq!(observer.violations(), 1);
        assert_eq!(observer.acquired_by(1), vec![1]);
    }

    #[test]
    fn test_recorder_counts_cycle() {
        let observer = Arc::new(RecordingObserver::new(3));
        let config =
            SimulationConfig::new(3, Strategy::Mutex, 4).with_timing(TimingProfile::brisk());
        run_observed(config, observer.clone()).unwrap();

        for id in 0..3 {
            assert_eq!(observer.thoughts_of(id), 4);
            assert_eq!(observer.meals_of(id), 4);
            assert_eq!(observer.released_by(id).len(), 8);
        }
        assert_eq!(observer.violations(), 0);
    }
}
