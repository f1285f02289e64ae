//! DiningPolicy - how one philosopher acquires and releases its forks.
//!
//! A policy is the run's [`Strategy`] plus its [`TimingProfile`]. It is
//! built once per run, never mutated, and shared by every philosopher.

use crate::observer::DiningObserver;
use crate::strategy::Strategy;
use crate::table::{ArbiterGrant, DiningTable, HeldFork};

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use symposium_env::{Seat, SimError, TableContext};

/// Inclusive range of milliseconds a random duration is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationRange {
    /// Lower bound (ms)
    pub min_ms: u64,

    /// Upper bound, inclusive (ms)
    pub max_ms: u64,
}

impl DurationRange {
    /// Creates a range; `min_ms` must not exceed `max_ms`.
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// A range that always yields the same duration.
    pub const fn fixed(ms: u64) -> Self {
        Self::new(ms, ms)
    }

    /// Draws a duration uniformly from the range.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        Duration::from_millis(rng.gen_range(self.min_ms..=self.max_ms))
    }

    /// Returns true if the bounds are ordered.
    pub fn is_valid(&self) -> bool {
        self.min_ms <= self.max_ms
    }
}

impl std::fmt::Display for DurationRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}ms", self.min_ms, self.max_ms)
    }
}

/// Durations used by the dining cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingProfile {
    /// Thinking time before each meal
    pub think: DurationRange,

    /// Eating time while holding both forks
    pub eat: DurationRange,

    /// Randomized back-off after a failed try-lock attempt
    pub backoff: DurationRange,

    /// Fixed delay before asking the arbitrator again
    pub arbiter_retry: Duration,
}

impl Default for TimingProfile {
    fn default() -> Self {
        Self {
            think: DurationRange::new(50, 200),
            eat: DurationRange::new(100, 300),
            backoff: DurationRange::new(10, 50),
            arbiter_retry: Duration::from_millis(10),
        }
    }
}

impl TimingProfile {
    /// Near-zero durations for tests and quick sweeps.
    pub fn brisk() -> Self {
        Self {
            think: DurationRange::new(0, 2),
            eat: DurationRange::new(0, 2),
            backoff: DurationRange::new(0, 2),
            arbiter_retry: Duration::from_millis(1),
        }
    }

    /// Rejects inverted ranges.
    pub fn validate(&self) -> Result<(), SimError> {
        for (name, range) in [("think", self.think), ("eat", self.eat), ("backoff", self.backoff)] {
            if !range.is_valid() {
                return Err(SimError::InvalidTiming(format!(
                    "{} range {}..{} is inverted",
                    name, range.min_ms, range.max_ms
                )));
            }
        }
        Ok(())
    }
}

/// What a philosopher holds while eating.
enum Holding<'t> {
    /// Two individually locked forks, in acquisition order
    Forks(HeldFork<'t>, HeldFork<'t>),

    /// A pair granted by the arbitrator
    Grant(ArbiterGrant<'t>),
}

/// Both forks of one meal, plus how hard they were to get.
pub struct Grip<'t> {
    holding: Holding<'t>,
    retries: u64,
}

impl Grip<'_> {
    /// Returns the forks in acquisition order.
    pub fn forks(&self) -> [usize; 2] {
        match &self.holding {
            Holding::Forks(first, second) => [first.index(), second.index()],
            Holding::Grant(grant) => grant.forks(),
        }
    }

    /// Returns failed attempts before success (back-offs or refusals).
    pub fn retries(&self) -> u64 {
        self.retries
    }
}

/// The shared, read-only acquisition policy of a run.
///
/// Only built through [`DiningPolicy::new`], so every range it samples from
/// has been validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiningPolicy {
    /// Acquisition algorithm every philosopher uses
    strategy: Strategy,

    /// Durations for thinking, eating and retrying
    timing: TimingProfile,
}

impl DiningPolicy {
    /// Creates a new policy, rejecting inverted timing ranges.
    pub fn new(strategy: Strategy, timing: TimingProfile) -> Result<Self, SimError> {
        timing.validate()?;
        Ok(Self { strategy, timing })
    }

    /// Returns the acquisition algorithm.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Returns the durations philosophers draw from.
    pub fn timing(&self) -> TimingProfile {
        self.timing
    }

    /// Acquires both forks of `seat` following the strategy.
    ///
    /// Blocks (Mutex, Semaphore, ResourceHierarchy) or retries
    /// (TryLock, Arbitrator) until both are held.
    pub fn acquire<'t, C, O>(
        &self,
        seat: &Seat,
        table: &'t DiningTable,
        context: &C,
        rng: &mut ChaCha8Rng,
        observer: &O,
    ) -> Result<Grip<'t>, SimError>
    where
        C: TableContext,
        O: DiningObserver,
    {
        match self.strategy {
            Strategy::Mutex | Strategy::Semaphore | Strategy::ResourceHierarchy => {
                self.acquire_in_order(seat, table, observer)
            }
            Strategy::TryLock => self.acquire_optimistic(seat, table, context, rng, observer),
            Strategy::Arbitrator => self.acquire_from_arbiter(seat, table, context, observer),
        }
    }

    /// Gives both forks back, in reverse order of acquisition.
    pub fn release<O: DiningObserver>(&self, seat: &Seat, grip: Grip<'_>, observer: &O) {
        match grip.holding {
            Holding::Forks(first, second) => {
                observer.on_released(seat, second.index());
                drop(second);
                observer.on_released(seat, first.index());
                drop(first);
            }
            Holding::Grant(grant) => {
                for fork in grant.forks() {
                    observer.on_released(seat, fork);
                }
                drop(grant);
            }
        }
    }

    /// Blocking acquisition in the strategy's fixed order.
    fn acquire_in_order<'t, O: DiningObserver>(
        &self,
        seat: &Seat,
        table: &'t DiningTable,
        observer: &O,
    ) -> Result<Grip<'t>, SimError> {
        let [first, second] = self.strategy.acquisition_order(seat);

        observer.on_request(seat, first);
        let first = table.lock(first, seat.id)?;
        observer.on_acquired(seat, first.index());

        observer.on_request(seat, second);
        let second = table.lock(second, seat.id)?;
        observer.on_acquired(seat, second.index());

        Ok(Grip {
            holding: Holding::Forks(first, second),
            retries: 0,
        })
    }

    /// try_lock left, then right; on any failure hold nothing and back off.
    fn acquire_optimistic<'t, C, O>(
        &self,
        seat: &Seat,
        table: &'t DiningTable,
        context: &C,
        rng: &mut ChaCha8Rng,
        observer: &O,
    ) -> Result<Grip<'t>, SimError>
    where
        C: TableContext,
        O: DiningObserver,
    {
        let mut retries = 0;

        loop {
            observer.on_request(seat, seat.left);
            if let Some(first) = table.try_lock(seat.left, seat.id)? {
                observer.on_acquired(seat, seat.left);

                observer.on_request(seat, seat.right);
                if let Some(second) = table.try_lock(seat.right, seat.id)? {
                    observer.on_acquired(seat, seat.right);
                    return Ok(Grip {
                        holding: Holding::Forks(first, second),
                        retries,
                    });
                }

                // Never sleep while holding a single fork.
                observer.on_released(seat, seat.left);
                drop(first);
            }

            retries += 1;
            let delay = self.timing.backoff.sample(rng);
            observer.on_backoff(seat, delay);
            context.sleep(delay);
        }
    }

    /// Ask the waiter for both forks until it says yes.
    fn acquire_from_arbiter<'t, C, O>(
        &self,
        seat: &Seat,
        table: &'t DiningTable,
        context: &C,
        observer: &O,
    ) -> Result<Grip<'t>, SimError>
    where
        C: TableContext,
        O: DiningObserver,
    {
        let mut retries = 0;

        loop {
            let decision = table.arbitrate(seat.id, seat.forks(), |granted| {
                observer.on_arbitration(seat, granted)
            })?;

            if let Some(grant) = decision {
                for fork in grant.forks() {
                    observer.on_acquired(seat, fork);
                }
                return Ok(Grip {
                    holding: Holding::Grant(grant),
                    retries,
                });
            }

            retries += 1;
            observer.on_backoff(seat, self.timing.arbiter_retry);
            context.sleep(self.timing.arbiter_retry);
        }
    }
}
