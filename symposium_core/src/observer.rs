//! Instrumentation hooks for the dining cycle.
//!
//! Observers watch philosophers without taking part in synchronization.
//! `on_acquired` fires after a fork is really held and `on_released` before it
//! is really given back, so every holding interval an observer sees is nested
//! inside the true one. `on_arbitration` runs inside the arbitrator's guarded
//! section.

use std::time::Duration;
use symposium_env::Seat;

/// Receives events from every philosopher thread of a run.
///
/// All methods default to no-ops; implement only what you need.
pub trait DiningObserver: Send + Sync + 'static {
    /// A philosopher starts thinking (iteration is zero-based).
    fn on_think(&self, _seat: &Seat, _iteration: usize) {}

    /// A philosopher starts eating (iteration is zero-based).
    fn on_eat(&self, _seat: &Seat, _iteration: usize) {}

    /// A philosopher is about to request `fork`.
    fn on_request(&self, _seat: &Seat, _fork: usize) {}

    /// A philosopher now holds `fork`.
    fn on_acquired(&self, _seat: &Seat, _fork: usize) {}

    /// A philosopher is about to give back `fork`.
    fn on_released(&self, _seat: &Seat, _fork: usize) {}

    /// A philosopher backs off for `delay` after a failed attempt.
    fn on_backoff(&self, _seat: &Seat, _delay: Duration) {}

    /// The arbitrator decided on a request.
    fn on_arbitration(&self, _seat: &Seat, _granted: bool) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl DiningObserver for NoopObserver {}
