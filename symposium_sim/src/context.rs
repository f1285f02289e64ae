//! Virtual-clock context implementing TableContext for fast, seeded runs.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use symposium_env::{mix_seed, TableContext};

/// Context backed by a virtual clock and deterministic RNGs.
///
/// This implements `TableContext` using:
/// - A virtual clock shared by every philosopher of the run
/// - Seeded ChaCha8 RNGs, one stream per philosopher
/// - Simulated sleep that advances virtual time and yields the thread
///
/// Philosophers still contend for real locks on real threads; only the
/// waiting is virtual. The clock accumulates every sleep of every thread, so
/// it measures simulated work rather than wall-clock time.
pub struct VirtualContext {
    /// Master seed for this run
    seed: u64,

    /// Current virtual time (nanoseconds since context creation)
    virtual_time_ns: Arc<AtomicU64>,
}

impl VirtualContext {
    /// Creates a new VirtualContext with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            virtual_time_ns: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Creates an Arc-wrapped context for sharing.
    pub fn shared(seed: u64) -> Arc<Self> {
        Arc::new(Self::new(seed))
    }

    /// Advances virtual time by the given duration.
    pub fn advance_time(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.virtual_time_ns.fetch_add(nanos, Ordering::AcqRel);
    }

    /// Returns the current virtual time in nanoseconds.
    pub fn time_ns(&self) -> u64 {
        self.virtual_time_ns.load(Ordering::Acquire)
    }
}

impl Clone for VirtualContext {
    fn clone(&self) -> Self {
        Self {
            seed: self.seed,
            virtual_time_ns: Arc::clone(&self.virtual_time_ns),
        }
    }
}

impl TableContext for VirtualContext {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.time_ns())
    }

    fn sleep(&self, duration: Duration) {
        // Let the other philosophers run instead of blocking
        self.advance_time(duration);
        std::thread::yield_now();
    }

    fn derive_rng(&self, seed_extension: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(mix_seed(self.seed, seed_extension))
    }

    fn seed(&self) -> u64 {
        self.seed
    }
}
