//! Production implementation of TableContext using OS threads.

use crate::TableContext;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Mixing constant shared by every seeded context.
pub const SEED_MIX: u64 = 0x517cc1b727220a95;

/// Combines a master seed with a per-philosopher extension.
///
/// Every context derives its per-philosopher RNGs from this value, so the
/// same seed draws the same durations on any clock.
pub fn mix_seed(seed: u64, seed_extension: u64) -> u64 {
    seed.wrapping_mul(SEED_MIX) ^ seed_extension
}

/// Derives a per-philosopher RNG from a master seed.
///
/// A zero seed means "unseeded" and falls back to OS entropy.
pub(crate) fn seeded_rng(seed: u64, seed_extension: u64) -> ChaCha8Rng {
    if seed == 0 {
        ChaCha8Rng::from_entropy()
    } else {
        ChaCha8Rng::seed_from_u64(mix_seed(seed, seed_extension))
    }
}

/// Production context backed by the system clock.
///
/// Sleeps block the calling thread for real. Randomness comes from OS
/// entropy unless a seed is supplied, in which case each philosopher's
/// sequence of think/eat/back-off durations is reproducible.
pub struct SystemContext {
    /// Start time for monotonic duration calculations
    start: Instant,

    /// Master seed (0 = unseeded)
    seed: u64,
}

impl SystemContext {
    /// Creates a new unseeded SystemContext.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Creates a SystemContext whose derived RNGs are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            start: Instant::now(),
            seed,
        }
    }

    /// Creates an Arc-wrapped context for sharing across threads.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for SystemContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TableContext for SystemContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }

    fn derive_rng(&self, seed_extension: u64) -> ChaCha8Rng {
        seeded_rng(self.seed, seed_extension)
    }

    fn seed(&self) -> u64 {
        self.seed
    }
}
