//! Core environment context trait for dining philosophers.

use rand_chacha::ChaCha8Rng;
use std::time::Duration;

/// The central interface for environment interaction.
///
/// Every suspension point of a philosopher (thinking, eating, backing off)
/// goes through this trait, as does every random draw, so the same agent
/// code runs against the real clock or against a virtual one.
///
/// # Implementations
///
/// - **Production**: `SystemContext` - wraps `std::thread::sleep`, `Instant`
/// - **Simulation**: `VirtualContext` - virtual clock, sleeps become yields
///
/// Implementations are shared by reference across all philosopher threads.
pub trait TableContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// Used for wait-time accounting and run duration measurements.
    fn now(&self) -> Duration;

    /// Suspends the calling thread for the given duration.
    fn sleep(&self, duration: Duration);

    /// Derives an independent RNG for one philosopher.
    ///
    /// The implementation combines the global seed with `seed_extension`
    /// (the philosopher index) so that every agent draws its own sequence.
    ///
    /// # Arguments
    /// * `seed_extension` - A value to combine with the global seed
    fn derive_rng(&self, seed_extension: u64) -> ChaCha8Rng;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// `0` means unseeded: derived RNGs come from OS entropy.
    fn seed(&self) -> u64;
}
