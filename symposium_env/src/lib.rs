//! Symposium Environment Abstraction Layer
//!
//! This crate provides the seam between the dining-table engine and the
//! "real world" it runs in. Philosophers never touch the system clock or an
//! RNG directly; they go through a [`TableContext`]:
//! - Time (`now()`, `sleep()`)
//! - Randomness (`derive_rng()`)
//!
//! Production runs use [`SystemContext`] (real sleeps, OS entropy unless a
//! seed is given). The simulation crate ships a virtual-clock context that
//! turns every sleep into a yield so whole runs finish in milliseconds.
//!
//! # Example
//!
//! ```ignore
//! use symposium_env::{Seat, SystemContext, TableContext};
//!
//! let ctx = SystemContext::shared();
//! let seat = Seat::new(0, 5);
//! let mut rng = ctx.derive_rng(seat.id.index() as u64);
//! ctx.sleep(Duration::from_millis(50));
//! ```

mod context;
mod types;
mod error;
mod system_impl;

pub use context::TableContext;
pub use types::{PhilosopherId, Seat};
pub use error::SimError;
pub use system_impl::{mix_seed, SystemContext, SEED_MIX};

/// Re-exported so implementors of [`TableContext`] name the same RNG type.
pub use rand_chacha::ChaCha8Rng;
