//! Symposium Core - Dining Philosophers Engine
//!
//! N philosophers sit around a table with one fork between each pair of
//! neighbors. Every meal needs both adjacent forks, so the table is a ring of
//! exclusive resources that five strategies compete to share without
//! deadlock:
//! 1. **Mutex**: parity-alternated lock order
//! 2. **Semaphore**: binary signals, fixed left-then-right order
//! 3. **TryLock**: optimistic grab, release and randomized back-off on failure
//! 4. **Arbitrator**: one guarded availability table grants pairs atomically
//! 5. **ResourceHierarchy**: globally lower-numbered fork first
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                        Simulation                         │
//! │   validate config ─► build DiningTable ─► spawn N threads │
//! │                                                           │
//! │  ┌─────────────┐   ┌─────────────┐        ┌─────────────┐ │
//! │  │ Philosopher │   │ Philosopher │  ...   │ Philosopher │ │
//! │  │     #0      │   │     #1      │        │    #N-1     │ │
//! │  └──────┬──────┘   └──────┬──────┘        └──────┬──────┘ │
//! │         │   DiningPolicy (shared, read-only)     │        │
//! │  ┌──────▼────────────────▼───────────────────────▼──────┐ │
//! │  │        DiningTable (forks + ownership ledger)        │ │
//! │  └──────────────────────────────────────────────────────┘ │
//! └───────────────────────────────────────────────────────────┘
//! ```

pub mod agent;
pub mod observer;
pub mod policy;
pub mod simulation;
pub mod strategy;
pub mod table;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types for convenience
pub use agent::{AgentReport, Philosopher, VERBOSE_TRACE_LIMIT};
pub use observer::{DiningObserver, NoopObserver};
pub use policy::{DiningPolicy, DurationRange, Grip, TimingProfile};
pub use simulation::{run_simulation, Simulation, SimulationConfig, SimulationReport};
pub use strategy::Strategy;
pub use table::{ArbiterGrant, DiningTable, ForkKind, HeldFork};
