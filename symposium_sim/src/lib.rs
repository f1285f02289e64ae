//! Symposium Simulation Harness
//!
//! Everything around a single dining run:
//! - **Timing**: stopwatches, result tables, statistics, CSV/JSON export
//! - **Benchmarks**: philosopher counts × strategies, one run per cell
//! - **Virtual clock**: a `TableContext` whose sleeps only advance time
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     BenchmarkRunner                      │
//! │   counts {5, 10, 20} ≤ max  ×  Strategy::all()           │
//! │        │                                                 │
//! │  ┌─────▼─────┐   Stopwatch   ┌─────────────┐             │
//! │  │ Simulation├──────────────►│ ResultTable │─► CSV/JSON  │
//! │  └─────┬─────┘               └─────────────┘             │
//! │        │ SystemContext | VirtualContext                  │
//! └────────┴─────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use symposium_sim::{BenchmarkRunner, ClockMode};
//!
//! let report = BenchmarkRunner::new(20, 10)
//!     .with_clock(ClockMode::Virtual)
//!     .with_seed(42)
//!     .run()?;
//! println!("{}", report.table.render());
//! ```

mod context;
mod exporter;
pub mod runner;
pub mod timing;

pub use context::VirtualContext;
pub use exporter::{AgentFrame, RunExport};
pub use runner::{
    run_benchmark, run_with_clock, BenchmarkReport, BenchmarkRunner, BenchmarkSample, ClockMode,
};
pub use timing::{ResultTable, Stopwatch, TimingRecord, TimingStats};
