//! Symposium Simulator CLI
//!
//! Run dining philosophers simulations and strategy benchmarks.

use clap::Parser;
use std::path::PathBuf;
use symposium_core::{SimulationConfig, Strategy, TimingProfile};
use symposium_env::SimError;
use symposium_sim::{
    run_with_clock, BenchmarkRunner, ClockMode, ResultTable, RunExport, Stopwatch, TimingStats,
};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Errors that stop the CLI before or after a run.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Sim(#[from] SimError),

    #[error("--export only supports a single strategy, not 'all'")]
    ExportNeedsSingleStrategy,

    #[error("--export is not available in benchmark mode; use --csv")]
    ExportInBenchmark,

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Symposium dining philosophers CLI
#[derive(Parser, Debug)]
#[command(name = "symposium-sim")]
#[command(about = "Compare deadlock-free strategies for the dining philosophers", long_about = None)]
struct Args {
    /// Number of philosophers (and forks)
    #[arg(short, long, default_value = "5")]
    philosophers: usize,

    /// Strategy to run (mutex, semaphore, try_lock, arbitrator, resource_hierarchy, all)
    #[arg(short = 'S', long, default_value = "mutex")]
    strategy: String,

    /// Dining cycles per philosopher
    #[arg(short, long, default_value = "10")]
    iterations: usize,

    /// Trace the first iterations of every philosopher
    #[arg(short, long)]
    verbose: bool,

    /// Master seed for drawn durations (0 = random from time)
    #[arg(short, long, default_value = "0")]
    seed: u64,

    /// Sweep philosopher counts × strategies instead of a single run
    #[arg(short, long)]
    benchmark: bool,

    /// Largest philosopher count the benchmark may spawn
    #[arg(long, default_value = "20")]
    max_philosophers: usize,

    /// Use near-zero think/eat/back-off durations
    #[arg(long)]
    brisk: bool,

    /// Sleep on a virtual clock instead of blocking
    #[arg(long)]
    virtual_clock: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Write the timing table to a CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Export a single run to a JSON file
    #[arg(long)]
    export: Option<PathBuf>,
}

impl Args {
    fn timing(&self) -> TimingProfile {
        if self.brisk {
            TimingProfile::brisk()
        } else {
            TimingProfile::default()
        }
    }

    fn clock(&self) -> ClockMode {
        if self.virtual_clock {
            ClockMode::Virtual
        } else {
            ClockMode::System
        }
    }

    fn strategies(&self) -> Result<Vec<Strategy>, SimError> {
        if self.strategy.eq_ignore_ascii_case("all") {
            Ok(Strategy::all())
        } else {
            Ok(vec![self.strategy.parse()?])
        }
    }
}

fn main() {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for tables and JSON
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if !args.json {
        info!("Symposium Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let outcome = if args.benchmark {
        run_benchmark_mode(&args)
    } else {
        run_simulation_mode(&args)
    };

    match outcome {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Error: {}", e);
            if matches!(e, CliError::Sim(SimError::UnknownStrategy(_))) {
                eprintln!(
                    "Available strategies: mutex, semaphore, try_lock, arbitrator, resource_hierarchy, all"
                );
            }
            std::process::exit(1);
        }
    }
}

/// Resolves `--seed`, replacing 0 with a time-derived seed.
fn resolve_seed(seed: u64) -> u64 {
    if seed != 0 {
        return seed;
    }
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(1)
        .max(1)
}

/// Runs one simulation per selected strategy. Returns true if all passed.
fn run_simulation_mode(args: &Args) -> Result<bool, CliError> {
    let strategies = args.strategies()?;
    if args.export.is_some() && strategies.len() > 1 {
        return Err(CliError::ExportNeedsSingleStrategy);
    }

    let seed = resolve_seed(args.seed);
    let clock = args.clock();
    let mut table = ResultTable::new("Dining philosophers");
    let mut results = Vec::with_capacity(strategies.len());
    let mut failed_count = 0;

    for strategy in strategies {
        let config = SimulationConfig::new(args.philosophers, strategy, args.iterations)
            .with_verbose(args.verbose)
            .with_timing(args.timing());
        let label = config.label();
        // Configuration errors apply to every strategy alike
        config.validate()?;

        let watch = Stopwatch::start(label.clone());
        let outcome = run_with_clock(config.clone(), clock, seed);
        let record = watch.stop();

        match &outcome {
            Ok(report) => {
                if !args.json {
                    info!(
                        "✓ {} (seed={}) completed: {} meals, {} retries, max wait {:?}",
                        label,
                        seed,
                        report.total_meals(),
                        report.total_retries(),
                        report.max_wait()
                    );
                }
                table.push(record.clone());
            }
            Err(e) => {
                error!("✗ {} (seed={}) FAILED: {}", label, seed, e);
                failed_count += 1;
            }
        }

        if let Some(path) = &args.export {
            let mut export = RunExport::new(&config, seed, clock);
            export.finalize(&outcome);
            export.write_to_file(path).map_err(|source| CliError::Write {
                path: path.clone(),
                source,
            })?;
            info!("Exported run to {}", path.display());
        }

        results.push(serde_json::json!({
            "label": label,
            "strategy": strategy.name(),
            "philosophers": args.philosophers,
            "iterations": args.iterations,
            "passed": outcome.is_ok(),
            "elapsed_ms": record.millis(),
            "failure_reason": outcome.as_ref().err().map(|e| e.to_string()),
        }));
    }

    write_csv(args, &table)?;

    let total = results.len();
    if args.json {
        let summary = serde_json::json!({
            "seed": seed,
            "clock": clock.name(),
            "total": total,
            "passed": total - failed_count,
            "failed": failed_count,
            "results": results,
        });
        print_json(&summary);
    } else if total > 1 {
        println!("{}", table.render());
    }

    Ok(failed_count == 0)
}

/// Runs the benchmark sweep. Returns true if every cell passed.
fn run_benchmark_mode(args: &Args) -> Result<bool, CliError> {
    if args.export.is_some() {
        return Err(CliError::ExportInBenchmark);
    }

    let seed = resolve_seed(args.seed);
    let report = BenchmarkRunner::new(args.max_philosophers, args.iterations)
        .with_timing(args.timing())
        .with_seed(seed)
        .with_clock(args.clock())
        .run()?;

    write_csv(args, &report.table)?;

    if args.json {
        print_json(&report);
    } else {
        println!("{}", report.table.render());
        if let Some(stats) = report.table.statistics() {
            print_statistics(&stats);
        }

        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        if report.all_passed() {
            info!("✅ All {} benchmark cells passed!", report.samples.len());
        } else {
            for sample in report.failures() {
                error!(
                    "  - {}: {}",
                    sample.label,
                    sample.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    Ok(report.all_passed())
}

fn write_csv(args: &Args, table: &ResultTable) -> Result<(), CliError> {
    if let Some(path) = &args.csv {
        table.write_csv(path)?;
        info!("Results saved to {}", path.display());
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to serialize results: {}", e),
    }
}

fn print_statistics(stats: &TimingStats) {
    println!("=== Benchmark statistics ===");
    println!("Runs: {}", stats.count);
    println!("Mean: {:.2} µs ({:.4} ms)", stats.mean_us, stats.mean_us / 1_000.0);
    println!("Fastest: {:.2} µs ({})", stats.min_us, stats.fastest);
    println!("Slowest: {:.2} µs ({})", stats.max_us, stats.slowest);
    println!("Std deviation: {:.2} µs", stats.std_dev_us);
    println!(
        "Spread: {:.2} µs ({:.1}%)",
        stats.spread_us(),
        stats.spread_percent()
    );
}
