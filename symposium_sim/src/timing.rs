//! Timing and reporting: stopwatches, result tables, statistics, export.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant};
use symposium_env::SimError;

const RULE_WIDTH: usize = 60;

/// A running wall-clock timer for one labelled unit of work.
#[derive(Debug)]
pub struct Stopwatch {
    label: String,
    started: Instant,
}

impl Stopwatch {
    /// Starts timing `label` now.
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            started: Instant::now(),
        }
    }

    /// Returns the label being timed.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Time since the stopwatch was started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Stops the stopwatch and returns its measurement.
    pub fn stop(self) -> TimingRecord {
        let duration = self.elapsed();
        TimingRecord {
            label: self.label,
            duration,
        }
    }
}

/// One (label, duration) measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingRecord {
    /// What was timed, e.g. `"5_philosophers_mutex"`
    pub label: String,

    /// Wall-clock time it took
    pub duration: Duration,
}

impl TimingRecord {
    /// Creates a record from an already measured duration.
    pub fn new(label: impl Into<String>, duration: Duration) -> Self {
        Self {
            label: label.into(),
            duration,
        }
    }

    /// Duration in fractional microseconds.
    pub fn micros(&self) -> f64 {
        self.duration.as_secs_f64() * 1_000_000.0
    }

    /// Duration in fractional milliseconds.
    pub fn millis(&self) -> f64 {
        self.duration.as_secs_f64() * 1_000.0
    }

    /// Duration in fractional seconds.
    pub fn secs(&self) -> f64 {
        self.duration.as_secs_f64()
    }
}

/// Summary statistics over a [`ResultTable`], in microseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingStats {
    /// Number of records summarized
    pub count: usize,

    /// Arithmetic mean
    pub mean_us: f64,

    /// Fastest measurement
    pub min_us: f64,

    /// Label of the fastest measurement
    pub fastest: String,

    /// Slowest measurement
    pub max_us: f64,

    /// Label of the slowest measurement
    pub slowest: String,

    /// Population standard deviation
    pub std_dev_us: f64,
}

impl TimingStats {
    /// Distance between the slowest and fastest measurement.
    pub fn spread_us(&self) -> f64 {
        self.max_us - self.min_us
    }

    /// Spread relative to the fastest measurement, in percent.
    ///
    /// Zero when the fastest measurement is zero.
    pub fn spread_percent(&self) -> f64 {
        if self.min_us > 0.0 {
            self.spread_us() / self.min_us * 100.0
        } else {
            0.0
        }
    }
}

/// An ordered collection of timing records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    title: String,
    records: Vec<TimingRecord>,
}

impl ResultTable {
    /// Creates an empty table.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            records: Vec::new(),
        }
    }

    /// Returns the heading printed above the table.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Records one measurement.
    pub fn record(&mut self, label: impl Into<String>, duration: Duration) {
        self.records.push(TimingRecord::new(label, duration));
    }

    /// Records a stopped stopwatch.
    pub fn push(&mut self, record: TimingRecord) {
        self.records.push(record);
    }

    /// Returns the measurements in recording order.
    pub fn records(&self) -> &[TimingRecord] {
        &self.records
    }

    /// Returns the number of measurements.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Renders a fixed-width table with microsecond and millisecond columns.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== {} ===", self.title);
        let _ = writeln!(out, "{:<30} {:<15} {:<15}", "Test", "Time (µs)", "Time (ms)");
        let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
        for record in &self.records {
            let _ = writeln!(
                out,
                "{:<30} {:<15.2} {:<15.4}",
                record.label,
                record.micros(),
                record.millis()
            );
        }
        let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
        out
    }

    /// Computes summary statistics, or `None` for an empty table.
    ///
    /// Ties keep the first record seen as fastest/slowest.
    pub fn statistics(&self) -> Option<TimingStats> {
        let first = self.records.first()?;
        let count = self.records.len();

        let mut sum = 0.0;
        let (mut min_us, mut fastest) = (first.micros(), &first.label);
        let (mut max_us, mut slowest) = (first.micros(), &first.label);

        for record in &self.records {
            let us = record.micros();
            sum += us;
            if us < min_us {
                min_us = us;
                fastest = &record.label;
            }
            if us > max_us {
                max_us = us;
                slowest = &record.label;
            }
        }

        let mean_us = sum / count as f64;
        let variance = self
            .records
            .iter()
            .map(|r| (r.micros() - mean_us).powi(2))
            .sum::<f64>()
            / count as f64;

        Some(TimingStats {
            count,
            mean_us,
            min_us,
            fastest: fastest.clone(),
            max_us,
            slowest: slowest.clone(),
            std_dev_us: variance.sqrt(),
        })
    }

    /// Writes the table as CSV with a `test,microseconds,milliseconds,seconds` header.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let mut file = BufWriter::new(File::create(path)?);
        writeln!(file, "test,microseconds,milliseconds,seconds")?;
        for record in &self.records {
            writeln!(
                file,
                "{},{:.2},{:.4},{:.6}",
                record.label,
                record.micros(),
                record.millis(),
                record.secs()
            )?;
        }
        file.flush()?;
        Ok(())
    }

    /// Writes the table and its statistics as pretty-printed JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let export = serde_json::json!({
            "title": self.title,
            "records": self.records,
            "statistics": self.statistics(),
        });
        let json = serde_json::to_string_pretty(&export).map_err(std::io::Error::from)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
