//! Progress loggers for epoch reports.
//!
//! Provides different logging backends for training progress.

use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Progress summary emitted once per epoch boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochReport {
    /// Epoch that just ended (1-based).
    pub epoch: u64,
    /// Committed timesteps at the time of the report.
    pub timestep: u64,
    /// Episodes averaged into `average_score`.
    pub episodes: usize,
    /// Mean score of those episodes.
    pub average_score: f64,
}

/// Final session numbers, produced once at shutdown.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    /// Episodes whose scores were recorded.
    pub episodes: usize,
    /// Committed timesteps.
    pub timesteps: u64,
    /// Epochs reported.
    pub epochs: u64,
    /// Mean score over all recorded episodes, 0 if none.
    pub mean_score: f64,
}

/// Logger trait for different logging backends.
pub trait MetricsLogger: Send {
    /// Log an epoch report.
    fn log(&mut self, report: &EpochReport);

    /// Log the final summary. Default is a no-op.
    fn log_summary(&mut self, _summary: &TrainingSummary) {}

    /// Flush any buffered output.
    fn flush(&mut self);
}

/// Plain stdout logger.
pub struct ConsoleLogger {
    start_time: Instant,
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsLogger for ConsoleLogger {
    fn log(&mut self, report: &EpochReport) {
        println!(
            "Epoch {} timestep {} average score {}",
            report.epoch, report.timestep, report.average_score
        );
    }

    fn log_summary(&mut self, summary: &TrainingSummary) {
        println!(
            "Finished {} episodes, {} timesteps, {} epochs in {:.1}s, mean score {}",
            summary.episodes,
            summary.timesteps,
            summary.epochs,
            self.start_time.elapsed().as_secs_f32(),
            summary.mean_score
        );
    }

    fn flush(&mut self) {
        let _ = std::io::stdout().flush();
    }
}

/// Emits reports as structured `tracing` events.
#[derive(Debug, Default)]
pub struct TracingLogger;

impl MetricsLogger for TracingLogger {
    fn log(&mut self, report: &EpochReport) {
        tracing::info!(
            epoch = report.epoch,
            timestep = report.timestep,
            episodes = report.episodes,
            average_score = report.average_score,
            "epoch finished"
        );
    }

    fn log_summary(&mut self, summary: &TrainingSummary) {
        tracing::info!(
            episodes = summary.episodes,
            timesteps = summary.timesteps,
            epochs = summary.epochs,
            mean_score = summary.mean_score,
            "training finished"
        );
    }

    fn flush(&mut self) {}
}

/// CSV file logger for analysis.
pub struct CsvLogger {
    writer: BufWriter<File>,
    start_time: Instant,
}

impl CsvLogger {
    /// Create a new CSV logger, truncating `path`.
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "epoch,timestep,episodes,average_score,elapsed_secs")?;

        Ok(Self {
            writer,
            start_time: Instant::now(),
        })
    }
}

impl MetricsLogger for CsvLogger {
    fn log(&mut self, report: &EpochReport) {
        let elapsed = self.start_time.elapsed().as_secs_f32();
        if let Err(e) = writeln!(
            self.writer,
            "{},{},{},{:.6},{:.2}",
            report.epoch, report.timestep, report.episodes, report.average_score, elapsed
        ) {
            tracing::warn!(error = %e, "failed to write epoch report to CSV");
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.writer.flush() {
            tracing::warn!(error = %e, "failed to flush CSV logger");
        }
    }
}

impl Drop for CsvLogger {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Multi-logger that writes to multiple backends.
#[derive(Default)]
pub struct MultiLogger {
    loggers: Vec<Box<dyn MetricsLogger>>,
}

impl MultiLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a logger.
    pub fn add<L: MetricsLogger + 'static>(mut self, logger: L) -> Self {
        self.loggers.push(Box::new(logger));
        self
    }
}

impl MetricsLogger for MultiLogger {
    fn log(&mut self, report: &EpochReport) {
        for logger in &mut self.loggers {
            logger.log(report);
        }
    }

    fn log_summary(&mut self, summary: &TrainingSummary) {
        for logger in &mut self.loggers {
            logger.log_summary(summary);
        }
    }

    fn flush(&mut self) {
        for logger in &mut self.loggers {
            logger.flush();
        }
    }
}

/// Keeps every report in memory; clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    reports: Arc<Mutex<Vec<EpochReport>>>,
    summary: Arc<Mutex<Option<TrainingSummary>>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports logged so far.
    pub fn reports(&self) -> Vec<EpochReport> {
        self.reports.lock().clone()
    }

    pub fn summary(&self) -> Option<TrainingSummary> {
        self.summary.lock().clone()
    }
}

impl MetricsLogger for RecordingLogger {
    fn log(&mut self, report: &EpochReport) {
        self.reports.lock().push(report.clone());
    }

    fn log_summary(&mut self, summary: &TrainingSummary) {
        *self.summary.lock() = Some(summary.clone());
    }

    fn flush(&mut self) {}
}
