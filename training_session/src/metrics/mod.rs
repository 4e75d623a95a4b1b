//! Training metrics and progress reporting.
//!
//! ## Metrics
//!
//! - [`TrainingMetrics`]: Lock-free live counters
//! - [`EpochReporter`]: Epoch boundary detection, runs under the session lock
//!
//! ## Loggers
//!
//! - [`TracingLogger`]: Structured `tracing` events (default)
//! - [`ConsoleLogger`]: Plain stdout lines
//! - [`CsvLogger`]: CSV file logging for analysis
//! - [`MultiLogger`]: Combine multiple loggers
//! - [`RecordingLogger`]: In-memory capture

pub mod epoch;
pub mod logger;
pub mod training_metrics;

pub use epoch::EpochReporter;
pub use logger::{
    ConsoleLogger, CsvLogger, EpochReport, MetricsLogger, MultiLogger, RecordingLogger,
    TracingLogger, TrainingSummary,
};
pub use training_metrics::{training_metrics, SharedTrainingMetrics, TrainingMetrics};
