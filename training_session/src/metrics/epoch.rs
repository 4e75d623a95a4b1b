//! Epoch boundary detection and progress reporting.
//!
//! Epochs are measured in committed timesteps: epoch `n` ends once the
//! session has committed `n * epoch_size` steps. The reported average covers
//! the episodes completed since the previous report. Each report advances the
//! epoch id by one. When one episode carries the counter across several
//! boundaries, later checks catch up one boundary at a time.
//!
//! The reporter mutates [`SessionState`] and must run under the session lock,
//! which is what guarantees one report per boundary under concurrent callers.

use super::logger::{EpochReport, MetricsLogger};
use crate::core::SessionState;

/// Turns timestep progress into epoch reports.
pub struct EpochReporter {
    epoch_size: u64,
    logger: Box<dyn MetricsLogger>,
}

impl EpochReporter {
    /// Create a reporter. `epoch_size` is clamped to at least one step.
    pub fn new(epoch_size: u64, logger: Box<dyn MetricsLogger>) -> Self {
        Self {
            epoch_size: epoch_size.max(1),
            logger,
        }
    }

    pub fn epoch_size(&self) -> u64 {
        self.epoch_size
    }

    /// Whether the next boundary has been crossed.
    pub fn boundary_crossed(&self, state: &SessionState) -> bool {
        state.timestep() >= (state.epoch() + 1) * self.epoch_size
    }

    /// Advance the epoch by one and log a report if the next boundary was
    /// crossed.
    ///
    /// At most one report per call. Stopped sessions never report.
    pub fn check(&mut self, state: &mut SessionState) -> Option<EpochReport> {
        if !state.running() || !self.boundary_crossed(state) {
            return None;
        }
        let epoch = state.epoch() + 1;
        let scores = state.epoch_scores();
        let average_score = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        };
        let report = EpochReport {
            epoch,
            timestep: state.timestep(),
            episodes: scores.len(),
            average_score,
        };
        state.advance_epoch(epoch);
        self.logger.log(&report);
        Some(report)
    }

    /// Access the logger, e.g. to emit the final summary.
    pub fn logger_mut(&mut self) -> &mut dyn MetricsLogger {
        self.logger.as_mut()
    }
}
