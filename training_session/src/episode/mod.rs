//! Episode execution and its results.

pub mod runner;

pub use runner::{EpisodeFault, EpisodeRunner, EpisodeSummary, ExperienceRecorder};

use std::path::PathBuf;

/// Bookkeeping for one finished episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeRecord {
    /// Episode id allocated under the session lock.
    pub episode: u64,
    /// Sum of rewards.
    pub score: f64,
    /// Completed interaction steps.
    pub steps: u64,
    /// Whether the episode was flagged for video recording.
    pub video: bool,
    /// Persisted experience file, if recorded.
    pub experience_path: Option<PathBuf>,
}

/// Result of asking the coordinator to run an episode.
#[derive(Debug, Clone, PartialEq)]
pub enum EpisodeOutcome {
    /// The episode ran and its score was appended to the session history.
    Completed(EpisodeRecord),
    /// The episode ran, but the session stopped before it finished; its
    /// steps were committed, its score was not recorded.
    Discarded(EpisodeRecord),
    /// The session is no longer running; neither agent nor environment was
    /// touched.
    StopTraining,
}

impl EpisodeOutcome {
    /// Whether the caller should stop requesting episodes.
    pub fn should_stop(&self) -> bool {
        !matches!(self, Self::Completed(_))
    }

    pub fn record(&self) -> Option<&EpisodeRecord> {
        match self {
            Self::Completed(record) | Self::Discarded(record) => Some(record),
            Self::StopTraining => None,
        }
    }
}
