//! Lock-free live counters for a training session.
//!
//! These complement the session state: they are updated without the session
//! lock (the episode runner bumps `env_steps` on every step) and so may run
//! ahead of the committed counters while episodes are in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Thread-safe live training counters.
#[derive(Debug, Default)]
pub struct TrainingMetrics {
    /// Environment steps taken, including those of unfinished episodes
    env_steps: AtomicU64,
    /// Episodes that passed the running check
    episodes_started: AtomicU64,
    /// Episodes that reached the end-of-episode status
    episodes_completed: AtomicU64,
}

impl TrainingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one environment step.
    pub fn add_env_step(&self) {
        self.env_steps.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_episode_started(&self) {
        self.episodes_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_episode_completed(&self) {
        self.episodes_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn env_steps(&self) -> u64 {
        self.env_steps.load(Ordering::Relaxed)
    }

    pub fn episodes_started(&self) -> u64 {
        self.episodes_started.load(Ordering::Relaxed)
    }

    pub fn episodes_completed(&self) -> u64 {
        self.episodes_completed.load(Ordering::Relaxed)
    }

    /// Episodes currently running or aborted by an error.
    pub fn episodes_in_flight(&self) -> u64 {
        self.episodes_started()
            .saturating_sub(self.episodes_completed())
    }
}

/// Shared training metrics.
pub type SharedTrainingMetrics = Arc<TrainingMetrics>;

/// Create new shared training metrics.
pub fn training_metrics() -> SharedTrainingMetrics {
    Arc::new(TrainingMetrics::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_training_metrics_new() {
        let metrics = TrainingMetrics::new();
        assert_eq!(metrics.env_steps(), 0);
        assert_eq!(metrics.episodes_started(), 0);
        assert_eq!(metrics.episodes_completed(), 0);
    }

    #[test]
    fn test_episodes_in_flight() {
        let metrics = TrainingMetrics::new();
        metrics.record_episode_started();
        metrics.record_episode_started();
        metrics.record_episode_completed();
        assert_eq!(metrics.episodes_in_flight(), 1);
    }

    #[test]
    fn test_concurrent_steps() {
        let metrics = training_metrics();
        thread::scope(|s| {
            for _ in 0..4 {
                let metrics = Arc::clone(&metrics);
                s.spawn(move || {
                    for _ in 0..1000 {
                        metrics.add_env_step();
                    }
                });
            }
        });
        assert_eq!(metrics.env_steps(), 4000);
    }
}
