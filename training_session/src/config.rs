//! Trainer configuration.

use crate::environment::VideoSchedule;
use crate::error::{Result, SessionError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration of a training session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Where to store results; `None` is a dry run with no persistence
    pub directory: Option<PathBuf>,
    /// Identifier passed to the base environment factory
    pub environment_name: String,
    /// Overall training budget in timesteps
    pub total_timesteps: u64,
    /// Timesteps per epoch; defaults to `total_timesteps / 100`
    pub epoch_size: Option<u64>,
    /// Record a video every this many episodes; 0 disables
    pub video_period: u64,
    /// Persist transitions of every episode
    pub record_experience: bool,
    /// Maximum transitions stored per episode
    pub experience_capacity: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            directory: None,
            environment_name: String::new(),
            total_timesteps: 1_000_000,
            epoch_size: None,
            video_period: 0,
            record_experience: false,
            experience_capacity: 50_000,
        }
    }
}

impl TrainerConfig {
    /// Create a dry-run config for `environment_name` with a step budget.
    pub fn new(environment_name: impl Into<String>, total_timesteps: u64) -> Self {
        Self {
            environment_name: environment_name.into(),
            total_timesteps,
            ..Default::default()
        }
    }

    /// Set the results directory.
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Set the epoch size in timesteps.
    pub fn with_epoch_size(mut self, epoch_size: u64) -> Self {
        self.epoch_size = Some(epoch_size);
        self
    }

    /// Set the video period.
    pub fn with_video_period(mut self, period: u64) -> Self {
        self.video_period = period;
        self
    }

    /// Enable experience recording with the given per-episode capacity.
    pub fn with_experience(mut self, capacity: usize) -> Self {
        self.record_experience = true;
        self.experience_capacity = capacity;
        self
    }

    /// Effective epoch size, never zero.
    pub fn epoch_size(&self) -> u64 {
        self.epoch_size
            .unwrap_or(self.total_timesteps / 100)
            .max(1)
    }

    pub fn video_schedule(&self) -> VideoSchedule {
        VideoSchedule::new(self.video_period)
    }

    /// Experience is only recorded when there is somewhere to put it.
    pub fn records_experience(&self) -> bool {
        self.record_experience && self.directory.is_some()
    }

    /// Check the config for values the session cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.environment_name.is_empty() {
            return Err(SessionError::config("environment_name must not be empty"));
        }
        if self.total_timesteps == 0 {
            return Err(SessionError::config("total_timesteps must be positive"));
        }
        if self.epoch_size == Some(0) {
            return Err(SessionError::config("epoch_size must be positive"));
        }
        if self.record_experience && self.experience_capacity == 0 {
            return Err(SessionError::config(
                "experience_capacity must be positive when recording experience",
            ));
        }
        Ok(())
    }
}
