//! Shared counters and flags of a training session.
//!
//! `SessionState` has no interior synchronization. The coordinator keeps it
//! behind the session lock and every method here assumes the caller holds
//! that lock, which is what makes each method an atomic step.

/// Counters and flags shared by all worker threads.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Next episode id to hand out
    episode: u64,
    /// Steps committed by completed and aborted episodes
    timestep: u64,
    /// Last reported epoch
    epoch: u64,
    /// False once shutdown has been triggered
    running: bool,
    /// Episode scores in completion order
    scores: Vec<f64>,
    /// Index into `scores` where the current epoch began
    epoch_start: usize,
}

impl SessionState {
    /// Create a fresh, running session.
    pub fn new() -> Self {
        Self {
            episode: 0,
            timestep: 0,
            epoch: 0,
            running: true,
            scores: Vec::new(),
            epoch_start: 0,
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    /// Number of episode ids handed out so far.
    pub fn episode(&self) -> u64 {
        self.episode
    }

    pub fn timestep(&self) -> u64 {
        self.timestep
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// Allocate the next episode id, or `None` once the session stopped.
    pub fn allocate_episode(&mut self) -> Option<u64> {
        if !self.running {
            return None;
        }
        let id = self.episode;
        self.episode += 1;
        Some(id)
    }

    /// Commit a finished episode.
    ///
    /// Steps are always added to the timestep counter. The score is appended
    /// only while the session is running; returns whether it was appended.
    pub fn complete_episode(&mut self, score: f64, steps: u64) -> bool {
        self.commit_steps(steps);
        if self.running {
            self.scores.push(score);
            true
        } else {
            false
        }
    }

    /// Charge steps to the timestep counter without recording a score.
    ///
    /// Used for episodes aborted by a fault.
    pub fn commit_steps(&mut self, steps: u64) {
        self.timestep += steps;
    }

    /// Scores completed since the last epoch boundary.
    pub fn epoch_scores(&self) -> &[f64] {
        &self.scores[self.epoch_start..]
    }

    /// Move to `epoch` and start a new averaging window.
    pub fn advance_epoch(&mut self, epoch: u64) {
        self.epoch = epoch;
        self.epoch_start = self.scores.len();
    }

    /// Flip the running flag. Returns `true` only for the call that flipped it.
    pub fn stop(&mut self) -> bool {
        std::mem::replace(&mut self.running, false)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
