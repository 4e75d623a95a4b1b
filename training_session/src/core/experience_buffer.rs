//! Fixed-capacity per-episode transition log.
//!
//! One buffer lives for exactly one episode. It is allocated up front with
//! `capacity` slots and never grows: once full, further transitions are
//! dropped and counted. The episode runner persists the buffer when the
//! episode ends and then drops it.

use super::transition::Transition;
use serde::Serialize;

/// Bounded, append-only log of the transitions of one episode.
#[derive(Debug, Clone, Serialize)]
pub struct ExperienceBuffer<S, A> {
    /// Episode the transitions belong to
    episode: u64,
    /// Maximum number of stored transitions
    capacity: usize,
    /// Transitions rejected after the buffer filled up
    dropped: usize,
    transitions: Vec<Transition<S, A>>,
}

impl<S, A> ExperienceBuffer<S, A> {
    /// Allocate a buffer for `episode` holding at most `capacity` transitions.
    pub fn new(episode: u64, capacity: usize) -> Self {
        Self {
            episode,
            capacity,
            dropped: 0,
            transitions: Vec::with_capacity(capacity),
        }
    }

    /// Append a transition.
    ///
    /// Returns `false` when the buffer is full; the transition is discarded.
    pub fn push(&mut self, transition: Transition<S, A>) -> bool {
        if self.is_full() {
            if self.dropped == 0 {
                tracing::debug!(
                    episode = self.episode,
                    capacity = self.capacity,
                    "experience buffer full, dropping further transitions"
                );
            }
            self.dropped += 1;
            return false;
        }
        self.transitions.push(transition);
        true
    }

    pub fn episode(&self) -> u64 {
        self.episode
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.transitions.len() >= self.capacity
    }

    /// Number of transitions rejected because the buffer was full.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Stored transitions in insertion order.
    pub fn transitions(&self) -> &[Transition<S, A>] {
        &self.transitions
    }
}
