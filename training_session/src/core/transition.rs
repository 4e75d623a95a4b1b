//! Transition and step types shared by environments, agents and recorders.

use super::episode_state::EpisodeState;
use serde::{Deserialize, Serialize};

/// One interaction record: `(state, action, reward, next_state)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition<S, A> {
    /// State the action was selected in
    pub state: S,
    /// Action taken
    pub action: A,
    /// Reward received
    pub reward: f64,
    /// Successor state
    pub next_state: S,
}

impl<S, A> Transition<S, A> {
    /// Create a new transition.
    pub fn new(state: S, action: A, reward: f64, next_state: S) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
        }
    }
}

/// Result of a single environment step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome<S> {
    /// Observation after the step
    pub next_state: S,
    /// Reward for the step
    pub reward: f64,
    /// Whether the episode continues
    pub state: EpisodeState,
}

impl<S> StepOutcome<S> {
    /// A step that keeps the episode running.
    pub fn running(next_state: S, reward: f64) -> Self {
        Self {
            next_state,
            reward,
            state: EpisodeState::Running,
        }
    }

    /// A step that ends the episode in an absorbing state.
    pub fn terminal(next_state: S, reward: f64) -> Self {
        Self {
            next_state,
            reward,
            state: EpisodeState::Terminal,
        }
    }

    /// A step that ends the episode because of an external limit.
    pub fn truncated(next_state: S, reward: f64) -> Self {
        Self {
            next_state,
            reward,
            state: EpisodeState::Truncated,
        }
    }

    /// Check if the episode ended with this step.
    pub fn done(&self) -> bool {
        self.state.is_done()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_outcome_constructors() {
        assert!(!StepOutcome::running(1, 0.5).done());
        assert!(StepOutcome::terminal(1, 0.5).done());

        let truncated = StepOutcome::truncated(vec![1.0f32], -1.0);
        assert!(truncated.done());
        assert!(truncated.state.is_truncated());
        assert_eq!(truncated.reward, -1.0);
    }

    #[test]
    fn test_transition_serializes_as_named_fields() {
        let t = Transition::new(vec![0.0f32, 1.0], 2u32, 1.5, vec![1.0f32, 2.0]);
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["action"], 2);
        assert_eq!(json["reward"], 1.5);
        assert_eq!(json["next_state"][1], 2.0);
    }
}
