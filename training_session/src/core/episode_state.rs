//! Type-safe end-of-episode status.
//!
//! Environments report the end of an episode as a value returned from
//! `step`, never as an error. The episode loop inspects this status to decide
//! whether to keep stepping.
//!
//! # Key Distinction
//!
//! - **Terminal**: Episode truly ended (agent died, goal reached, absorbing state)
//! - **Truncated**: Episode hit an external limit (time limit, step limit)
//!
//! Both stop the episode loop. The distinction is kept so preprocessors such
//! as [`TimeLimit`](crate::environment::TimeLimit) can mark their own cut-offs
//! without hiding a genuine terminal state.

/// Episode status attached to every environment step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EpisodeState {
    /// Episode is ongoing.
    #[default]
    Running,
    /// Episode ended in an absorbing state.
    Terminal,
    /// Episode was cut off by an external limit.
    Truncated,
}

impl EpisodeState {
    /// Create episode state from terminal and truncated flags.
    ///
    /// If both are true, Terminal takes precedence.
    #[inline]
    pub fn from_flags(terminal: bool, truncated: bool) -> Self {
        if terminal {
            Self::Terminal
        } else if truncated {
            Self::Truncated
        } else {
            Self::Running
        }
    }

    /// Whether the episode is done (either terminal or truncated).
    #[inline]
    pub fn is_done(&self) -> bool {
        !matches!(self, Self::Running)
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal)
    }

    #[inline]
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Truncated)
    }

    /// Combine the status of an inner step with a decorator's own cut-off.
    ///
    /// A terminal inner state is never downgraded to truncated.
    #[inline]
    pub fn or_truncated(self, truncated: bool) -> Self {
        match self {
            Self::Running if truncated => Self::Truncated,
            other => other,
        }
    }
}
