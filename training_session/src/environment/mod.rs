//! Environment abstraction for the training session.
//!
//! Concrete simulators live outside this crate. They implement
//! [`Environment`], are constructed by an [`EnvironmentFactory`] and may be
//! decorated by an ordered stack of [`Preprocessor`]s before the session
//! registers them.

pub mod context;
pub mod pipeline;
pub mod registry;
pub mod wrappers;

pub use context::{EnvironmentContext, EnvironmentFactory, VideoSchedule};
pub use pipeline::{Pipeline, PipelineBuilder, Preprocessor};
pub use registry::{EnvHandle, EnvironmentRegistry, ManagedEnvironment};
pub use wrappers::{action_repeat, clip_reward, time_limit, ActionRepeat, ClipReward, TimeLimit};

use crate::core::StepOutcome;

/// A single, steppable environment.
///
/// The end of an episode is reported through [`StepOutcome::state`]. An `Err`
/// from any method is a genuine fault and aborts the running episode.
pub trait Environment: Send {
    /// Observation type.
    type State;
    /// Action type.
    type Action;

    /// Start a new episode and return the initial observation.
    fn reset(&mut self) -> anyhow::Result<Self::State>;

    /// Advance the environment by one action.
    fn step(&mut self, action: &Self::Action) -> anyhow::Result<StepOutcome<Self::State>>;

    /// Release simulator resources. Called once, at session shutdown.
    fn close(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Type-erased environment, the unit preprocessors wrap.
pub type BoxedEnvironment<S, A> = Box<dyn Environment<State = S, Action = A>>;

impl<E: Environment + ?Sized> Environment for Box<E> {
    type State = E::State;
    type Action = E::Action;

    fn reset(&mut self) -> anyhow::Result<Self::State> {
        (**self).reset()
    }

    fn step(&mut self, action: &Self::Action) -> anyhow::Result<StepOutcome<Self::State>> {
        (**self).step(action)
    }

    fn close(&mut self) -> anyhow::Result<()> {
        (**self).close()
    }
}
