//! Learning agent interface consumed by the episode runner.

use crate::core::Transition;

/// An agent driven through episodes by the coordinator.
///
/// The call order per episode is `start`, then `step`/`observe` once per
/// environment step, then `stop` after the environment reports the end of
/// the episode. An error from any method aborts the episode; `stop` is not
/// called in that case.
pub trait Agent<S, A> {
    /// Called before the environment is reset.
    fn start(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Select an action for `state`.
    fn step(&mut self, state: &S) -> anyhow::Result<A>;

    /// Receive the transition produced by the last action.
    fn observe(&mut self, _transition: &Transition<S, A>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once the episode has ended.
    fn stop(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}
