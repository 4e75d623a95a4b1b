//! Exactly-once session shutdown.
//!
//! Shutdown happens in two phases. [`ShutdownCoordinator::check`] (or
//! [`ShutdownCoordinator::begin`] for an explicit stop) runs under the session
//! lock: it flips the running flag and snapshots the registry. Only the call
//! that flipped the flag gets a [`ShutdownPlan`]. The plan is then executed
//! outside the session lock, taking each environment lock in turn, so an
//! episode still running on an instance finishes before that instance closes.

use crate::core::SessionState;
use crate::environment::{EnvHandle, EnvironmentRegistry};

/// Decides when the step budget is exhausted.
#[derive(Debug, Clone, Copy)]
pub struct ShutdownCoordinator {
    total_timesteps: u64,
}

impl ShutdownCoordinator {
    pub fn new(total_timesteps: u64) -> Self {
        Self { total_timesteps }
    }

    pub fn total_timesteps(&self) -> u64 {
        self.total_timesteps
    }

    /// Whether the committed timesteps reached the budget.
    pub fn budget_exhausted(&self, state: &SessionState) -> bool {
        state.timestep() >= self.total_timesteps
    }

    /// Start shutdown if the budget is exhausted. Call under the session lock.
    pub fn check<S, A>(
        &self,
        state: &mut SessionState,
        registry: &EnvironmentRegistry<S, A>,
    ) -> Option<ShutdownPlan<S, A>> {
        if !self.budget_exhausted(state) {
            return None;
        }
        Self::begin(state, registry)
    }

    /// Start shutdown unconditionally. Call under the session lock.
    ///
    /// Returns `None` if the session was already stopped.
    pub fn begin<S, A>(
        state: &mut SessionState,
        registry: &EnvironmentRegistry<S, A>,
    ) -> Option<ShutdownPlan<S, A>> {
        if !state.stop() {
            return None;
        }
        tracing::info!(
            timestep = state.timestep(),
            episodes = state.scores().len(),
            environments = registry.len(),
            "stopping training"
        );
        Some(ShutdownPlan {
            environments: registry.snapshot(),
        })
    }
}

/// Environments to close, owned by the thread that stopped the session.
pub struct ShutdownPlan<S, A> {
    environments: Vec<EnvHandle<S, A>>,
}

/// What closing the registry produced.
#[derive(Debug, Default)]
pub struct CloseReport {
    /// Instances closed by this plan.
    pub closed: usize,
    /// Instance ids whose `close` failed, with the error.
    pub errors: Vec<(usize, anyhow::Error)>,
}

impl<S, A> ShutdownPlan<S, A> {
    pub fn len(&self) -> usize {
        self.environments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.environments.is_empty()
    }

    /// Close every instance under its own lock.
    ///
    /// A failing instance does not stop the others from being closed.
    pub fn close_all(self) -> CloseReport {
        let mut report = CloseReport::default();
        for env in &self.environments {
            match env.close() {
                Ok(true) => report.closed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(instance = env.id(), error = %e, "failed to close environment");
                    report.errors.push((env.id(), e));
                }
            }
        }
        tracing::debug!(closed = report.closed, failed = report.errors.len(), "environments closed");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StepOutcome;
    use crate::environment::{BoxedEnvironment, Environment};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Noop {
        closes: Arc<AtomicUsize>,
        fail: bool,
    }

    impl Environment for Noop {
        type State = ();
        type Action = ();

        fn reset(&mut self) -> anyhow::Result<()> {
            Ok(())
        }

        fn step(&mut self, _: &()) -> anyhow::Result<StepOutcome<()>> {
            Ok(StepOutcome::terminal((), 0.0))
        }

        fn close(&mut self) -> anyhow::Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            anyhow::ensure!(!self.fail, "device busy");
            Ok(())
        }
    }

    fn registry(fails: &[bool], closes: &Arc<AtomicUsize>) -> EnvironmentRegistry<(), ()> {
        let mut registry = EnvironmentRegistry::new();
        for (id, &fail) in fails.iter().enumerate() {
            let env: BoxedEnvironment<(), ()> = Box::new(Noop {
                closes: Arc::clone(closes),
                fail,
            });
            registry.register(id, env, Arc::default());
        }
        registry
    }

    #[test]
    fn test_check_waits_for_budget() {
        let closes = Arc::new(AtomicUsize::new(0));
        let registry = registry(&[false], &closes);
        let coordinator = ShutdownCoordinator::new(100);
        let mut state = SessionState::new();

        state.complete_episode(1.0, 99);
        assert!(coordinator.check(&mut state, &registry).is_none());
        assert!(state.running());

        state.complete_episode(1.0, 1);
        let plan = coordinator.check(&mut state, &registry).unwrap();
        assert_eq!(plan.len(), 1);
        assert!(!state.running());
    }

    #[test]
    fn test_only_first_trigger_gets_a_plan() {
        let closes = Arc::new(AtomicUsize::new(0));
        let registry = registry(&[false, false], &closes);
        let coordinator = ShutdownCoordinator::new(10);
        let mut state = SessionState::new();
        state.complete_episode(0.0, 20);

        assert!(coordinator.check(&mut state, &registry).is_some());
        assert!(coordinator.check(&mut state, &registry).is_none());
        assert!(ShutdownCoordinator::begin(&mut state, &registry).is_none());
    }

    #[test]
    fn test_close_all_continues_after_failure() {
        let closes = Arc::new(AtomicUsize::new(0));
        let registry = registry(&[false, true, false], &closes);
        let mut state = SessionState::new();

        let report = ShutdownCoordinator::begin(&mut state, &registry)
            .unwrap()
            .close_all();

        assert_eq!(report.closed, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].0, 1);
        assert_eq!(closes.load(Ordering::SeqCst), 3);
        assert!(registry.snapshot().iter().all(|env| env.is_closed()));
    }
}
