//! Generic environment decorators usable as preprocessors.
//!
//! Every wrapper owns the environment it decorates and forwards `close()`,
//! so closing the outermost instance closes the whole stack.

use super::pipeline::Preprocessor;
use super::{BoxedEnvironment, Environment};
use crate::core::StepOutcome;

/// Truncates episodes after a fixed number of steps.
pub struct TimeLimit<S, A> {
    inner: BoxedEnvironment<S, A>,
    max_steps: usize,
    elapsed: usize,
}

impl<S, A> TimeLimit<S, A> {
    pub fn new(inner: BoxedEnvironment<S, A>, max_steps: usize) -> Self {
        Self {
            inner,
            max_steps,
            elapsed: 0,
        }
    }
}

impl<S, A> Environment for TimeLimit<S, A> {
    type State = S;
    type Action = A;

    fn reset(&mut self) -> anyhow::Result<S> {
        self.elapsed = 0;
        self.inner.reset()
    }

    fn step(&mut self, action: &A) -> anyhow::Result<StepOutcome<S>> {
        let mut outcome = self.inner.step(action)?;
        self.elapsed += 1;
        outcome.state = outcome.state.or_truncated(self.elapsed >= self.max_steps);
        Ok(outcome)
    }

    fn close(&mut self) -> anyhow::Result<()> {
        self.inner.close()
    }
}

/// Repeats every action `repeat` times and sums the rewards.
///
/// Stops repeating as soon as the inner episode ends.
pub struct ActionRepeat<S, A> {
    inner: BoxedEnvironment<S, A>,
    repeat: usize,
}

impl<S, A> ActionRepeat<S, A> {
    pub fn new(inner: BoxedEnvironment<S, A>, repeat: usize) -> Self {
        Self {
            inner,
            repeat: repeat.max(1),
        }
    }
}

impl<S, A> Environment for ActionRepeat<S, A> {
    type State = S;
    type Action = A;

    fn reset(&mut self) -> anyhow::Result<S> {
        self.inner.reset()
    }

    fn step(&mut self, action: &A) -> anyhow::Result<StepOutcome<S>> {
        let mut outcome = self.inner.step(action)?;
        for _ in 1..self.repeat {
            if outcome.done() {
                break;
            }
            let next = self.inner.step(action)?;
            outcome = StepOutcome {
                reward: outcome.reward + next.reward,
                ..next
            };
        }
        Ok(outcome)
    }

    fn close(&mut self) -> anyhow::Result<()> {
        self.inner.close()
    }
}

/// Clamps rewards into `[min, max]`.
pub struct ClipReward<S, A> {
    inner: BoxedEnvironment<S, A>,
    min: f64,
    max: f64,
}

impl<S, A> ClipReward<S, A> {
    pub fn new(inner: BoxedEnvironment<S, A>, min: f64, max: f64) -> Self {
        Self { inner, min, max }
    }
}

impl<S, A> Environment for ClipReward<S, A> {
    type State = S;
    type Action = A;

    fn reset(&mut self) -> anyhow::Result<S> {
        self.inner.reset()
    }

    fn step(&mut self, action: &A) -> anyhow::Result<StepOutcome<S>> {
        let mut outcome = self.inner.step(action)?;
        outcome.reward = outcome.reward.clamp(self.min, self.max);
        Ok(outcome)
    }

    fn close(&mut self) -> anyhow::Result<()> {
        self.inner.close()
    }
}

/// Preprocessor wrapping environments in a [`TimeLimit`].
pub fn time_limit<S: 'static, A: 'static>(max_steps: usize) -> impl Preprocessor<S, A> {
    move |env: BoxedEnvironment<S, A>| -> anyhow::Result<BoxedEnvironment<S, A>> {
        let wrapped: BoxedEnvironment<S, A> = Box::new(TimeLimit::new(env, max_steps));
        Ok(wrapped)
    }
}

/// Preprocessor wrapping environments in an [`ActionRepeat`].
pub fn action_repeat<S: 'static, A: 'static>(repeat: usize) -> impl Preprocessor<S, A> {
    move |env: BoxedEnvironment<S, A>| -> anyhow::Result<BoxedEnvironment<S, A>> {
        let wrapped: BoxedEnvironment<S, A> = Box::new(ActionRepeat::new(env, repeat));
        Ok(wrapped)
    }
}

/// Preprocessor wrapping environments in a [`ClipReward`].
///
/// Fails at build time if `min > max`.
pub fn clip_reward<S: 'static, A: 'static>(min: f64, max: f64) -> impl Preprocessor<S, A> {
    move |env: BoxedEnvironment<S, A>| -> anyhow::Result<BoxedEnvironment<S, A>> {
        anyhow::ensure!(min <= max, "clip_reward: min {} exceeds max {}", min, max);
        let wrapped: BoxedEnvironment<S, A> = Box::new(ClipReward::new(env, min, max));
        Ok(wrapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EpisodeState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts up from zero; reward equals the new position; terminal at `end`.
    struct Counter {
        position: i64,
        end: i64,
        closes: Arc<AtomicUsize>,
    }

    impl Counter {
        fn boxed(end: i64, closes: Arc<AtomicUsize>) -> BoxedEnvironment<i64, i64> {
            Box::new(Self {
                position: 0,
                end,
                closes,
            })
        }
    }

    impl Environment for Counter {
        type State = i64;
        type Action = i64;

        fn reset(&mut self) -> anyhow::Result<i64> {
            self.position = 0;
            Ok(0)
        }

        fn step(&mut self, action: &i64) -> anyhow::Result<StepOutcome<i64>> {
            self.position += action;
            let reward = self.position as f64;
            if self.position >= self.end {
                Ok(StepOutcome::terminal(self.position, reward))
            } else {
                Ok(StepOutcome::running(self.position, reward))
            }
        }

        fn close(&mut self) -> anyhow::Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_time_limit_truncates() {
        let mut env = TimeLimit::new(Counter::boxed(100, Arc::default()), 3);
        env.reset().unwrap();
        assert_eq!(env.step(&1).unwrap().state, EpisodeState::Running);
        assert_eq!(env.step(&1).unwrap().state, EpisodeState::Running);
        assert_eq!(env.step(&1).unwrap().state, EpisodeState::Truncated);

        // Reset restarts the budget
        env.reset().unwrap();
        assert_eq!(env.step(&1).unwrap().state, EpisodeState::Running);
    }

    #[test]
    fn test_time_limit_keeps_terminal() {
        let mut env = TimeLimit::new(Counter::boxed(2, Arc::default()), 2);
        env.reset().unwrap();
        env.step(&1).unwrap();
        assert_eq!(env.step(&1).unwrap().state, EpisodeState::Terminal);
    }

    #[test]
    fn test_action_repeat_sums_rewards() {
        let mut env = ActionRepeat::new(Counter::boxed(100, Arc::default()), 3);
        env.reset().unwrap();
        let outcome = env.step(&1).unwrap();
        // positions 1, 2, 3
        assert_eq!(outcome.next_state, 3);
        assert_eq!(outcome.reward, 6.0);
    }

    #[test]
    fn test_action_repeat_stops_at_episode_end() {
        let mut env = ActionRepeat::new(Counter::boxed(2, Arc::default()), 4);
        env.reset().unwrap();
        let outcome = env.step(&1).unwrap();
        assert_eq!(outcome.next_state, 2);
        assert_eq!(outcome.reward, 3.0);
        assert!(outcome.state.is_terminal());
    }

    #[test]
    fn test_clip_reward() {
        let mut env = ClipReward::new(Counter::boxed(100, Arc::default()), -1.0, 1.0);
        env.reset().unwrap();
        assert_eq!(env.step(&5).unwrap().reward, 1.0);
        assert_eq!(env.step(&-20).unwrap().reward, -1.0);
    }

    #[test]
    fn test_close_reaches_base_through_stack() {
        let closes = Arc::new(AtomicUsize::new(0));
        let env = Counter::boxed(10, Arc::clone(&closes));
        let env = time_limit::<i64, i64>(5).wrap(env).unwrap();
        let env = action_repeat::<i64, i64>(2).wrap(env).unwrap();
        let mut env = clip_reward::<i64, i64>(-1.0, 1.0).wrap(env).unwrap();

        env.close().unwrap();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clip_reward_rejects_inverted_bounds() {
        let result = clip_reward::<i64, i64>(1.0, -1.0).wrap(Counter::boxed(10, Arc::default()));
        assert!(result.is_err());
    }
}
