//! Drives a single episode from reset to end-of-episode status.

use crate::agent::Agent;
use crate::core::{ExperienceBuffer, Transition};
use crate::environment::Environment;
use crate::error::{Result, SessionError};
use crate::metrics::TrainingMetrics;
use crate::persistence::ResultsStore;
use serde::Serialize;
use std::path::PathBuf;

/// Where and how much experience to record per episode.
#[derive(Debug, Clone, Copy)]
pub struct ExperienceRecorder<'a> {
    store: &'a ResultsStore,
    capacity: usize,
}

impl<'a> ExperienceRecorder<'a> {
    pub fn new(store: &'a ResultsStore, capacity: usize) -> Self {
        Self { store, capacity }
    }
}

/// What one episode produced.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    /// Sum of rewards.
    pub score: f64,
    /// Completed interaction steps.
    pub steps: u64,
    /// Persisted experience file, if recorded.
    pub experience_path: Option<PathBuf>,
}

/// An episode aborted by an agent, environment or persistence fault.
#[derive(Debug)]
pub struct EpisodeFault {
    /// Steps completed against the environment before the fault.
    pub steps: u64,
    pub error: SessionError,
}

impl From<EpisodeFault> for SessionError {
    fn from(fault: EpisodeFault) -> Self {
        fault.error
    }
}

/// Runs episodes against an agent/environment pair.
///
/// The runner holds no locks itself; the caller must hold the environment
/// lock for the duration of [`run`](Self::run).
pub struct EpisodeRunner<'a> {
    metrics: &'a TrainingMetrics,
    recorder: Option<ExperienceRecorder<'a>>,
}

impl<'a> EpisodeRunner<'a> {
    pub fn new(metrics: &'a TrainingMetrics) -> Self {
        Self {
            metrics,
            recorder: None,
        }
    }

    /// Record every transition (up to the recorder's capacity).
    pub fn with_recorder(mut self, recorder: Option<ExperienceRecorder<'a>>) -> Self {
        self.recorder = recorder;
        self
    }

    /// Run one full episode.
    ///
    /// The loop ends when the environment reports a done state. Any error
    /// from the agent or the environment aborts the episode and is returned
    /// with episode context and the number of steps already taken; nothing
    /// is retried and the agent is not stopped.
    pub fn run<S, A, G, E>(
        &self,
        agent: &mut G,
        env: &mut E,
        episode: u64,
    ) -> std::result::Result<EpisodeSummary, EpisodeFault>
    where
        S: Clone + Serialize,
        A: Serialize,
        G: Agent<S, A> + ?Sized,
        E: Environment<State = S, Action = A> + ?Sized,
    {
        let mut steps = 0u64;
        match self.play(agent, env, episode, &mut steps) {
            Ok(summary) => Ok(summary),
            Err(error) => Err(EpisodeFault { steps, error }),
        }
    }

    fn play<S, A, G, E>(
        &self,
        agent: &mut G,
        env: &mut E,
        episode: u64,
        steps: &mut u64,
    ) -> Result<EpisodeSummary>
    where
        S: Clone + Serialize,
        A: Serialize,
        G: Agent<S, A> + ?Sized,
        E: Environment<State = S, Action = A> + ?Sized,
    {
        let mut experience = self
            .recorder
            .map(|r| ExperienceBuffer::<S, A>::new(episode, r.capacity));
        let mut score = 0.0;

        agent.start().map_err(|e| agent_error(e, episode))?;
        let mut state = env.reset().map_err(|e| env_error(e, episode))?;
        loop {
            let action = agent.step(&state).map_err(|e| agent_error(e, episode))?;
            let outcome = env.step(&action).map_err(|e| env_error(e, episode))?;
            let done = outcome.done();
            let transition = Transition::new(state, action, outcome.reward, outcome.next_state);
            agent
                .observe(&transition)
                .map_err(|e| agent_error(e, episode))?;

            score += transition.reward;
            *steps += 1;
            self.metrics.add_env_step();
            state = transition.next_state.clone();
            if let Some(buffer) = experience.as_mut() {
                buffer.push(transition);
            }
            if done {
                break;
            }
        }
        agent.stop().map_err(|e| agent_error(e, episode))?;

        let experience_path = match (self.recorder, experience) {
            (Some(recorder), Some(buffer)) => Some(recorder.store.write_experience(&buffer)?),
            _ => None,
        };
        tracing::debug!(episode, score, steps = *steps, "episode finished");

        Ok(EpisodeSummary {
            score,
            steps: *steps,
            experience_path,
        })
    }
}

fn agent_error(e: anyhow::Error, episode: u64) -> SessionError {
    SessionError::Agent(e.context(format!("episode {}", episode)))
}

fn env_error(e: anyhow::Error, episode: u64) -> SessionError {
    SessionError::Environment(e.context(format!("episode {}", episode)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StepOutcome;
    use std::fs;
    use tempfile::tempdir;

    /// Fixed-length episodes paying `reward` per step.
    struct FixedLength {
        length: u64,
        reward: f64,
        position: u64,
        fail_at: Option<u64>,
    }

    impl FixedLength {
        fn new(length: u64, reward: f64) -> Self {
            Self {
                length,
                reward,
                position: 0,
                fail_at: None,
            }
        }
    }

    impl Environment for FixedLength {
        type State = u64;
        type Action = u8;

        fn reset(&mut self) -> anyhow::Result<u64> {
            self.position = 0;
            Ok(0)
        }

        fn step(&mut self, _: &u8) -> anyhow::Result<StepOutcome<u64>> {
            self.position += 1;
            if self.fail_at == Some(self.position) {
                anyhow::bail!("simulator fault");
            }
            if self.position >= self.length {
                Ok(StepOutcome::terminal(self.position, self.reward))
            } else {
                Ok(StepOutcome::running(self.position, self.reward))
            }
        }
    }

    /// Records the calls it receives.
    #[derive(Default)]
    struct Scripted {
        calls: Vec<String>,
        seen: Vec<(u64, u64)>,
    }

    impl Agent<u64, u8> for Scripted {
        fn start(&mut self) -> anyhow::Result<()> {
            self.calls.push("start".into());
            Ok(())
        }

        fn step(&mut self, _: &u64) -> anyhow::Result<u8> {
            Ok(1)
        }

        fn observe(&mut self, t: &Transition<u64, u8>) -> anyhow::Result<()> {
            self.seen.push((t.state, t.next_state));
            Ok(())
        }

        fn stop(&mut self) -> anyhow::Result<()> {
            self.calls.push("stop".into());
            Ok(())
        }
    }

    #[test]
    fn test_run_accumulates_score_and_steps() {
        let metrics = TrainingMetrics::new();
        let mut env = FixedLength::new(5, 2.0);
        let mut agent = Scripted::default();

        let summary = EpisodeRunner::new(&metrics).run(&mut agent, &mut env, 0).unwrap();

        assert_eq!(summary.steps, 5);
        assert_eq!(summary.score, 10.0);
        assert!(summary.experience_path.is_none());
        assert_eq!(metrics.env_steps(), 5);
        assert_eq!(agent.calls, vec!["start", "stop"]);
        // State chains through successor states
        assert_eq!(agent.seen, vec![(0, 1), (1, 2), (2, 3), (3, 4), (4, 5)]);
    }

    #[test]
    fn test_single_step_episode() {
        let metrics = TrainingMetrics::new();
        let mut env = FixedLength::new(1, -1.0);
        let summary = EpisodeRunner::new(&metrics)
            .run(&mut Scripted::default(), &mut env, 3)
            .unwrap();
        assert_eq!(summary.steps, 1);
        assert_eq!(summary.score, -1.0);
    }

    #[test]
    fn test_environment_fault_propagates_without_stop() {
        let metrics = TrainingMetrics::new();
        let mut env = FixedLength::new(10, 1.0);
        env.fail_at = Some(3);
        let mut agent = Scripted::default();

        let fault = EpisodeRunner::new(&metrics)
            .run(&mut agent, &mut env, 7)
            .unwrap_err();

        assert!(matches!(fault.error, SessionError::Environment(_)));
        assert!(fault.error.to_string().contains("episode 7"));
        assert_eq!(fault.steps, 2);
        assert_eq!(agent.calls, vec!["start"]);
        assert_eq!(metrics.env_steps(), 2);
    }

    #[test]
    fn test_agent_fault_propagates() {
        struct Failing;
        impl Agent<u64, u8> for Failing {
            fn step(&mut self, _: &u64) -> anyhow::Result<u8> {
                anyhow::bail!("policy diverged")
            }
        }

        let metrics = TrainingMetrics::new();
        let fault = EpisodeRunner::new(&metrics)
            .run(&mut Failing, &mut FixedLength::new(3, 1.0), 0)
            .unwrap_err();
        assert!(matches!(fault.error, SessionError::Agent(_)));
        assert_eq!(fault.steps, 0);
        assert_eq!(metrics.env_steps(), 0);
    }

    #[test]
    fn test_experience_write_failure_keeps_step_count() {
        let dir = tempdir().unwrap();
        let store = ResultsStore::open(dir.path().join("run")).unwrap();
        fs::remove_dir_all(dir.path().join("run")).unwrap();
        let metrics = TrainingMetrics::new();

        let fault = EpisodeRunner::new(&metrics)
            .with_recorder(Some(ExperienceRecorder::new(&store, 4)))
            .run(&mut Scripted::default(), &mut FixedLength::new(6, 1.0), 2)
            .unwrap_err();

        assert!(matches!(fault.error, SessionError::Persistence(_)));
        assert_eq!(fault.steps, 6);
    }

    #[test]
    fn test_recording_truncates_at_capacity() {
        let dir = tempdir().unwrap();
        let store = ResultsStore::open(dir.path()).unwrap();
        let metrics = TrainingMetrics::new();
        let mut env = FixedLength::new(8, 1.0);

        let summary = EpisodeRunner::new(&metrics)
            .with_recorder(Some(ExperienceRecorder::new(&store, 5)))
            .run(&mut Scripted::default(), &mut env, 4)
            .unwrap();

        // The score still covers every step
        assert_eq!(summary.steps, 8);
        assert_eq!(summary.score, 8.0);

        let path = summary.experience_path.unwrap();
        assert_eq!(path, store.experience_path(4));
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["transitions"].as_array().unwrap().len(), 5);
        assert_eq!(json["dropped"], 3);
    }
}
