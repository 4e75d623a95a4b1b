//! The session front door shared by all worker threads.
//!
//! # Locking
//!
//! Exactly two lock classes exist:
//!
//! - the **session lock** guards [`SessionState`], the preprocessing pipeline,
//!   the environment registry and the epoch reporter;
//! - each **environment lock** guards one registered instance.
//!
//! `run_episode` takes the session lock to check the running flag and
//! allocate an episode id, releases it, holds the environment lock for the
//! whole episode, releases it, and takes the session lock again to commit the
//! score and evaluate the epoch and stop thresholds in one critical section.
//! No thread ever waits for an environment lock while holding the session
//! lock, so the two classes cannot deadlock.
//!
//! Scores are appended in completion order, which differs from episode-id
//! order whenever a later episode finishes first. An episode aborted by a
//! fault still charges the steps it took to the budget.

use super::shutdown::{ShutdownCoordinator, ShutdownPlan};
use crate::agent::Agent;
use crate::config::TrainerConfig;
use crate::core::SessionState;
use crate::environment::{
    EnvHandle, Environment, EnvironmentContext, EnvironmentFactory, EnvironmentRegistry,
    PipelineBuilder, Preprocessor,
};
use crate::episode::{EpisodeOutcome, EpisodeRecord, EpisodeRunner, ExperienceRecorder};
use crate::error::{Result, SessionError};
use crate::metrics::{
    training_metrics, EpochReporter, MetricsLogger, SharedTrainingMetrics, TracingLogger,
    TrainingSummary,
};
use crate::persistence::ResultsStore;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Everything guarded by the session lock.
struct Session<S, A> {
    state: SessionState,
    pipeline: PipelineBuilder<S, A>,
    registry: EnvironmentRegistry<S, A>,
    reporter: EpochReporter,
    next_instance: usize,
    summary: Option<TrainingSummary>,
    close_failures: Vec<usize>,
}

/// Coordinates parallel episode loops over a shared step budget.
///
/// The trainer does not spawn threads. Callers share it (by reference or
/// `Arc`) between their own worker threads; each worker builds one
/// environment and calls [`run_episode`](Self::run_episode) until the outcome
/// says to stop.
pub struct Trainer<S, A> {
    config: TrainerConfig,
    session: Mutex<Session<S, A>>,
    shutdown: ShutdownCoordinator,
    metrics: SharedTrainingMetrics,
    store: Option<ResultsStore>,
}

impl<S, A> Trainer<S, A>
where
    S: Clone + Serialize + 'static,
    A: Serialize + 'static,
{
    /// Create a trainer reporting epochs through `tracing`.
    pub fn new(config: TrainerConfig, factory: impl EnvironmentFactory<S, A> + 'static) -> Result<Self> {
        Self::with_logger(config, factory, Box::new(TracingLogger))
    }

    /// Create a trainer with a custom epoch logger.
    ///
    /// Creates the results directory when one is configured.
    pub fn with_logger(
        config: TrainerConfig,
        factory: impl EnvironmentFactory<S, A> + 'static,
        logger: Box<dyn MetricsLogger>,
    ) -> Result<Self> {
        config.validate()?;
        let store = config
            .directory
            .as_ref()
            .map(|dir| ResultsStore::open(dir))
            .transpose()?;

        info!(
            environment = %config.environment_name,
            total_timesteps = config.total_timesteps,
            epoch_size = config.epoch_size(),
            directory = ?config.directory,
            "training session created"
        );

        let session = Session {
            state: SessionState::new(),
            pipeline: PipelineBuilder::new(factory),
            registry: EnvironmentRegistry::new(),
            reporter: EpochReporter::new(config.epoch_size(), logger),
            next_instance: 0,
            summary: None,
            close_failures: Vec::new(),
        };

        Ok(Self {
            shutdown: ShutdownCoordinator::new(config.total_timesteps),
            session: Mutex::new(session),
            metrics: training_metrics(),
            store,
            config,
        })
    }

    /// Append a preprocessor to the pipeline.
    ///
    /// Fails with [`SessionError::Configuration`] once any environment has
    /// been built.
    pub fn add_preprocessor(
        &self,
        name: impl Into<String>,
        preprocessor: impl Preprocessor<S, A> + 'static,
    ) -> Result<()> {
        self.session.lock().pipeline.add_preprocessor(name, preprocessor)
    }

    /// Build a fully preprocessed environment and register it for shutdown.
    ///
    /// Construction runs outside the session lock. Fails with
    /// [`SessionError::Stopped`] once the session has shut down.
    pub fn build_environment(&self) -> Result<EnvHandle<S, A>> {
        let (pipeline, ctx) = {
            let mut session = self.session.lock();
            if !session.state.running() {
                return Err(SessionError::Stopped);
            }
            let id = session.next_instance;
            session.next_instance += 1;
            let ctx = EnvironmentContext::new(
                self.config.environment_name.clone(),
                self.config.directory.clone(),
                id,
                self.config.video_schedule(),
            );
            (session.pipeline.seal(), ctx)
        };

        let mut env = pipeline.build(&ctx).map_err(SessionError::Environment)?;

        let mut session = self.session.lock();
        if !session.state.running() {
            drop(session);
            if let Err(e) = env.close() {
                warn!(instance = ctx.instance_id(), error = %e, "failed to close unregistered environment");
            }
            return Err(SessionError::Stopped);
        }
        let handle = session
            .registry
            .register(ctx.instance_id(), env, ctx.episode_cell());
        info!(
            instance = handle.id(),
            environment = %ctx.name(),
            preprocessors = ?pipeline.stage_names(),
            "environment created"
        );
        Ok(handle)
    }

    /// Run one episode of `agent` on `env`.
    ///
    /// Returns [`EpisodeOutcome::StopTraining`] without touching the agent or
    /// the environment once the session has stopped. Agent, environment and
    /// experience-write errors abort the episode and are returned as-is; the
    /// episode id stays consumed and no score is recorded, but the steps
    /// taken before the fault are charged to the budget.
    ///
    /// If this episode triggers shutdown and closing an environment fails,
    /// the failure is logged and the episode's own outcome is still returned.
    pub fn run_episode<G>(&self, agent: &mut G, env: &EnvHandle<S, A>) -> Result<EpisodeOutcome>
    where
        G: Agent<S, A> + ?Sized,
    {
        let allocated = self.session.lock().state.allocate_episode();
        let Some(episode) = allocated else {
            return Ok(EpisodeOutcome::StopTraining);
        };
        let video = self.config.video_schedule().should_record(episode);

        let result = {
            let mut slot = env.lock();
            let Some(inner) = slot.as_mut() else {
                debug!(episode, instance = env.id(), "environment already closed");
                return Ok(EpisodeOutcome::StopTraining);
            };
            env.begin_episode(episode);
            self.metrics.record_episode_started();
            debug!(episode, instance = env.id(), video, "episode started");

            let recorder = match &self.store {
                Some(store) if self.config.records_experience() => {
                    Some(ExperienceRecorder::new(store, self.config.experience_capacity))
                }
                _ => None,
            };
            EpisodeRunner::new(&self.metrics)
                .with_recorder(recorder)
                .run(agent, &mut **inner, episode)
        };
        let summary = match result {
            Ok(summary) => summary,
            Err(fault) => {
                self.charge_aborted(episode, fault.steps);
                return Err(fault.error);
            }
        };
        self.metrics.record_episode_completed();

        let record = EpisodeRecord {
            episode,
            score: summary.score,
            steps: summary.steps,
            video,
            experience_path: summary.experience_path,
        };

        let (counted, plan) = {
            let mut guard = self.session.lock();
            let session = &mut *guard;
            let counted = session.state.complete_episode(record.score, record.steps);
            if counted {
                session.reporter.check(&mut session.state);
            }
            let plan = self.shutdown.check(&mut session.state, &session.registry);
            (counted, plan)
        };

        if let Some(plan) = plan {
            if let Err(e) = self.finish_shutdown(plan) {
                error!(episode, error = %e, "shutdown finished with errors");
            }
        }

        if counted {
            Ok(EpisodeOutcome::Completed(record))
        } else {
            debug!(episode, "episode finished after shutdown, score discarded");
            Ok(EpisodeOutcome::Discarded(record))
        }
    }

    /// Commit the steps of an aborted episode and stop if the budget ran out.
    fn charge_aborted(&self, episode: u64, steps: u64) {
        let plan = {
            let mut guard = self.session.lock();
            let session = &mut *guard;
            session.state.commit_steps(steps);
            self.shutdown.check(&mut session.state, &session.registry)
        };
        debug!(episode, steps, "aborted episode charged to the budget");

        if let Some(plan) = plan {
            if let Err(e) = self.finish_shutdown(plan) {
                error!(episode, error = %e, "shutdown finished with errors");
            }
        }
    }

    /// Stop the session before the budget is exhausted.
    ///
    /// Returns `Ok(false)` if the session had already stopped. Unlike a
    /// budget-triggered stop, close and persistence failures are returned.
    pub fn shutdown(&self) -> Result<bool> {
        let plan = {
            let mut guard = self.session.lock();
            let session = &mut *guard;
            ShutdownCoordinator::begin(&mut session.state, &session.registry)
        };
        match plan {
            Some(plan) => {
                self.finish_shutdown(plan)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Close every environment, then persist the score history.
    fn finish_shutdown(&self, plan: ShutdownPlan<S, A>) -> Result<()> {
        let report = plan.close_all();

        let (scores, summary) = {
            let mut session = self.session.lock();
            let summary = summarize(&session.state);
            let logger = session.reporter.logger_mut();
            logger.log_summary(&summary);
            logger.flush();
            session.summary = Some(summary.clone());
            session.close_failures = report.errors.iter().map(|(id, _)| *id).collect();
            (session.state.scores().to_vec(), summary)
        };

        if let Some(store) = &self.store {
            let path = store.write_scores(&scores)?;
            info!(path = %path.display(), episodes = summary.episodes, "scores stored");
        }

        match report.errors.into_iter().next() {
            Some((id, e)) => Err(SessionError::Environment(
                e.context(format!("failed to close environment {}", id)),
            )),
            None => Ok(()),
        }
    }
}

impl<S, A> Trainer<S, A> {
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Whether new episodes may start.
    pub fn running(&self) -> bool {
        self.session.lock().state.running()
    }

    /// Number of episode ids allocated so far.
    pub fn current_episode(&self) -> u64 {
        self.session.lock().state.episode()
    }

    /// Steps committed by completed and aborted episodes.
    pub fn current_timestep(&self) -> u64 {
        self.session.lock().state.timestep()
    }

    pub fn current_epoch(&self) -> u64 {
        self.session.lock().state.epoch()
    }

    /// Score history in completion order.
    pub fn scores(&self) -> Vec<f64> {
        self.session.lock().state.scores().to_vec()
    }

    /// Copy of the full session state.
    pub fn snapshot(&self) -> SessionState {
        self.session.lock().state.clone()
    }

    /// Steps taken so far, including episodes still running.
    pub fn live_timestep(&self) -> u64 {
        self.metrics.env_steps()
    }

    pub fn metrics(&self) -> &SharedTrainingMetrics {
        &self.metrics
    }

    /// Registered environment instances.
    pub fn environment_count(&self) -> usize {
        self.session.lock().registry.len()
    }

    /// Preprocessor names, innermost first.
    pub fn preprocessors(&self) -> Vec<String> {
        self.session
            .lock()
            .pipeline
            .stage_names()
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// Final numbers, available once the session has shut down.
    pub fn summary(&self) -> Option<TrainingSummary> {
        self.session.lock().summary.clone()
    }

    /// Instance ids whose `close` failed during shutdown.
    pub fn close_failures(&self) -> Vec<usize> {
        self.session.lock().close_failures.clone()
    }

    /// Results directory, `None` for dry runs.
    pub fn store(&self) -> Option<&ResultsStore> {
        self.store.as_ref()
    }
}

fn summarize(state: &SessionState) -> TrainingSummary {
    let scores = state.scores();
    let mean_score = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };
    TrainingSummary {
        episodes: scores.len(),
        timesteps: state.timestep(),
        epochs: state.epoch(),
        mean_score,
    }
}
