//! # Training Session: Parallel Episode Coordination
//!
//! Runs many agent/environment episode loops in parallel against one global
//! step budget, reports progress per epoch, optionally records transition
//! traces, and shuts down exactly once, closing every environment it built.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           Trainer                                    │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  Worker 1          Worker 2          Worker N                       │
//! │  ┌────────┐        ┌────────┐        ┌────────┐                    │
//! │  │ Agent  │        │ Agent  │        │ Agent  │                    │
//! │  │ Env 0  │        │ Env 1  │        │ Env N  │  ◄── env lock      │
//! │  └───┬────┘        └───┬────┘        └───┬────┘      per instance  │
//! │      │ run_episode     │                 │                          │
//! │      └─────────────────┼─────────────────┘                          │
//! │                        ▼                                            │
//! │              ┌─────────────────┐      ┌──────────────┐             │
//! │              │  SessionState   │      │ EpochReporter│             │
//! │              │ ids, timesteps, │─────►│ MetricsLogger│             │
//! │              │ scores, running │      └──────────────┘             │
//! │              └────────┬────────┘        session lock               │
//! │                       ▼                                             │
//! │              ┌─────────────────┐      ┌──────────────┐             │
//! │              │ShutdownCoordin. │─────►│ ResultsStore │             │
//! │              │ close registry  │      │ scores.json  │             │
//! │              └─────────────────┘      └──────────────┘             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use training_session::{time_limit, Trainer, TrainerConfig};
//!
//! let config = TrainerConfig::new("chain", 100_000)
//!     .with_directory("runs/chain")
//!     .with_video_period(50);
//!
//! let trainer = Trainer::new(config, make_env)?;
//! trainer.add_preprocessor("time_limit", time_limit(500))?;
//!
//! let env = trainer.build_environment()?;
//! while !trainer.run_episode(&mut agent, &env)?.should_stop() {}
//! ```

pub mod agent;
pub mod config;
pub mod coordinator;
pub mod core;
pub mod environment;
pub mod episode;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod persistence;

pub use agent::Agent;
pub use config::TrainerConfig;
pub use coordinator::{CloseReport, ShutdownCoordinator, ShutdownPlan, Trainer};
pub use core::{EpisodeState, ExperienceBuffer, SessionState, StepOutcome, Transition};
pub use error::{PersistenceError, Result, SessionError};
pub use logging::init_logging;
pub use persistence::ResultsStore;

// Environments and preprocessing
pub use environment::{
    action_repeat, clip_reward, time_limit, BoxedEnvironment, EnvHandle, Environment,
    EnvironmentContext, EnvironmentFactory, EnvironmentRegistry, PipelineBuilder, Preprocessor,
    VideoSchedule,
};

// Episodes
pub use episode::{EpisodeFault, EpisodeOutcome, EpisodeRecord, EpisodeRunner, ExperienceRecorder};

// Metrics
pub use metrics::{
    ConsoleLogger, CsvLogger, EpochReport, EpochReporter, MetricsLogger, MultiLogger,
    RecordingLogger, TracingLogger, TrainingMetrics, TrainingSummary,
};
