//! Construction context handed to base environment factories.

use super::BoxedEnvironment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Decides which episodes get a video recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VideoSchedule {
    /// Record every `period`-th episode; 0 disables recording.
    pub period: u64,
}

impl VideoSchedule {
    pub fn new(period: u64) -> Self {
        Self { period }
    }

    /// Recording never happens.
    pub fn disabled() -> Self {
        Self { period: 0 }
    }

    /// Whether `episode` should be recorded.
    pub fn should_record(&self, episode: u64) -> bool {
        self.period != 0 && episode % self.period == 0
    }
}

/// Everything a base environment needs to know about the session at
/// construction time.
///
/// The context stays valid for the lifetime of the instance, so an
/// environment may keep it and ask [`should_record_video`](Self::should_record_video)
/// on every reset.
#[derive(Debug, Clone)]
pub struct EnvironmentContext {
    name: String,
    directory: Option<PathBuf>,
    instance_id: usize,
    video: VideoSchedule,
    current_episode: Arc<AtomicU64>,
}

impl EnvironmentContext {
    pub(crate) fn new(
        name: impl Into<String>,
        directory: Option<PathBuf>,
        instance_id: usize,
        video: VideoSchedule,
    ) -> Self {
        Self {
            name: name.into(),
            directory,
            instance_id,
            video,
            current_episode: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Identifier of the environment to construct.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Session output directory, `None` for dry runs.
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Registry index the built instance will get.
    pub fn instance_id(&self) -> usize {
        self.instance_id
    }

    /// Episode most recently started on this instance.
    pub fn current_episode(&self) -> u64 {
        self.current_episode.load(Ordering::Acquire)
    }

    /// Whether the episode currently running on this instance is recorded.
    pub fn should_record_video(&self) -> bool {
        self.video.should_record(self.current_episode())
    }

    pub(crate) fn episode_cell(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.current_episode)
    }
}

/// Constructs the base (undecorated) environment.
pub trait EnvironmentFactory<S, A>: Send + Sync {
    fn create(&self, ctx: &EnvironmentContext) -> anyhow::Result<BoxedEnvironment<S, A>>;
}

impl<S, A, F> EnvironmentFactory<S, A> for F
where
    F: Fn(&EnvironmentContext) -> anyhow::Result<BoxedEnvironment<S, A>> + Send + Sync,
{
    fn create(&self, ctx: &EnvironmentContext) -> anyhow::Result<BoxedEnvironment<S, A>> {
        self(ctx)
    }
}
