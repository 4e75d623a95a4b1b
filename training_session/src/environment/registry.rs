//! Registry of every environment instance built in a session.
//!
//! Each instance sits behind its own lock. An episode holds that lock for
//! its whole duration and shutdown takes it to close the instance, so a
//! close can never interleave with stepping. A closed instance is
//! represented by an empty slot; it cannot be stepped or closed again.

use super::BoxedEnvironment;
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Environment instance owned by the session, guarded by its own lock.
pub struct ManagedEnvironment<S, A> {
    id: usize,
    slot: Mutex<Option<BoxedEnvironment<S, A>>>,
    current_episode: Arc<AtomicU64>,
}

/// Handle workers hold on to and pass back to `run_episode`.
pub type EnvHandle<S, A> = Arc<ManagedEnvironment<S, A>>;

impl<S, A> ManagedEnvironment<S, A> {
    pub(crate) fn new(
        id: usize,
        env: BoxedEnvironment<S, A>,
        current_episode: Arc<AtomicU64>,
    ) -> Self {
        Self {
            id,
            slot: Mutex::new(Some(env)),
            current_episode,
        }
    }

    /// Registry index of this instance.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Whether the instance has been closed.
    ///
    /// Blocks while an episode is running on the instance.
    pub fn is_closed(&self) -> bool {
        self.slot.lock().is_none()
    }

    /// Acquire the instance lock. `None` inside the guard means closed.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Option<BoxedEnvironment<S, A>>> {
        self.slot.lock()
    }

    /// Publish the episode about to run. Call while holding the lock.
    pub(crate) fn begin_episode(&self, episode: u64) {
        self.current_episode.store(episode, Ordering::Release);
    }

    /// Close the instance under its lock.
    ///
    /// Returns `Ok(false)` if it was already closed. The instance counts as
    /// closed even when the environment's own `close` fails.
    pub(crate) fn close(&self) -> anyhow::Result<bool> {
        let mut slot = self.slot.lock();
        match slot.take() {
            Some(mut env) => {
                env.close()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl<S, A> fmt::Debug for ManagedEnvironment<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedEnvironment")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Append-only list of every instance built in the session.
pub struct EnvironmentRegistry<S, A> {
    instances: Vec<EnvHandle<S, A>>,
}

impl<S, A> EnvironmentRegistry<S, A> {
    pub fn new() -> Self {
        Self {
            instances: Vec::new(),
        }
    }

    /// Take ownership of a built environment and return its shared handle.
    pub(crate) fn register(
        &mut self,
        id: usize,
        env: BoxedEnvironment<S, A>,
        current_episode: Arc<AtomicU64>,
    ) -> EnvHandle<S, A> {
        let handle = Arc::new(ManagedEnvironment::new(id, env, current_episode));
        self.instances.push(Arc::clone(&handle));
        handle
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Clone the handles so they can be closed outside the session lock.
    pub fn snapshot(&self) -> Vec<EnvHandle<S, A>> {
        self.instances.clone()
    }
}

impl<S, A> Default for EnvironmentRegistry<S, A> {
    fn default() -> Self {
        Self::new()
    }
}
