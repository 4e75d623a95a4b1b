//! Composition of a base environment with an ordered preprocessor stack.
//!
//! The builder collects preprocessors until the first environment is built.
//! Building seals it: the stack is frozen into a shareable [`Pipeline`] and
//! later additions are rejected with a configuration error, so every
//! instance of a session runs through the same wrappers in the same order.

use super::context::{EnvironmentContext, EnvironmentFactory};
use super::BoxedEnvironment;
use crate::error::{Result, SessionError};
use anyhow::Context;
use std::sync::Arc;

/// Wraps an environment in a decorator implementing the same interface.
///
/// Closures `Fn(BoxedEnvironment) -> anyhow::Result<BoxedEnvironment>`
/// implement this trait; captured values play the role of constructor
/// arguments.
pub trait Preprocessor<S, A>: Send + Sync {
    fn wrap(&self, env: BoxedEnvironment<S, A>) -> anyhow::Result<BoxedEnvironment<S, A>>;
}

impl<S, A, F> Preprocessor<S, A> for F
where
    F: Fn(BoxedEnvironment<S, A>) -> anyhow::Result<BoxedEnvironment<S, A>> + Send + Sync,
{
    fn wrap(&self, env: BoxedEnvironment<S, A>) -> anyhow::Result<BoxedEnvironment<S, A>> {
        self(env)
    }
}

/// A named stage of the stack.
struct Stage<S, A> {
    name: String,
    preprocessor: Box<dyn Preprocessor<S, A>>,
}

/// Collects preprocessors until sealed by the first build.
pub struct PipelineBuilder<S, A> {
    factory: Arc<dyn EnvironmentFactory<S, A>>,
    stages: Vec<Stage<S, A>>,
    sealed: Option<Pipeline<S, A>>,
}

impl<S, A> PipelineBuilder<S, A> {
    /// Create a builder around the base environment factory.
    pub fn new(factory: impl EnvironmentFactory<S, A> + 'static) -> Self {
        Self {
            factory: Arc::new(factory),
            stages: Vec::new(),
            sealed: None,
        }
    }

    /// Append a preprocessor to the stack.
    ///
    /// Fails with [`SessionError::Configuration`] once an environment has
    /// been built.
    pub fn add_preprocessor(
        &mut self,
        name: impl Into<String>,
        preprocessor: impl Preprocessor<S, A> + 'static,
    ) -> Result<()> {
        let name = name.into();
        if self.is_sealed() {
            return Err(SessionError::config(format!(
                "cannot add preprocessor '{}': must add preprocessors before creating environments",
                name
            )));
        }
        self.stages.push(Stage {
            name,
            preprocessor: Box::new(preprocessor),
        });
        Ok(())
    }

    /// Whether the stack has been frozen by a build.
    pub fn is_sealed(&self) -> bool {
        self.sealed.is_some()
    }

    /// Names of the preprocessors, innermost first.
    pub fn stage_names(&self) -> Vec<&str> {
        match &self.sealed {
            Some(pipeline) => pipeline.stage_names(),
            None => self.stages.iter().map(|s| s.name.as_str()).collect(),
        }
    }

    /// Freeze the stack and return the shared pipeline.
    ///
    /// Idempotent: later calls return the same pipeline.
    pub fn seal(&mut self) -> Pipeline<S, A> {
        if let Some(pipeline) = &self.sealed {
            return pipeline.clone();
        }
        let stages: Vec<Stage<S, A>> = std::mem::take(&mut self.stages);
        let pipeline = Pipeline {
            factory: Arc::clone(&self.factory),
            stages: Arc::from(stages),
        };
        tracing::debug!(stages = ?pipeline.stage_names(), "preprocessing pipeline sealed");
        self.sealed = Some(pipeline.clone());
        pipeline
    }
}

/// Frozen factory plus preprocessor stack. Cheap to clone.
pub struct Pipeline<S, A> {
    factory: Arc<dyn EnvironmentFactory<S, A>>,
    stages: Arc<[Stage<S, A>]>,
}

impl<S, A> Clone for Pipeline<S, A> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
            stages: Arc::clone(&self.stages),
        }
    }
}

impl<S, A> Pipeline<S, A> {
    /// Names of the preprocessors, innermost first.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    /// Construct the base environment and apply every stage in order.
    pub fn build(&self, ctx: &EnvironmentContext) -> anyhow::Result<BoxedEnvironment<S, A>> {
        let mut env = self
            .factory
            .create(ctx)
            .with_context(|| format!("failed to create environment '{}'", ctx.name()))?;
        for stage in self.stages.iter() {
            env = stage
                .preprocessor
                .wrap(env)
                .with_context(|| format!("preprocessor '{}' failed", stage.name))?;
        }
        Ok(env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StepOutcome;
    use crate::environment::{Environment, VideoSchedule};
    use parking_lot::Mutex;

    /// Environment that appends its label to a shared log on every step.
    struct Tagged {
        label: &'static str,
        inner: Option<BoxedEnvironment<u8, u8>>,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Environment for Tagged {
        type State = u8;
        type Action = u8;

        fn reset(&mut self) -> anyhow::Result<u8> {
            match &mut self.inner {
                Some(inner) => inner.reset(),
                None => Ok(0),
            }
        }

        fn step(&mut self, action: &u8) -> anyhow::Result<StepOutcome<u8>> {
            let outcome = match &mut self.inner {
                Some(inner) => inner.step(action)?,
                None => StepOutcome::terminal(0, 0.0),
            };
            self.log.lock().push(self.label);
            Ok(outcome)
        }
    }

    fn tag(label: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> impl Preprocessor<u8, u8> {
        move |env: BoxedEnvironment<u8, u8>| -> anyhow::Result<BoxedEnvironment<u8, u8>> {
            let wrapped: BoxedEnvironment<u8, u8> = Box::new(Tagged {
                label,
                inner: Some(env),
                log: Arc::clone(&log),
            });
            Ok(wrapped)
        }
    }

    fn builder(log: Arc<Mutex<Vec<&'static str>>>) -> PipelineBuilder<u8, u8> {
        PipelineBuilder::new(
            move |_: &EnvironmentContext| -> anyhow::Result<BoxedEnvironment<u8, u8>> {
                let base: BoxedEnvironment<u8, u8> = Box::new(Tagged {
                    label: "base",
                    inner: None,
                    log: Arc::clone(&log),
                });
                Ok(base)
            },
        )
    }

    fn ctx() -> EnvironmentContext {
        EnvironmentContext::new("tagged", None, 0, VideoSchedule::disabled())
    }

    #[test]
    fn test_stages_apply_in_recorded_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut builder = builder(Arc::clone(&log));
        builder.add_preprocessor("first", tag("first", Arc::clone(&log))).unwrap();
        builder.add_preprocessor("second", tag("second", Arc::clone(&log))).unwrap();

        let pipeline = builder.seal();
        let mut env = pipeline.build(&ctx()).unwrap();
        env.reset().unwrap();
        env.step(&0).unwrap();

        // Innermost logs first: base, then first wrapper, then the outermost
        assert_eq!(*log.lock(), vec!["base", "first", "second"]);
        assert_eq!(pipeline.stage_names(), vec!["first", "second"]);
    }

    #[test]
    fn test_add_after_seal_fails() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut builder = builder(Arc::clone(&log));
        builder.add_preprocessor("first", tag("first", Arc::clone(&log))).unwrap();
        builder.seal();

        let err = builder
            .add_preprocessor("late", tag("late", Arc::clone(&log)))
            .unwrap_err();
        assert!(matches!(err, SessionError::Configuration(_)));
        assert_eq!(builder.stage_names(), vec!["first"]);
    }

    #[test]
    fn test_seal_is_idempotent() {
        let mut builder = builder(Arc::new(Mutex::new(Vec::new())));
        let a = builder.seal();
        let b = builder.seal();
        assert!(Arc::ptr_eq(&a.stages, &b.stages));
    }

    #[test]
    fn test_failing_stage_reports_name() {
        let mut builder = builder(Arc::new(Mutex::new(Vec::new())));
        builder
            .add_preprocessor(
                "broken",
                |_env: BoxedEnvironment<u8, u8>| -> anyhow::Result<BoxedEnvironment<u8, u8>> {
                    anyhow::bail!("bad arguments")
                },
            )
            .unwrap();

        let err = builder.seal().build(&ctx()).err().unwrap();
        assert!(format!("{:#}", err).contains("preprocessor 'broken' failed"));
    }
}
