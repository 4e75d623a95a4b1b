//! Error types for the training session.
//!
//! A stopped session is reported through
//! [`EpisodeOutcome::StopTraining`](crate::EpisodeOutcome), not as an error.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the coordinator.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Invalid configuration or pipeline misuse (e.g. a preprocessor added
    /// after the first environment was built).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The session has already shut down; no new environments may be built.
    #[error("Training session has stopped")]
    Stopped,

    /// Writing scores or experience failed.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// The environment (or one of its preprocessors) failed.
    #[error("Environment error: {0:#}")]
    Environment(anyhow::Error),

    /// The agent failed.
    #[error("Agent error: {0:#}")]
    Agent(anyhow::Error),
}

impl SessionError {
    /// Shorthand for a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

/// Errors while writing results to the session directory.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Serialization error at {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn serialize(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Serialize {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_message() {
        let err = SessionError::config("must add preprocessors before creating environments");
        assert_eq!(
            err.to_string(),
            "Configuration error: must add preprocessors before creating environments"
        );
    }

    #[test]
    fn test_persistence_converts() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err: SessionError = PersistenceError::io("/tmp/scores.json", io_err).into();
        assert!(matches!(err, SessionError::Persistence(PersistenceError::Io { .. })));
        assert!(err.to_string().contains("/tmp/scores.json"));
    }

    #[test]
    fn test_environment_error_keeps_context() {
        let inner = anyhow::anyhow!("simulator crashed").context("step 12");
        let err = SessionError::Environment(inner);
        assert!(err.to_string().contains("step 12"));
        assert!(err.to_string().contains("simulator crashed"));
    }
}
