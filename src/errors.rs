// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollabError {
    /// The job's own function returned an error.
    #[error("job {name} failed: {source}")]
    Job {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// The job's function panicked; the panic was contained in its task.
    ///
    /// `trace` holds the panic location, followed by a backtrace when
    /// `RUST_BACKTRACE` enables capturing one.
    #[error("job {name} panic: {message}\n{trace}")]
    Panicked {
        name: String,
        message: String,
        trace: String,
    },

    /// A task inside an error group panicked outside any job boundary.
    #[error("task panic: {message}\n{trace}")]
    TaskPanicked { message: String, trace: String },

    /// The job never ran because the invocation was cancelled first.
    #[error("job {name} canceled")]
    Canceled { name: String },

    /// The invocation did not finish within its global deadline.
    #[error("collab timeout")]
    Timeout,

    #[error("job handle {0} does not belong to this orchestrator")]
    UnknownJob(String),

    /// A group task terminated outside its own fault boundary (abort, runtime shutdown).
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Stage not found: {0}")]
    UnknownStage(String),

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CollabError {
    /// Name of the job this error is scoped to, if any.
    pub fn job_name(&self) -> Option<&str> {
        match self {
            CollabError::Job { name, .. }
            | CollabError::Panicked { name, .. }
            | CollabError::Canceled { name } => Some(name),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CollabError::Timeout)
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, CollabError::Canceled { .. })
    }
}

pub type Result<T> = std::result::Result<T, CollabError>;
