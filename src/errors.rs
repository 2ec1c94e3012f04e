// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! [`SteplogError`] covers everything that makes [`LogReader::read`] fail
//! before streaming starts. Errors that happen *while* streaming are
//! delivered on the error channel as [`StepError`]s instead.
//!
//! [`LogReader::read`]: crate::reader::LogReader::read
//! [`StepError`]: crate::model::StepError

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SteplogError {
    #[error("unable to get run {run}: {reason}")]
    RunNotFound { run: String, reason: anyhow::Error },

    #[error("task {task} has not started yet")]
    NotStarted { task: String },

    #[error("task {task} has failed: {message}")]
    RunFailed { task: String, message: String },

    #[error("pod for taskrun {run} not available yet")]
    PodNotAvailable { run: String },

    #[error("task {task} create has not started yet or pod for task not yet available")]
    PodWaitTimeout { task: String },

    #[error("task {task} failed: {reason}. Run {describe} {run} for more details.")]
    TaskFailed {
        task: String,
        reason: String,
        run: String,
        describe: String,
    },

    #[error("cluster error: {0}")]
    Cluster(anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SteplogError>;
