// src/reader/mod.rs

//! Log-reading orchestrator.
//!
//! [`LogReader::read`] resolves the run, optionally waits for its pod, picks
//! the steps to read and hands them to the background multiplexer. It
//! returns the two output channels right away; the caller drains them while
//! the multiplexer runs.
//!
//! - [`steps`] resolves and filters the pod's steps.
//! - [`waiter`] waits for a pod to be assigned (follow mode only).
//! - [`multiplexer`] drives the per-step streams.

pub mod multiplexer;
pub mod steps;
pub mod waiter;

use std::io::Write;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cluster::{PodClient, PodHandle, RunClient};
use crate::config::ReaderSettings;
use crate::errors::{Result, SteplogError};
use crate::model::{LogRecord, Pod, Run, StepError};

pub use multiplexer::read_steps_logs;
pub use steps::filter_steps;
pub use waiter::wait_until_pod_name_available;

/// Output of a read: log records and error records.
///
/// Both channels close when reading is over. Dropping `logs` stops the
/// background reader.
#[derive(Debug)]
pub struct LogStreams {
    pub logs: mpsc::Receiver<LogRecord>,
    pub errors: mpsc::Receiver<StepError>,
}

/// What to read.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    pub namespace: String,
    /// Name of the run.
    pub run: String,
    /// Explicit task name; resolved from the run when `None`.
    pub task: Option<String>,
    /// Ordinal used for the `Task N` fallback name.
    pub number: usize,
    pub follow: bool,
    /// Include init-container steps.
    pub all_steps: bool,
    /// Steps to read; empty means all of them.
    pub steps: Vec<String>,
}

pub struct LogReader {
    options: ReadOptions,
    settings: ReaderSettings,
    runs: Arc<dyn RunClient>,
    pods: Arc<dyn PodClient>,
    err_stream: Option<Box<dyn Write + Send + Sync>>,
}

impl std::fmt::Debug for LogReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogReader")
            .field("options", &self.options)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl LogReader {
    pub fn new(
        options: ReadOptions,
        settings: ReaderSettings,
        runs: Arc<dyn RunClient>,
        pods: Arc<dyn PodClient>,
    ) -> Self {
        Self {
            options,
            settings,
            runs,
            pods,
            err_stream: None,
        }
    }

    /// Also write startup failures of a finished run to `stream`.
    pub fn with_err_stream(mut self, stream: Box<dyn Write + Send + Sync>) -> Self {
        self.err_stream = Some(stream);
        self
    }

    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    /// Start reading logs.
    ///
    /// `Err` means nothing was streamed: the run is missing, not started, or
    /// has no pod. Problems with individual steps arrive on
    /// [`LogStreams::errors`] instead.
    pub async fn read(&mut self) -> Result<LogStreams> {
        let run = self
            .runs
            .get(&self.options.namespace, &self.options.run)
            .await
            .map_err(|reason| SteplogError::RunNotFound {
                run: self.options.run.clone(),
                reason,
            })?;

        let task = self.task_name(&run);
        info!(run = %run.name, task = %task, follow = self.options.follow, "reading run logs");

        if self.options.follow {
            self.read_live_logs(task).await
        } else {
            self.read_available_logs(&run, task).await
        }
    }

    /// Human-facing task name for `run`.
    ///
    /// Explicit name, then the pipeline task label, then the task reference,
    /// then `Task <number>`.
    pub fn task_name(&self, run: &Run) -> String {
        if let Some(task) = &self.options.task {
            return task.clone();
        }

        if let Some(label) = run.labels.get(&self.settings.pipeline_task_label) {
            return label.clone();
        }

        if let Some(task_ref) = &run.spec.task_ref {
            return task_ref.name.clone();
        }

        format!("Task {}", self.options.number)
    }

    async fn read_live_logs(&self, task: String) -> Result<LogStreams> {
        let run = wait_until_pod_name_available(
            self.runs.as_ref(),
            &self.options.namespace,
            &self.options.run,
            &task,
            self.settings.pod_wait_timeout,
        )
        .await?;

        let handle = self.pods.handle(&run.status.pod_name, &self.options.namespace);
        let pod = handle
            .wait()
            .await
            .map_err(|e| self.task_failed(&task, &run, e))?;

        Ok(self.stream(task, &pod, handle))
    }

    async fn read_available_logs(&mut self, run: &Run, task: String) -> Result<LogStreams> {
        if !run.has_started() {
            return Err(SteplogError::NotStarted { task });
        }

        if let Some(message) = run.failure_message() {
            let err = SteplogError::RunFailed {
                task,
                message: message.to_string(),
            };
            if let Some(stream) = self.err_stream.as_mut() {
                // Best effort; the error is returned either way.
                let _ = writeln!(stream, "{err}");
            }
            return Err(err);
        }

        if !run.has_pod() {
            return Err(SteplogError::PodNotAvailable {
                run: run.name.clone(),
            });
        }

        let handle = self.pods.handle(&run.status.pod_name, &self.options.namespace);
        let pod = handle
            .get()
            .await
            .map_err(|e| self.task_failed(&task, run, e))?;

        Ok(self.stream(task, &pod, handle))
    }

    fn stream(&self, task: String, pod: &Pod, handle: Arc<dyn PodHandle>) -> LogStreams {
        let steps = filter_steps(
            pod,
            self.options.all_steps,
            &self.options.steps,
            &self.settings.container_prefix,
        );
        debug!(
            task = %task,
            pod = %pod.name,
            steps = ?steps.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            "resolved steps"
        );

        read_steps_logs(
            task,
            steps,
            handle,
            self.options.follow,
            self.settings.channel_capacity,
        )
    }

    fn task_failed(&self, task: &str, run: &Run, err: anyhow::Error) -> SteplogError {
        SteplogError::TaskFailed {
            task: task.to_string(),
            reason: format!("{err:#}").trim().to_string(),
            run: run.name.clone(),
            describe: self.settings.describe_command.clone(),
        }
    }
}
