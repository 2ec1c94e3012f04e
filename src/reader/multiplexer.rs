// src/reader/multiplexer.rs

//! Background task fanning per-step log sources into the reader's outputs.
//!
//! Steps are read strictly one after another. Within a step, the line source
//! and the error source are serviced together by a small merge state machine
//! ([`SourceState`]) until both have closed.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cluster::{LogSources, PodHandle};
use crate::model::{LogRecord, Step, StepError};
use crate::reader::LogStreams;

/// Which of two merged sources are still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SourceState {
    BothOpen,
    LogsOnly,
    ErrorsOnly,
    Drained,
}

impl SourceState {
    pub(crate) fn logs_open(self) -> bool {
        matches!(self, SourceState::BothOpen | SourceState::LogsOnly)
    }

    pub(crate) fn errors_open(self) -> bool {
        matches!(self, SourceState::BothOpen | SourceState::ErrorsOnly)
    }

    pub(crate) fn close_logs(self) -> Self {
        match self {
            SourceState::BothOpen => SourceState::ErrorsOnly,
            SourceState::LogsOnly => SourceState::Drained,
            other => other,
        }
    }

    pub(crate) fn close_errors(self) -> Self {
        match self {
            SourceState::BothOpen => SourceState::LogsOnly,
            SourceState::ErrorsOnly => SourceState::Drained,
            other => other,
        }
    }
}

/// The log receiver was dropped; nobody is reading anymore.
#[derive(Debug)]
struct ConsumerGone;

/// How a single step ended.
#[derive(Debug, PartialEq, Eq)]
enum StepOutcome {
    Continue,
    Abort,
}

/// Spawn the multiplexing loop over `steps` and return its outputs.
///
/// Both receivers close once the loop ends: after the last step, after a
/// step's process reported failure, or once the log receiver is dropped.
pub fn read_steps_logs(
    task: String,
    steps: Vec<Step>,
    pod: Arc<dyn PodHandle>,
    follow: bool,
    capacity: usize,
) -> LogStreams {
    let (log_tx, logs) = mpsc::channel::<LogRecord>(capacity);
    let (err_tx, errors) = mpsc::channel::<StepError>(capacity);

    let mux = Multiplexer {
        task,
        follow,
        log_tx,
        err_tx,
    };
    tokio::spawn(mux.run(steps, pod));

    LogStreams { logs, errors }
}

struct Multiplexer {
    task: String,
    follow: bool,
    log_tx: mpsc::Sender<LogRecord>,
    err_tx: mpsc::Sender<StepError>,
}

impl Multiplexer {
    async fn run(self, steps: Vec<Step>, pod: Arc<dyn PodHandle>) {
        debug!(task = %self.task, pod = %pod.name(), steps = steps.len(), "log multiplexer started");

        for step in &steps {
            if !self.follow && !step.has_started() {
                debug!(task = %self.task, step = %step.name, "step has not started; skipping");
                continue;
            }

            match self.read_step(step, pod.as_ref()).await {
                Ok(StepOutcome::Continue) => {}
                Ok(StepOutcome::Abort) => {
                    info!(task = %self.task, step = %step.name, "step failed; not reading remaining steps");
                    break;
                }
                Err(ConsumerGone) => {
                    debug!(task = %self.task, step = %step.name, "log consumer went away; stopping");
                    break;
                }
            }
        }

        debug!(task = %self.task, "log multiplexer finished");
        // Dropping `self` closes both output channels.
    }

    async fn read_step(
        &self,
        step: &Step,
        pod: &dyn PodHandle,
    ) -> Result<StepOutcome, ConsumerGone> {
        let container = pod.container(&step.container);

        let sources = match container.read_logs(self.follow).await {
            Ok(sources) => sources,
            Err(reason) => {
                warn!(task = %self.task, step = %step.name, error = %reason, "could not open step logs");
                self.send_error(StepError::Open {
                    step: step.name.clone(),
                    reason,
                })
                .await;
                return Ok(StepOutcome::Continue);
            }
        };

        self.merge(step, sources).await?;

        match container.status().await {
            Ok(()) => Ok(StepOutcome::Continue),
            Err(reason) => {
                self.send_error(StepError::Failed {
                    step: step.name.clone(),
                    reason,
                })
                .await;
                Ok(StepOutcome::Abort)
            }
        }
    }

    /// Forward both sources of one step until they are drained.
    async fn merge(&self, step: &Step, mut sources: LogSources) -> Result<(), ConsumerGone> {
        let mut state = SourceState::BothOpen;

        while state != SourceState::Drained {
            tokio::select! {
                line = sources.lines.recv(), if state.logs_open() => match line {
                    Some(line) => {
                        self.send_log(LogRecord::text(&self.task, &step.name, line)).await?;
                    }
                    None => {
                        self.send_log(LogRecord::end_of_step(&self.task, &step.name)).await?;
                        state = state.close_logs();
                    }
                },
                err = sources.errors.recv(), if state.errors_open() => match err {
                    Some(reason) => {
                        self.send_error(StepError::Stream {
                            step: step.name.clone(),
                            reason,
                        })
                        .await;
                    }
                    None => state = state.close_errors(),
                },
                _ = self.log_tx.closed() => return Err(ConsumerGone),
            }
        }

        Ok(())
    }

    async fn send_log(&self, record: LogRecord) -> Result<(), ConsumerGone> {
        self.log_tx.send(record).await.map_err(|_| ConsumerGone)
    }

    /// Errors are best effort: a consumer may ignore the error channel.
    async fn send_error(&self, error: StepError) {
        if let Err(mpsc::error::SendError(error)) = self.err_tx.send(error).await {
            debug!(task = %self.task, step = %error.step(), %error, "error receiver dropped; discarding");
        }
    }
}
