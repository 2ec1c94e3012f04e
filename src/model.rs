// src/model.rs

//! Data model shared by the reader, the cluster backends and the renderer.
//!
//! `Run` and `Pod` are read-only snapshots of cluster resources. They derive
//! `Deserialize` so that the snapshot backend can load them straight from
//! TOML.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Status of a single run condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

/// One entry of a run's status conditions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Condition {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub status: ConditionStatus,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

/// Reference to the task definition a run executes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskRef {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunSpec {
    #[serde(default)]
    pub task_ref: Option<TaskRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunStatus {
    /// Ordered; only the first entry decides whether the run failed.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Empty until the run has been scheduled onto a pod.
    #[serde(default)]
    pub pod_name: String,
    #[serde(default)]
    pub start_time: Option<String>,
}

/// An execution record identified by `(namespace, name)`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Run {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub spec: RunSpec,
    #[serde(default)]
    pub status: RunStatus,
}

impl Run {
    pub fn has_started(&self) -> bool {
        self.status
            .start_time
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }

    /// Message of the first condition if it reports a failure.
    pub fn failure_message(&self) -> Option<&str> {
        match self.status.conditions.first() {
            Some(c) if c.status == ConditionStatus::False => Some(c.message.as_str()),
            _ => None,
        }
    }

    pub fn has_pod(&self) -> bool {
        !self.status.pod_name.is_empty()
    }
}

/// Last observed state of a container.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Waiting {
        #[serde(default)]
        reason: String,
    },
    Running,
    Terminated {
        #[serde(default)]
        exit_code: i32,
        #[serde(default)]
        reason: String,
        #[serde(default)]
        message: String,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Container {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContainerStatus {
    pub name: String,
    pub state: ContainerState,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PodSpec {
    #[serde(default)]
    pub init_containers: Vec<Container>,
    #[serde(default)]
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PodStatus {
    #[serde(default)]
    pub init_container_statuses: Vec<ContainerStatus>,
    #[serde(default)]
    pub container_statuses: Vec<ContainerStatus>,
}

/// The shared execution pod of a run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pod {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub spec: PodSpec,
    #[serde(default)]
    pub status: PodStatus,
}

impl Pod {
    /// Failure description for a container that terminated unsuccessfully.
    ///
    /// Returns `None` while the container is still running, or when it
    /// exited with code 0. Init containers are checked as well.
    pub fn container_failure(&self, container: &str) -> Option<String> {
        let status = self
            .status
            .container_statuses
            .iter()
            .chain(self.status.init_container_statuses.iter())
            .find(|cs| cs.name == container)?;

        match &status.state {
            ContainerState::Terminated {
                exit_code,
                reason,
                message,
            } if *exit_code != 0 => {
                let mut msg = format!("container {container} has failed");
                if !reason.is_empty() && reason != "Error" {
                    msg.push_str(&format!(": {reason}"));
                }
                if !message.is_empty() {
                    msg.push_str(&format!(": {message}"));
                }
                Some(msg)
            }
            _ => None,
        }
    }
}

/// One logical stage of a run, backed by one container in the pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Display name (container name without the step prefix).
    pub name: String,
    /// Underlying container name.
    pub container: String,
    /// `None` when the pod reports no status for the container yet.
    pub state: Option<ContainerState>,
}

impl Step {
    /// A step has started unless its container is explicitly waiting.
    pub fn has_started(&self) -> bool {
        !matches!(self.state, Some(ContainerState::Waiting { .. }))
    }
}

/// Payload of a [`LogRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLine {
    Text(String),
    /// Sentinel: the step's log stream ended.
    EndOfStep,
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLine::Text(line) => f.write_str(line),
            LogLine::EndOfStep => f.write_str("EOFLOG"),
        }
    }
}

/// A line of output tagged with the task and step it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub task: String,
    pub step: String,
    pub log: LogLine,
}

impl LogRecord {
    pub fn text(task: &str, step: &str, line: impl Into<String>) -> Self {
        Self {
            task: task.to_string(),
            step: step.to_string(),
            log: LogLine::Text(line.into()),
        }
    }

    pub fn end_of_step(task: &str, step: &str) -> Self {
        Self {
            task: task.to_string(),
            step: step.to_string(),
            log: LogLine::EndOfStep,
        }
    }

    pub fn is_end_of_step(&self) -> bool {
        self.log == LogLine::EndOfStep
    }
}

/// Error record delivered on the reader's error channel.
#[derive(Error, Debug)]
pub enum StepError {
    /// The step's log stream could not be opened. Reading moves on.
    #[error("error in getting logs for step {step}: {reason}")]
    Open { step: String, reason: anyhow::Error },

    /// The transport reported an error mid-stream. Reading moves on.
    #[error("failed to get logs for {step}: {reason}")]
    Stream { step: String, reason: anyhow::Error },

    /// The step's process exited unsuccessfully. Reading stops.
    #[error("{reason}")]
    Failed { step: String, reason: anyhow::Error },
}

impl StepError {
    pub fn step(&self) -> &str {
        match self {
            StepError::Open { step, .. }
            | StepError::Stream { step, .. }
            | StepError::Failed { step, .. } => step,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StepError::Failed { .. })
    }
}
