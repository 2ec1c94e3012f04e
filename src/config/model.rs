// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [reader]
/// pod_wait_timeout = "10s"
/// channel_capacity = 32
/// container_prefix = "step-"
/// pipeline_task_label = "tekton.dev/pipelineTask"
/// describe_command = "tkn taskrun describe"
/// ```
///
/// Every key is optional. This is the unvalidated form; convert it with
/// `ConfigFile::try_from`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub reader: RawReaderSection,
}

/// `[reader]` section, as written.
#[derive(Debug, Clone, Deserialize)]
pub struct RawReaderSection {
    /// How long follow mode waits for the run to be assigned a pod.
    #[serde(default = "default_pod_wait_timeout")]
    pub pod_wait_timeout: String,

    /// Capacity of the log and error output channels.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Prefix stripped from container names to form step names.
    #[serde(default = "default_container_prefix")]
    pub container_prefix: String,

    /// Label carrying the pipeline task name of a run.
    #[serde(default = "default_pipeline_task_label")]
    pub pipeline_task_label: String,

    /// Command suggested to the user when a task fails to come up.
    #[serde(default = "default_describe_command")]
    pub describe_command: String,
}

fn default_pod_wait_timeout() -> String {
    "10s".to_string()
}

fn default_channel_capacity() -> usize {
    32
}

fn default_container_prefix() -> String {
    "step-".to_string()
}

fn default_pipeline_task_label() -> String {
    "tekton.dev/pipelineTask".to_string()
}

fn default_describe_command() -> String {
    "tkn taskrun describe".to_string()
}

impl Default for RawReaderSection {
    fn default() -> Self {
        Self {
            pod_wait_timeout: default_pod_wait_timeout(),
            channel_capacity: default_channel_capacity(),
            container_prefix: default_container_prefix(),
            pipeline_task_label: default_pipeline_task_label(),
            describe_command: default_describe_command(),
        }
    }
}

/// Validated reader settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderSettings {
    pub pod_wait_timeout: Duration,
    pub channel_capacity: usize,
    pub container_prefix: String,
    pub pipeline_task_label: String,
    pub describe_command: String,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            pod_wait_timeout: Duration::from_secs(10),
            channel_capacity: default_channel_capacity(),
            container_prefix: default_container_prefix(),
            pipeline_task_label: default_pipeline_task_label(),
            describe_command: default_describe_command(),
        }
    }
}

/// Validated configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub reader: ReaderSettings,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(reader: ReaderSettings) -> Self {
        Self { reader }
    }
}
