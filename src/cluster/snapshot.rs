// src/cluster/snapshot.rs

//! File-backed cluster backend.
//!
//! Replays a TOML snapshot of runs, pods and captured container output:
//!
//! ```toml
//! [[runs]]
//! namespace = "default"
//! name = "build-run"
//! labels = { "tekton.dev/pipelineTask" = "build" }
//! status = { pod_name = "build-run-pod", start_time = "2026-10-19T10:00:00Z" }
//!
//! [[pods]]
//! namespace = "default"
//! name = "build-run-pod"
//! spec = { containers = [{ name = "step-compile" }] }
//!
//! [[pods.status.container_statuses]]
//! name = "step-compile"
//! state = { terminated = { exit_code = 0 } }
//!
//! [[logs]]
//! namespace = "default"
//! pod = "build-run-pod"
//! container = "step-compile"
//! lines = ["compiling...", "ok"]
//! ```
//!
//! The snapshot never changes, so a watch yields the stored run once and
//! then stays idle until it is stopped.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use serde::Deserialize;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::cluster::{
    BoxFuture, ContainerHandle, LogSources, PodClient, PodHandle, RunClient, RunWatch,
};
use crate::errors::Result as SteplogResult;
use crate::model::{Pod, Run};

/// Captured output of one container.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContainerLogs {
    pub namespace: String,
    pub pod: String,
    pub container: String,
    #[serde(default)]
    pub lines: Vec<String>,
    /// Transport errors to report on the error source.
    #[serde(default)]
    pub errors: Vec<String>,
}

/// On-disk layout of a snapshot.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotFile {
    #[serde(default)]
    pub runs: Vec<Run>,
    #[serde(default)]
    pub pods: Vec<Pod>,
    #[serde(default)]
    pub logs: Vec<ContainerLogs>,
}

impl SnapshotFile {
    fn run(&self, namespace: &str, name: &str) -> Option<&Run> {
        self.runs
            .iter()
            .find(|r| r.namespace == namespace && r.name == name)
    }

    fn pod(&self, namespace: &str, name: &str) -> Option<&Pod> {
        self.pods
            .iter()
            .find(|p| p.namespace == namespace && p.name == name)
    }

    fn logs(&self, namespace: &str, pod: &str, container: &str) -> Option<&ContainerLogs> {
        self.logs
            .iter()
            .find(|l| l.namespace == namespace && l.pod == pod && l.container == container)
    }
}

/// Cluster backend serving a [`SnapshotFile`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotCluster {
    data: Arc<SnapshotFile>,
}

impl SnapshotCluster {
    pub fn new(data: SnapshotFile) -> Self {
        Self {
            data: Arc::new(data),
        }
    }

    /// Load a snapshot from a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> SteplogResult<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> SteplogResult<Self> {
        let data: SnapshotFile = toml::from_str(contents)?;
        debug!(
            runs = data.runs.len(),
            pods = data.pods.len(),
            logs = data.logs.len(),
            "loaded cluster snapshot"
        );
        Ok(Self::new(data))
    }
}

impl RunClient for SnapshotCluster {
    fn get<'a>(&'a self, namespace: &'a str, name: &'a str) -> BoxFuture<'a, Result<Run>> {
        Box::pin(async move {
            self.data
                .run(namespace, name)
                .cloned()
                .ok_or_else(|| anyhow!("runs \"{name}\" not found in namespace \"{namespace}\""))
        })
    }

    fn watch<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<RunWatch>> {
        Box::pin(async move {
            let (tx, rx) = mpsc::channel::<Run>(1);
            let (stop_tx, stop_rx) = oneshot::channel::<()>();
            let current = self.data.run(namespace, name).cloned();

            tokio::spawn(async move {
                if let Some(run) = current {
                    if tx.send(run).await.is_err() {
                        return;
                    }
                }
                // Keep the stream open until the watcher stops it.
                let _ = stop_rx.await;
            });

            Ok(RunWatch::new(rx, stop_tx))
        })
    }
}

impl PodClient for SnapshotCluster {
    fn handle(&self, name: &str, namespace: &str) -> Arc<dyn PodHandle> {
        Arc::new(SnapshotPod {
            data: Arc::clone(&self.data),
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }
}

struct SnapshotPod {
    data: Arc<SnapshotFile>,
    namespace: String,
    name: String,
}

impl SnapshotPod {
    fn lookup(&self) -> Result<Pod> {
        self.data
            .pod(&self.namespace, &self.name)
            .cloned()
            .ok_or_else(|| anyhow!("pods \"{}\" not found", self.name))
    }
}

impl PodHandle for SnapshotPod {
    fn name(&self) -> &str {
        &self.name
    }

    fn wait(&self) -> BoxFuture<'_, Result<Pod>> {
        Box::pin(async move { self.lookup() })
    }

    fn get(&self) -> BoxFuture<'_, Result<Pod>> {
        Box::pin(async move { self.lookup() })
    }

    fn container(&self, name: &str) -> Box<dyn ContainerHandle> {
        Box::new(SnapshotContainer {
            data: Arc::clone(&self.data),
            namespace: self.namespace.clone(),
            pod: self.name.clone(),
            container: name.to_string(),
        })
    }
}

struct SnapshotContainer {
    data: Arc<SnapshotFile>,
    namespace: String,
    pod: String,
    container: String,
}

impl SnapshotContainer {
    fn declared(&self, pod: &Pod) -> bool {
        pod.spec
            .containers
            .iter()
            .chain(pod.spec.init_containers.iter())
            .any(|c| c.name == self.container)
    }
}

impl ContainerHandle for SnapshotContainer {
    fn read_logs(&self, follow: bool) -> BoxFuture<'_, Result<LogSources>> {
        Box::pin(async move {
            let pod = self
                .data
                .pod(&self.namespace, &self.pod)
                .ok_or_else(|| anyhow!("pods \"{}\" not found", self.pod))?;
            if !self.declared(pod) {
                return Err(anyhow!(
                    "container {} is not valid for pod {}",
                    self.container,
                    self.pod
                ));
            }

            debug!(
                pod = %self.pod,
                container = %self.container,
                follow,
                "replaying captured container output"
            );

            let captured = self
                .data
                .logs(&self.namespace, &self.pod, &self.container)
                .cloned()
                .unwrap_or_default();

            let (line_tx, lines) = mpsc::channel::<String>(16);
            let (err_tx, errors) = mpsc::channel::<anyhow::Error>(4);

            tokio::spawn(async move {
                for line in captured.lines {
                    if line_tx.send(line).await.is_err() {
                        return;
                    }
                }
            });
            tokio::spawn(async move {
                for err in captured.errors {
                    if err_tx.send(anyhow!(err)).await.is_err() {
                        return;
                    }
                }
            });

            Ok(LogSources { lines, errors })
        })
    }

    fn status(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let pod = self
                .data
                .pod(&self.namespace, &self.pod)
                .ok_or_else(|| anyhow!("pods \"{}\" not found", self.pod))?;
            match pod.container_failure(&self.container) {
                Some(msg) => Err(anyhow!(msg)),
                None => Ok(()),
            }
        })
    }
}
