// src/cluster/mod.rs

//! Pluggable cluster backend abstraction.
//!
//! The reader never talks to a cluster directly. It goes through:
//!
//! - [`RunClient`]: fetch a run, or watch it for updates.
//! - [`PodClient`]: hand out [`PodHandle`]s for a pod name.
//! - [`PodHandle`]: wait for / fetch the pod and open [`ContainerHandle`]s.
//! - [`ContainerHandle`]: open one container's log sources and report its
//!   terminal status.
//!
//! [`snapshot`] provides a file-backed implementation used by the CLI. Tests
//! provide their own scriptable implementation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, oneshot};

use crate::model::{Pod, Run};

pub mod snapshot;

pub use snapshot::SnapshotCluster;

/// Boxed `Send` future returned by backend trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Access to run resources.
pub trait RunClient: Send + Sync {
    /// Fetch the current state of a run.
    fn get<'a>(&'a self, namespace: &'a str, name: &'a str) -> BoxFuture<'a, Result<Run>>;

    /// Subscribe to updates of the run with exactly this name.
    fn watch<'a>(&'a self, namespace: &'a str, name: &'a str)
    -> BoxFuture<'a, Result<RunWatch>>;
}

/// Access to pods.
pub trait PodClient: Send + Sync {
    fn handle(&self, name: &str, namespace: &str) -> Arc<dyn PodHandle>;
}

/// Live handle to one pod.
pub trait PodHandle: Send + Sync {
    fn name(&self) -> &str;

    /// Block until the pod can be read from, or fail if it never will.
    fn wait(&self) -> BoxFuture<'_, Result<Pod>>;

    /// One-shot fetch of the pod.
    fn get(&self) -> BoxFuture<'_, Result<Pod>>;

    fn container(&self, name: &str) -> Box<dyn ContainerHandle>;
}

/// Per-step stream adapter for one container.
pub trait ContainerHandle: Send + Sync {
    /// Open the container's log line source and error source.
    ///
    /// In follow mode the line source stays open until the container ends;
    /// otherwise it closes after the output produced so far.
    fn read_logs(&self, follow: bool) -> BoxFuture<'_, Result<LogSources>>;

    /// Terminal status of the container. `Err` means the process failed.
    fn status(&self) -> BoxFuture<'_, Result<()>>;
}

/// The two sources a container's logs arrive on. Either may close first.
#[derive(Debug)]
pub struct LogSources {
    pub lines: mpsc::Receiver<String>,
    pub errors: mpsc::Receiver<anyhow::Error>,
}

/// Subscription to run updates.
///
/// Dropping the watch stops it, same as calling [`RunWatch::stop`].
#[derive(Debug)]
pub struct RunWatch {
    events: mpsc::Receiver<Run>,
    stop: Option<oneshot::Sender<()>>,
}

impl RunWatch {
    /// Create a watch from an event receiver and a stop signal.
    ///
    /// The backend is expected to stop producing events once `stop` fires
    /// or is dropped.
    pub fn new(events: mpsc::Receiver<Run>, stop: oneshot::Sender<()>) -> Self {
        Self {
            events,
            stop: Some(stop),
        }
    }

    /// Next run snapshot, or `None` once the backend closed the stream.
    pub async fn next(&mut self) -> Option<Run> {
        self.events.recv().await
    }

    pub fn stop(mut self) {
        self.signal_stop();
    }

    fn signal_stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            // The backend may already be gone.
            let _ = stop.send(());
        }
        self.events.close();
    }
}

impl Drop for RunWatch {
    fn drop(&mut self) {
        self.signal_stop();
    }
}
