use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::sync::{mpsc, oneshot};

use steplog::cluster::{
    BoxFuture, ContainerHandle, LogSources, PodClient, PodHandle, RunClient, RunWatch,
};
use steplog::config::ReaderSettings;
use steplog::model::{Pod, Run};
use steplog::reader::{LogReader, ReadOptions};

/// Scripted behaviour of one container.
#[derive(Debug, Clone, Default)]
pub struct FakeContainer {
    lines: Vec<String>,
    errors: Vec<String>,
    open_error: Option<String>,
    status_error: Option<String>,
    line_delay: Option<Duration>,
    hold_open: bool,
}

impl FakeContainer {
    pub fn with_lines(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Report `msg` on the error source.
    pub fn stream_error(mut self, msg: &str) -> Self {
        self.errors.push(msg.to_string());
        self
    }

    /// Fail to open the log sources.
    pub fn open_error(mut self, msg: &str) -> Self {
        self.open_error = Some(msg.to_string());
        self
    }

    /// Report an unsuccessful terminal status.
    pub fn status_error(mut self, msg: &str) -> Self {
        self.status_error = Some(msg.to_string());
        self
    }

    /// Sleep before each line.
    pub fn line_delay(mut self, delay: Duration) -> Self {
        self.line_delay = Some(delay);
        self
    }

    /// Keep the line source open after the scripted lines, like a step that
    /// is still running in follow mode.
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }
}

#[derive(Default)]
struct Inner {
    runs: Mutex<HashMap<String, Run>>,
    watch_script: Mutex<Vec<(Duration, Run)>>,
    watch_error: Mutex<Option<String>>,
    close_watch: Mutex<bool>,
    pods: Mutex<HashMap<String, Pod>>,
    pod_wait_error: Mutex<Option<String>>,
    pod_get_error: Mutex<Option<String>>,
    containers: Mutex<HashMap<String, FakeContainer>>,
    opened: Mutex<Vec<(String, bool)>>,
    status_checked: Mutex<Vec<String>>,
    get_calls: AtomicUsize,
    watch_calls: AtomicUsize,
    watch_stops: AtomicUsize,
    pod_waits: AtomicUsize,
    pod_gets: AtomicUsize,
    line_sources_dropped: AtomicUsize,
}

/// A scriptable in-memory cluster that:
/// - serves runs and pods registered up front
/// - replays a scripted sequence of watch events
/// - replays scripted container output, errors and terminal status
/// - records which calls were made, for assertions.
#[derive(Clone, Default)]
pub struct FakeCluster {
    inner: Arc<Inner>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_run(self, run: Run) -> Self {
        self.inner
            .runs
            .lock()
            .unwrap()
            .insert(run.name.clone(), run);
        self
    }

    pub fn with_pod(self, pod: Pod) -> Self {
        self.inner
            .pods
            .lock()
            .unwrap()
            .insert(pod.name.clone(), pod);
        self
    }

    pub fn with_container(self, container: &str, script: FakeContainer) -> Self {
        self.inner
            .containers
            .lock()
            .unwrap()
            .insert(container.to_string(), script);
        self
    }

    /// Emit `run` on watches, `delay` after the previous event.
    pub fn watch_event_after(self, delay: Duration, run: Run) -> Self {
        self.inner.watch_script.lock().unwrap().push((delay, run));
        self
    }

    pub fn fail_watch(self, msg: &str) -> Self {
        *self.inner.watch_error.lock().unwrap() = Some(msg.to_string());
        self
    }

    /// Close the watch stream after the scripted events.
    pub fn close_watch_after_events(self) -> Self {
        *self.inner.close_watch.lock().unwrap() = true;
        self
    }

    pub fn fail_pod_wait(self, msg: &str) -> Self {
        *self.inner.pod_wait_error.lock().unwrap() = Some(msg.to_string());
        self
    }

    pub fn fail_pod_get(self, msg: &str) -> Self {
        *self.inner.pod_get_error.lock().unwrap() = Some(msg.to_string());
        self
    }

    /// Reader over this cluster with the given settings.
    pub fn reader_with(&self, options: ReadOptions, settings: ReaderSettings) -> LogReader {
        LogReader::new(
            options,
            settings,
            Arc::new(self.clone()),
            Arc::new(self.clone()),
        )
    }

    /// Reader over this cluster with a short pod wait timeout.
    pub fn reader(&self, options: ReadOptions) -> LogReader {
        let settings = ReaderSettings {
            pod_wait_timeout: Duration::from_millis(200),
            ..ReaderSettings::default()
        };
        self.reader_with(options, settings)
    }

    pub fn get_calls(&self) -> usize {
        self.inner.get_calls.load(Ordering::SeqCst)
    }

    pub fn watch_calls(&self) -> usize {
        self.inner.watch_calls.load(Ordering::SeqCst)
    }

    pub fn watch_stops(&self) -> usize {
        self.inner.watch_stops.load(Ordering::SeqCst)
    }

    pub fn pod_waits(&self) -> usize {
        self.inner.pod_waits.load(Ordering::SeqCst)
    }

    pub fn pod_gets(&self) -> usize {
        self.inner.pod_gets.load(Ordering::SeqCst)
    }

    /// Containers whose logs were opened, in order.
    pub fn opened(&self) -> Vec<String> {
        self.opened_with_follow().into_iter().map(|(c, _)| c).collect()
    }

    pub fn opened_with_follow(&self) -> Vec<(String, bool)> {
        self.inner.opened.lock().unwrap().clone()
    }

    /// Containers whose terminal status was queried, in order.
    pub fn status_checked(&self) -> Vec<String> {
        self.inner.status_checked.lock().unwrap().clone()
    }

    /// How many held-open line sources saw their receiver dropped.
    pub fn line_sources_dropped(&self) -> usize {
        self.inner.line_sources_dropped.load(Ordering::SeqCst)
    }

    /// Poll until `check` holds, for at most two seconds.
    pub async fn wait_until(&self, check: impl Fn(&FakeCluster) -> bool) -> bool {
        for _ in 0..200 {
            if check(self) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        check(self)
    }
}

impl RunClient for FakeCluster {
    fn get<'a>(&'a self, namespace: &'a str, name: &'a str) -> BoxFuture<'a, Result<Run>> {
        Box::pin(async move {
            self.inner.get_calls.fetch_add(1, Ordering::SeqCst);
            self.inner
                .runs
                .lock()
                .unwrap()
                .get(name)
                .filter(|r| r.namespace == namespace)
                .cloned()
                .ok_or_else(|| anyhow!("runs \"{name}\" not found"))
        })
    }

    fn watch<'a>(
        &'a self,
        _namespace: &'a str,
        _name: &'a str,
    ) -> BoxFuture<'a, Result<RunWatch>> {
        Box::pin(async move {
            self.inner.watch_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(msg) = self.inner.watch_error.lock().unwrap().clone() {
                return Err(anyhow!(msg));
            }

            let script = self.inner.watch_script.lock().unwrap().clone();
            let close = *self.inner.close_watch.lock().unwrap();
            let inner = Arc::clone(&self.inner);

            let (tx, rx) = mpsc::channel::<Run>(1);
            let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

            tokio::spawn(async move {
                let replay = async {
                    for (delay, run) in script {
                        tokio::time::sleep(delay).await;
                        if tx.send(run).await.is_err() {
                            return;
                        }
                    }
                };

                let stopped = tokio::select! {
                    _ = replay => false,
                    _ = &mut stop_rx => true,
                };

                if close {
                    drop(tx);
                }
                if !stopped {
                    let _ = stop_rx.await;
                }
                inner.watch_stops.fetch_add(1, Ordering::SeqCst);
            });

            Ok(RunWatch::new(rx, stop_tx))
        })
    }
}

impl PodClient for FakeCluster {
    fn handle(&self, name: &str, _namespace: &str) -> Arc<dyn PodHandle> {
        Arc::new(FakePod {
            inner: Arc::clone(&self.inner),
            name: name.to_string(),
        })
    }
}

struct FakePod {
    inner: Arc<Inner>,
    name: String,
}

impl FakePod {
    fn lookup(&self, error: &Mutex<Option<String>>) -> Result<Pod> {
        if let Some(msg) = error.lock().unwrap().clone() {
            return Err(anyhow!(msg));
        }
        self.inner
            .pods
            .lock()
            .unwrap()
            .get(&self.name)
            .cloned()
            .ok_or_else(|| anyhow!("pods \"{}\" not found", self.name))
    }
}

impl PodHandle for FakePod {
    fn name(&self) -> &str {
        &self.name
    }

    fn wait(&self) -> BoxFuture<'_, Result<Pod>> {
        Box::pin(async move {
            self.inner.pod_waits.fetch_add(1, Ordering::SeqCst);
            self.lookup(&self.inner.pod_wait_error)
        })
    }

    fn get(&self) -> BoxFuture<'_, Result<Pod>> {
        Box::pin(async move {
            self.inner.pod_gets.fetch_add(1, Ordering::SeqCst);
            self.lookup(&self.inner.pod_get_error)
        })
    }

    fn container(&self, name: &str) -> Box<dyn ContainerHandle> {
        Box::new(FakeContainerHandle {
            inner: Arc::clone(&self.inner),
            name: name.to_string(),
        })
    }
}

struct FakeContainerHandle {
    inner: Arc<Inner>,
    name: String,
}

impl FakeContainerHandle {
    fn script(&self) -> FakeContainer {
        self.inner
            .containers
            .lock()
            .unwrap()
            .get(&self.name)
            .cloned()
            .unwrap_or_default()
    }
}

impl ContainerHandle for FakeContainerHandle {
    fn read_logs(&self, follow: bool) -> BoxFuture<'_, Result<LogSources>> {
        Box::pin(async move {
            self.inner
                .opened
                .lock()
                .unwrap()
                .push((self.name.clone(), follow));

            let FakeContainer {
                lines: scripted_lines,
                errors: scripted_errors,
                open_error,
                line_delay,
                hold_open,
                ..
            } = self.script();
            if let Some(msg) = open_error {
                return Err(anyhow!(msg));
            }

            let (line_tx, lines) = mpsc::channel::<String>(4);
            let (err_tx, errors) = mpsc::channel::<anyhow::Error>(4);
            let inner = Arc::clone(&self.inner);

            tokio::spawn(async move {
                for line in scripted_lines {
                    if let Some(delay) = line_delay {
                        tokio::time::sleep(delay).await;
                    }
                    if line_tx.send(line).await.is_err() {
                        inner.line_sources_dropped.fetch_add(1, Ordering::SeqCst);
                        return;
                    }
                }
                if hold_open {
                    line_tx.closed().await;
                    inner.line_sources_dropped.fetch_add(1, Ordering::SeqCst);
                }
            });

            tokio::spawn(async move {
                for msg in scripted_errors {
                    if err_tx.send(anyhow!(msg)).await.is_err() {
                        return;
                    }
                }
            });

            Ok(LogSources { lines, errors })
        })
    }

    fn status(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.inner
                .status_checked
                .lock()
                .unwrap()
                .push(self.name.clone());
            match self.script().status_error {
                Some(msg) => Err(anyhow!(msg)),
                None => Ok(()),
            }
        })
    }
}
