// src/reader/waiter.rs

//! Waiting for a run to be assigned an execution pod.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cluster::RunClient;
use crate::errors::{Result, SteplogError};
use crate::model::Run;

/// Wait until the run `namespace/name` reports a pod name.
///
/// Returns immediately, without opening a watch, when the pod name is
/// already set. Otherwise watches the run until an update carries a pod
/// name or no update arrives for `timeout`. Every update without a pod name
/// re-arms the deadline.
///
/// On timeout, a run whose first condition failed yields
/// [`SteplogError::RunFailed`]; anything else yields
/// [`SteplogError::PodWaitTimeout`]. A watch that the backend closes early
/// is resolved the same way, without waiting for the deadline.
pub async fn wait_until_pod_name_available(
    runs: &dyn RunClient,
    namespace: &str,
    name: &str,
    task: &str,
    timeout: Duration,
) -> Result<Run> {
    let run = runs
        .get(namespace, name)
        .await
        .map_err(SteplogError::Cluster)?;

    if run.has_pod() {
        debug!(run = %name, pod = %run.status.pod_name, "pod already assigned");
        return Ok(run);
    }

    let mut watch = runs
        .watch(namespace, name)
        .await
        .map_err(SteplogError::Cluster)?;

    debug!(run = %name, ?timeout, "waiting for pod to be assigned");

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    let mut last_seen = run;
    let assigned = loop {
        tokio::select! {
            event = watch.next() => match event {
                Some(updated) if updated.has_pod() => break Some(updated),
                Some(updated) => {
                    deadline.as_mut().reset(Instant::now() + timeout);
                    last_seen = updated;
                }
                None => {
                    warn!(run = %name, "run watch closed before a pod was assigned");
                    break None;
                }
            },
            _ = &mut deadline => {
                debug!(run = %name, "timed out waiting for pod");
                break None;
            }
        }
    };

    watch.stop();

    if let Some(run) = assigned {
        debug!(run = %name, pod = %run.status.pod_name, "pod assigned");
        return Ok(run);
    }

    match last_seen.failure_message() {
        Some(message) => Err(SteplogError::RunFailed {
            task: task.to_string(),
            message: message.to_string(),
        }),
        None => Err(SteplogError::PodWaitTimeout {
            task: task.to_string(),
        }),
    }
}
