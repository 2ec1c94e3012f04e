// tests/pod_waiter.rs

mod common;
use crate::common::builders::RunBuilder;
use crate::common::{FakeCluster, NS, POD, RUN, init_tracing, with_timeout};

use std::time::{Duration, Instant};

use steplog::errors::SteplogError;
use steplog::model::ConditionStatus;
use steplog::reader::wait_until_pod_name_available;

const TIMEOUT: Duration = Duration::from_millis(200);

fn pending_run() -> RunBuilder {
    RunBuilder::new(NS, RUN).condition(ConditionStatus::Unknown, "pending")
}

#[tokio::test]
async fn assigned_pod_returns_without_watching() {
    init_tracing();

    let cluster = FakeCluster::new().with_run(pending_run().pod_name(POD).build());

    let run = with_timeout(wait_until_pod_name_available(
        &cluster, NS, RUN, "build", TIMEOUT,
    ))
    .await
    .unwrap();

    assert_eq!(run.status.pod_name, POD);
    assert_eq!(cluster.get_calls(), 1);
    assert_eq!(cluster.watch_calls(), 0);
}

#[tokio::test]
async fn watch_event_with_pod_name_ends_the_wait() {
    init_tracing();

    let cluster = FakeCluster::new()
        .with_run(pending_run().build())
        .watch_event_after(Duration::from_millis(10), pending_run().build())
        .watch_event_after(Duration::from_millis(10), pending_run().pod_name(POD).build());

    let started = Instant::now();
    let run = with_timeout(wait_until_pod_name_available(
        &cluster,
        NS,
        RUN,
        "build",
        Duration::from_secs(2),
    ))
    .await
    .unwrap();

    assert_eq!(run.status.pod_name, POD);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(cluster.watch_calls(), 1);
    assert!(cluster.wait_until(|c| c.watch_stops() == 1).await);
}

#[tokio::test]
async fn timeout_without_failure_reports_not_scheduled() {
    init_tracing();

    let cluster = FakeCluster::new().with_run(pending_run().build());

    let started = Instant::now();
    let err = with_timeout(wait_until_pod_name_available(
        &cluster, NS, RUN, "build", TIMEOUT,
    ))
    .await
    .unwrap_err();

    assert!(started.elapsed() >= TIMEOUT);
    match &err {
        SteplogError::PodWaitTimeout { task } => assert_eq!(task, "build"),
        other => panic!("expected PodWaitTimeout, got {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        "task build create has not started yet or pod for task not yet available"
    );
    assert!(cluster.wait_until(|c| c.watch_stops() == 1).await);
}

#[tokio::test]
async fn failed_run_wins_over_timeout() {
    init_tracing();

    let cluster =
        FakeCluster::new().with_run(RunBuilder::new(NS, RUN).failed("image pull failed").build());

    let err = with_timeout(wait_until_pod_name_available(
        &cluster, NS, RUN, "build", TIMEOUT,
    ))
    .await
    .unwrap_err();

    match err {
        SteplogError::RunFailed { task, message } => {
            assert_eq!(task, "build");
            assert_eq!(message, "image pull failed");
        }
        other => panic!("expected RunFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn failure_seen_on_the_watch_is_reported_at_timeout() {
    init_tracing();

    let cluster = FakeCluster::new()
        .with_run(pending_run().build())
        .watch_event_after(
            Duration::from_millis(10),
            RunBuilder::new(NS, RUN).failed("quota exceeded").build(),
        );

    let err = with_timeout(wait_until_pod_name_available(
        &cluster, NS, RUN, "build", TIMEOUT,
    ))
    .await
    .unwrap_err();

    assert!(
        matches!(&err, SteplogError::RunFailed { message, .. } if message == "quota exceeded"),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn closed_watch_resolves_before_the_deadline() {
    init_tracing();

    let cluster = FakeCluster::new()
        .with_run(pending_run().build())
        .close_watch_after_events();

    let started = Instant::now();
    let err = with_timeout(wait_until_pod_name_available(
        &cluster,
        NS,
        RUN,
        "build",
        Duration::from_secs(3),
    ))
    .await
    .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(matches!(err, SteplogError::PodWaitTimeout { .. }));
}

#[tokio::test]
async fn fetch_and_watch_failures_are_immediate() {
    init_tracing();

    let missing = FakeCluster::new();
    let err = with_timeout(wait_until_pod_name_available(
        &missing, NS, RUN, "build", TIMEOUT,
    ))
    .await
    .unwrap_err();
    assert!(matches!(err, SteplogError::Cluster(_)));
    assert_eq!(missing.watch_calls(), 0);

    let broken_watch = FakeCluster::new()
        .with_run(pending_run().build())
        .fail_watch("watch refused");
    let started = Instant::now();
    let err = with_timeout(wait_until_pod_name_available(
        &broken_watch,
        NS,
        RUN,
        "build",
        Duration::from_secs(3),
    ))
    .await
    .unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(1));
    match err {
        SteplogError::Cluster(inner) => assert_eq!(inner.to_string(), "watch refused"),
        other => panic!("expected Cluster error, got {other:?}"),
    }
}

#[tokio::test]
async fn updates_without_pod_name_extend_the_wait() {
    init_tracing();

    let step = Duration::from_millis(150);
    let cluster = FakeCluster::new()
        .with_run(pending_run().build())
        .watch_event_after(step, pending_run().build())
        .watch_event_after(step, pending_run().build())
        .watch_event_after(step, pending_run().pod_name(POD).build());

    let started = Instant::now();
    let run = with_timeout(wait_until_pod_name_available(
        &cluster, NS, RUN, "build", TIMEOUT,
    ))
    .await
    .unwrap();

    assert_eq!(run.status.pod_name, POD);
    assert!(started.elapsed() > TIMEOUT);
    assert!(cluster.wait_until(|c| c.watch_stops() == 1).await);
}

#[tokio::test]
async fn quiet_period_after_last_update_times_out() {
    init_tracing();

    let cluster = FakeCluster::new()
        .with_run(pending_run().build())
        .watch_event_after(Duration::from_millis(150), pending_run().build());

    let started = Instant::now();
    let err = with_timeout(wait_until_pod_name_available(
        &cluster, NS, RUN, "build", TIMEOUT,
    ))
    .await
    .unwrap_err();

    // Deadline re-armed at the update: 150ms + 200ms.
    assert!(started.elapsed() >= Duration::from_millis(350));
    assert!(matches!(err, SteplogError::PodWaitTimeout { .. }), "got {err:?}");
}
