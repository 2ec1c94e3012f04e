// tests/multiplexer.rs

mod common;
use crate::common::builders::{running, waiting};
use crate::common::{
    Drained, FakeCluster, FakeContainer, POD, drain, errors, init_tracing, logs, with_timeout,
};

use std::time::Duration;

use steplog::cluster::PodClient;
use steplog::model::{ContainerState, LogLine, LogRecord, Step, StepError};
use steplog::reader::read_steps_logs;

const TASK: &str = "build";

fn step(name: &str, state: Option<ContainerState>) -> Step {
    Step {
        name: name.to_string(),
        container: format!("step-{name}"),
        state,
    }
}

fn started(name: &str) -> Step {
    step(name, Some(running()))
}

#[tokio::test]
async fn steps_are_read_one_after_another() {
    init_tracing();

    let cluster = FakeCluster::new()
        .with_container(
            "step-first",
            FakeContainer::with_lines(&["1", "2", "3"]).line_delay(Duration::from_millis(5)),
        )
        .with_container("step-second", FakeContainer::with_lines(&["4"]));

    let streams = read_steps_logs(
        TASK.to_string(),
        vec![started("first"), started("second")],
        cluster.handle(POD, "default"),
        false,
        8,
    );
    let items = with_timeout(drain(streams)).await;

    let records: Vec<&LogRecord> = logs(&items);
    let first_sentinel = records
        .iter()
        .position(|r| r.step == "first" && r.is_end_of_step())
        .expect("first step sentinel");
    let first_second = records
        .iter()
        .position(|r| r.step == "second")
        .expect("second step records");
    assert!(first_sentinel < first_second);

    assert_eq!(
        records,
        vec![
            &LogRecord::text(TASK, "first", "1"),
            &LogRecord::text(TASK, "first", "2"),
            &LogRecord::text(TASK, "first", "3"),
            &LogRecord::end_of_step(TASK, "first"),
            &LogRecord::text(TASK, "second", "4"),
            &LogRecord::end_of_step(TASK, "second"),
        ]
    );
}

#[tokio::test]
async fn open_failure_is_reported_once_and_reading_continues() {
    init_tracing();

    let cluster = FakeCluster::new()
        .with_container("step-a", FakeContainer::default().open_error("container not found"))
        .with_container("step-b", FakeContainer::with_lines(&["fine"]));

    let streams = read_steps_logs(
        TASK.to_string(),
        vec![started("a"), started("b")],
        cluster.handle(POD, "default"),
        false,
        8,
    );
    let items = with_timeout(drain(streams)).await;

    let errs = errors(&items);
    assert_eq!(errs.len(), 1);
    assert!(matches!(errs[0], StepError::Open { .. }));
    assert_eq!(
        errs[0].to_string(),
        "error in getting logs for step a: container not found"
    );

    // No sentinel for a step that never opened, and no status check either.
    assert!(logs(&items).iter().all(|r| r.step == "b"));
    assert_eq!(logs(&items).len(), 2);
    assert_eq!(cluster.status_checked(), vec!["step-b"]);
}

#[tokio::test]
async fn stream_errors_are_tagged_and_do_not_abort() {
    init_tracing();

    let cluster = FakeCluster::new()
        .with_container(
            "step-a",
            FakeContainer::with_lines(&["x"]).stream_error("connection reset"),
        )
        .with_container("step-b", FakeContainer::with_lines(&["y"]));

    let streams = read_steps_logs(
        TASK.to_string(),
        vec![started("a"), started("b")],
        cluster.handle(POD, "default"),
        true,
        8,
    );
    let items = with_timeout(drain(streams)).await;

    let errs = errors(&items);
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].step(), "a");
    assert!(!errs[0].is_terminal());
    assert_eq!(errs[0].to_string(), "failed to get logs for a: connection reset");

    assert_eq!(cluster.opened(), vec!["step-a", "step-b"]);
    assert_eq!(logs(&items).len(), 4);
}

#[tokio::test]
async fn terminal_failure_stops_later_steps() {
    init_tracing();

    let cluster = FakeCluster::new()
        .with_container(
            "step-a",
            FakeContainer::with_lines(&["oops"]).status_error("container step-a has failed"),
        )
        .with_container("step-b", FakeContainer::with_lines(&["never"]));

    let streams = read_steps_logs(
        TASK.to_string(),
        vec![started("a"), started("b")],
        cluster.handle(POD, "default"),
        false,
        8,
    );
    let items = with_timeout(drain(streams)).await;

    // The failure follows everything the step printed.
    match items.last() {
        Some(Drained::Error(err)) => assert!(err.is_terminal()),
        Some(Drained::Log(rec)) => assert_eq!(rec, &LogRecord::end_of_step(TASK, "a")),
        None => panic!("nothing drained"),
    }
    assert_eq!(errors(&items).len(), 1);
    assert_eq!(cluster.opened(), vec!["step-a"]);
}

#[tokio::test]
async fn unstarted_steps_are_skipped_only_without_follow() {
    init_tracing();

    let cluster = FakeCluster::new()
        .with_container("step-a", FakeContainer::with_lines(&["a"]))
        .with_container("step-b", FakeContainer::with_lines(&["b"]))
        .with_container("step-c", FakeContainer::with_lines(&["c"]));

    let steps = vec![step("a", None), step("b", Some(waiting())), started("c")];

    let streams = read_steps_logs(
        TASK.to_string(),
        steps.clone(),
        cluster.handle(POD, "default"),
        false,
        8,
    );
    with_timeout(drain(streams)).await;
    assert_eq!(cluster.opened(), vec!["step-a", "step-c"]);

    let follow = FakeCluster::new();
    let streams = read_steps_logs(
        TASK.to_string(),
        steps,
        follow.handle(POD, "default"),
        true,
        8,
    );
    with_timeout(drain(streams)).await;
    assert_eq!(follow.opened(), vec!["step-a", "step-b", "step-c"]);
}

#[tokio::test]
async fn dropping_the_log_receiver_cancels_reading() {
    init_tracing();

    let cluster = FakeCluster::new()
        .with_container("step-a", FakeContainer::with_lines(&["first"]).hold_open())
        .with_container("step-b", FakeContainer::with_lines(&["never"]));

    let mut streams = read_steps_logs(
        TASK.to_string(),
        vec![started("a"), started("b")],
        cluster.handle(POD, "default"),
        true,
        8,
    );

    let rec = with_timeout(streams.logs.recv()).await.unwrap();
    assert_eq!(rec.log, LogLine::Text("first".to_string()));

    drop(streams.logs);

    assert!(cluster.wait_until(|c| c.line_sources_dropped() == 1).await);
    // The error channel closes once the background reader is gone.
    assert!(with_timeout(streams.errors.recv()).await.is_none());
    assert_eq!(cluster.opened(), vec!["step-a"]);
    assert!(cluster.status_checked().is_empty());
}

#[tokio::test]
async fn ignoring_the_error_channel_does_not_block_logs() {
    init_tracing();

    let cluster = FakeCluster::new()
        .with_container("step-a", FakeContainer::default().open_error("boom"))
        .with_container("step-b", FakeContainer::with_lines(&["still here"]));

    let streams = read_steps_logs(
        TASK.to_string(),
        vec![started("a"), started("b")],
        cluster.handle(POD, "default"),
        false,
        1,
    );
    let mut logs_rx = streams.logs;
    drop(streams.errors);

    let mut seen = Vec::new();
    while let Some(rec) = with_timeout(logs_rx.recv()).await {
        seen.push(rec);
    }
    assert_eq!(
        seen,
        vec![
            LogRecord::text(TASK, "b", "still here"),
            LogRecord::end_of_step(TASK, "b"),
        ]
    );
}
