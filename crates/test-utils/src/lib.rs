pub mod builders;
pub mod fake_cluster;

use std::sync::Once;

use steplog::model::{LogRecord, StepError};
use steplog::reader::LogStreams;
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// One item drained from a [`LogStreams`], in arrival order.
#[derive(Debug)]
pub enum Drained {
    Log(LogRecord),
    Error(StepError),
}

/// Drain both channels until they close, keeping the interleaving.
pub async fn drain(mut streams: LogStreams) -> Vec<Drained> {
    let mut out = Vec::new();
    let mut logs_open = true;
    let mut errors_open = true;

    while logs_open || errors_open {
        tokio::select! {
            rec = streams.logs.recv(), if logs_open => match rec {
                Some(rec) => out.push(Drained::Log(rec)),
                None => logs_open = false,
            },
            err = streams.errors.recv(), if errors_open => match err {
                Some(err) => out.push(Drained::Error(err)),
                None => errors_open = false,
            },
        }
    }

    out
}

/// Only the log records of a drained stream.
pub fn logs(items: &[Drained]) -> Vec<&LogRecord> {
    items
        .iter()
        .filter_map(|i| match i {
            Drained::Log(rec) => Some(rec),
            Drained::Error(_) => None,
        })
        .collect()
}

/// Only the error records of a drained stream.
pub fn errors(items: &[Drained]) -> Vec<&StepError> {
    items
        .iter()
        .filter_map(|i| match i {
            Drained::Error(err) => Some(err),
            Drained::Log(_) => None,
        })
        .collect()
}
