#![allow(dead_code, unused_imports)]

pub use steplog_test_utils::builders;
pub use steplog_test_utils::fake_cluster::{FakeCluster, FakeContainer};
pub use steplog_test_utils::{Drained, drain, errors, init_tracing, logs, with_timeout};

pub const NS: &str = "default";
pub const RUN: &str = "build-run";
pub const POD: &str = "build-run-pod";
