// src/lib.rs

pub mod cli;
pub mod cluster;
pub mod config;
pub mod errors;
pub mod logging;
pub mod model;
pub mod reader;
pub mod render;

use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::debug;

use crate::cli::CliArgs;
use crate::cluster::SnapshotCluster;
use crate::config::load_or_default;
use crate::reader::{LogReader, ReadOptions};
use crate::render::LogWriter;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (+ CLI overrides)
/// - the snapshot cluster backend
/// - the log reader
/// - the plain-text log writer
///
/// Returns an error if reading could not start, or if any step reported an
/// error while streaming.
pub async fn run(args: CliArgs) -> Result<()> {
    let mut cfg = load_or_default(args.config.as_deref())?;
    if let Some(timeout) = args.pod_wait_timeout {
        cfg.reader.pod_wait_timeout = timeout;
    }
    debug!(?cfg, "effective configuration");

    let cluster = Arc::new(SnapshotCluster::from_path(&args.snapshot)?);

    let options = ReadOptions {
        namespace: args.namespace,
        run: args.run,
        task: args.task,
        number: args.number,
        follow: args.follow,
        all_steps: args.all_steps,
        steps: args.steps,
    };

    let mut reader = LogReader::new(options, cfg.reader, cluster.clone(), cluster)
        .with_err_stream(Box::new(std::io::stderr()));
    let streams = reader.read().await?;

    let mut writer = LogWriter::new(std::io::stdout(), std::io::stderr());
    let summary = writer.write(streams).await?;
    debug!(?summary, "finished rendering logs");

    if summary.errors > 0 {
        bail!(
            "{} error(s) while reading logs of run {}",
            summary.errors,
            reader.options().run
        );
    }

    Ok(())
}
