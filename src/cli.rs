// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::parse_duration;

/// Command-line arguments for `steplog`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "steplog",
    version,
    about = "Show the logs of a task run, step by step.",
    long_about = None
)]
pub struct CliArgs {
    /// Name of the run to read logs from.
    pub run: String,

    /// Namespace of the run.
    #[arg(short = 'n', long, default_value = "default")]
    pub namespace: String,

    /// Keep streaming new output until every step has finished.
    #[arg(short = 'f', long)]
    pub follow: bool,

    /// Also show the logs of init steps.
    #[arg(short = 'a', long = "all")]
    pub all_steps: bool,

    /// Only show the given step; may be repeated.
    #[arg(short = 's', long = "step", value_name = "NAME")]
    pub steps: Vec<String>,

    /// Task name to show instead of the one recorded on the run.
    #[arg(long, value_name = "NAME")]
    pub task: Option<String>,

    /// Ordinal used for the fallback task name ("Task N").
    #[arg(long, default_value_t = 1)]
    pub number: usize,

    /// Cluster snapshot (TOML) to read runs, pods and logs from.
    #[arg(long, value_name = "PATH")]
    pub snapshot: PathBuf,

    /// Path to the config file (TOML).
    ///
    /// Default: `steplog.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// How long `--follow` waits for the run to get a pod (e.g. "30s").
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub pod_wait_timeout: Option<Duration>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `STEPLOG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
