// src/logging.rs

//! Diagnostics for `steplog` itself.
//!
//! STDOUT is reserved for the rendered run logs so they can be piped or
//! redirected untouched. Everything steplog has to say about its own work
//! (resolved steps, pod waits, skipped steps) is a `tracing` event written
//! to STDERR.
//!
//! The level is taken from `--log-level`, else from `STEPLOG_LOG`, else
//! `warn`. Both accept the same names as the CLI flag; the env var also takes
//! `warning`. An unrecognised env value falls back to `warn`.

use anyhow::Result;
use clap::ValueEnum;
use tracing::Level;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Environment variable consulted when `--log-level` is absent.
pub const LOG_ENV: &str = "STEPLOG_LOG";

/// Install the global STDERR subscriber. Call once, before reading.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_level = std::env::var(LOG_ENV).ok();
    let level = effective_level(cli_level, env_level.as_deref());

    fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn effective_level(cli_level: Option<LogLevel>, env_level: Option<&str>) -> Level {
    cli_level
        .or_else(|| env_level.and_then(env_log_level))
        .map(Level::from)
        .unwrap_or(Level::WARN)
}

fn env_log_level(raw: &str) -> Option<LogLevel> {
    match raw.trim() {
        s if s.eq_ignore_ascii_case("warning") => Some(LogLevel::Warn),
        s => LogLevel::from_str(s, true).ok(),
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flag_beats_env() {
        assert_eq!(
            effective_level(Some(LogLevel::Error), Some("trace")),
            Level::ERROR
        );
    }

    #[test]
    fn env_names_match_the_cli_flag() {
        assert_eq!(effective_level(None, Some(" Debug ")), Level::DEBUG);
        assert_eq!(effective_level(None, Some("warning")), Level::WARN);
        assert_eq!(effective_level(None, Some("info")), Level::INFO);
    }

    #[test]
    fn unknown_or_missing_env_defaults_to_warn() {
        assert_eq!(effective_level(None, Some("loud")), Level::WARN);
        assert_eq!(effective_level(None, None), Level::WARN);
    }
}
