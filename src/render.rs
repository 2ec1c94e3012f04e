// src/render.rs

//! Plain-text rendering of a [`LogStreams`] pair.

use std::io::{self, Write};

use crate::model::LogLine;
use crate::reader::LogStreams;
use crate::reader::multiplexer::SourceState;

/// What a [`LogWriter`] saw while draining.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderSummary {
    pub lines: usize,
    pub errors: usize,
}

/// Drains log and error records into two writers.
///
/// Lines are printed as `[task : step] line`; the end of each step prints a
/// blank separator line. Error records go to the error writer.
pub struct LogWriter<O: Write, E: Write> {
    out: O,
    err: E,
}

impl<O: Write, E: Write> LogWriter<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self { out, err }
    }

    /// Write everything until both channels close.
    pub async fn write(&mut self, mut streams: LogStreams) -> io::Result<RenderSummary> {
        let mut summary = RenderSummary::default();
        let mut state = SourceState::BothOpen;

        while state != SourceState::Drained {
            tokio::select! {
                record = streams.logs.recv(), if state.logs_open() => match record {
                    Some(record) => match record.log {
                        LogLine::Text(line) => {
                            writeln!(self.out, "[{} : {}] {}", record.task, record.step, line)?;
                            summary.lines += 1;
                        }
                        LogLine::EndOfStep => writeln!(self.out)?,
                    },
                    None => state = state.close_logs(),
                },
                error = streams.errors.recv(), if state.errors_open() => match error {
                    Some(error) => {
                        writeln!(self.err, "{error}")?;
                        summary.errors += 1;
                    }
                    None => state = state.close_errors(),
                },
            }
        }

        self.out.flush()?;
        self.err.flush()?;
        Ok(summary)
    }

    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}
