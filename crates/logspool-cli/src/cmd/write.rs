//! `logspool write`: append messages to a log file.
//!
//! Every message goes through the full write pipeline (free-space guard,
//! rotation, mode policy). Anything still buffered is flushed before the
//! command returns, the same way a host flushes on shutdown.

use crate::cmd::OutcomeTally;
use crate::output::{CliError, OutputMode, kv, render, render_error};
use clap::Args;
use logspool_core::{LogConfig, LogWriter, WriteMode};
use serde::Serialize;
use std::path::PathBuf;

/// Arguments for `logspool write`.
#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Logical log file path.
    pub path: PathBuf,

    /// Messages to write, one line each.
    #[arg(required = true, value_name = "MESSAGE")]
    pub messages: Vec<String>,

    /// Tag printed before each message.
    #[arg(long, default_value = "Log")]
    pub tag: String,

    /// Write mode (single|collect). Defaults to the path's established mode.
    #[arg(long)]
    pub mode: Option<WriteMode>,
}

/// Result of one `logspool write` run.
#[derive(Debug, Serialize)]
pub struct WriteSummary {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,
    #[serde(flatten)]
    pub tally: OutcomeTally,
    pub shutdown_flush_bytes: u64,
}

/// Run the `logspool write` command.
pub fn run_write(args: &WriteArgs, config: LogConfig, output: OutputMode) -> anyhow::Result<()> {
    let writer = LogWriter::new(config);
    let summary = write_messages(&writer, args, output)?;

    render(output, &summary, |s, w| {
        kv(w, "path", s.path.display())?;
        if let Some(ref target) = s.target {
            kv(w, "target", target.display())?;
        }
        kv(w, "written", s.tally.written)?;
        kv(w, "flushes", s.tally.flushes)?;
        kv(w, "skipped (space)", s.tally.skipped_low_space)?;
        kv(w, "shutdown flush", format!("{} bytes", s.shutdown_flush_bytes))
    })?;

    if summary.tally.io_failures > 0 {
        anyhow::bail!(
            "{} of {} messages failed to write",
            summary.tally.io_failures,
            args.messages.len()
        );
    }
    Ok(())
}

pub(crate) fn write_messages(
    writer: &LogWriter,
    args: &WriteArgs,
    output: OutputMode,
) -> anyhow::Result<WriteSummary> {
    let mut tally = OutcomeTally::default();

    for message in &args.messages {
        match writer.write(&args.path, &args.tag, message, args.mode) {
            Ok(outcome) => {
                if let Some(err) = tally.record(&outcome) {
                    render_error(output, &err)?;
                }
            }
            Err(e) => {
                render_error(output, &CliError::from(&e))?;
                anyhow::bail!("{e}");
            }
        }
    }

    let report = writer.flush_all_pending();
    for (_, err) in &report.failures {
        render_error(output, &CliError::from(err))?;
    }
    tally.io_failures += report.failures.len();

    Ok(WriteSummary {
        path: args.path.clone(),
        target: writer.snapshot(&args.path).map(|snap| snap.target),
        tally,
        shutdown_flush_bytes: report.bytes(),
    })
}
