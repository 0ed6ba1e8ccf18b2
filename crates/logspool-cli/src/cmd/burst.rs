//! `logspool burst`: write a run of generated lines.
//!
//! Useful for watching batching and rotation: the summary shows how many
//! appends happened during the loop, what was still buffered at shutdown,
//! and which physical files the path rotated through.

use crate::cmd::OutcomeTally;
use crate::output::{CliError, OutputMode, kv, render, render_error};
use clap::Args;
use logspool_core::{LogConfig, LogWriter, WriteMode, WriteOutcome, timing};
use serde::Serialize;
use std::io::Write as _;
use std::path::PathBuf;
use std::time::Instant;

/// Arguments for `logspool burst`.
#[derive(Args, Debug)]
pub struct BurstArgs {
    /// Logical log file path.
    pub path: PathBuf,

    /// Number of lines to write.
    #[arg(long, default_value_t = 1000)]
    pub count: usize,

    /// Write mode (single|collect).
    #[arg(long, default_value = "collect")]
    pub mode: WriteMode,

    /// Tag printed before each line.
    #[arg(long, default_value = "Burst")]
    pub tag: String,
}

/// Result of one `logspool burst` run.
#[derive(Debug, Serialize)]
pub struct BurstSummary {
    pub path: PathBuf,
    pub mode: WriteMode,
    #[serde(flatten)]
    pub tally: OutcomeTally,
    pub pending_before_shutdown: usize,
    pub shutdown_flush_bytes: u64,
    /// Physical files written, in the order they were first used.
    pub files: Vec<PathBuf>,
    pub elapsed: String,
}

/// Run the `logspool burst` command.
pub fn run_burst(args: &BurstArgs, config: LogConfig, output: OutputMode) -> anyhow::Result<()> {
    let writer = LogWriter::new(config);
    let summary = burst(&writer, args, output)?;

    render(output, &summary, |s, w| {
        kv(w, "path", s.path.display())?;
        kv(w, "mode", s.mode)?;
        kv(w, "written", s.tally.written)?;
        kv(w, "flushes", s.tally.flushes)?;
        kv(w, "skipped (space)", s.tally.skipped_low_space)?;
        kv(w, "pending", s.pending_before_shutdown)?;
        kv(w, "shutdown flush", format!("{} bytes", s.shutdown_flush_bytes))?;
        kv(w, "files", s.files.len())?;
        for file in &s.files {
            writeln!(w, "  {}", file.display())?;
        }
        kv(w, "elapsed", &s.elapsed)
    })?;

    if summary.tally.io_failures > 0 {
        anyhow::bail!("{} writes failed", summary.tally.io_failures);
    }
    Ok(())
}

pub(crate) fn burst(
    writer: &LogWriter,
    args: &BurstArgs,
    output: OutputMode,
) -> anyhow::Result<BurstSummary> {
    let started = Instant::now();
    let mut tally = OutcomeTally::default();
    let mut files: Vec<PathBuf> = Vec::new();

    for n in 1..=args.count {
        let message = format!("burst line {n}/{}", args.count);
        let outcome = match writer.write(&args.path, &args.tag, &message, Some(args.mode)) {
            Ok(outcome) => outcome,
            Err(e) => {
                render_error(output, &CliError::from(&e))?;
                anyhow::bail!("{e}");
            }
        };
        if let WriteOutcome::Flushed { ref target, .. } = outcome
            && !files.contains(target)
        {
            files.push(target.clone());
        }
        if let Some(err) = tally.record(&outcome) {
            render_error(output, &err)?;
        }
    }

    let pending_before_shutdown = writer
        .snapshot(&args.path)
        .map_or(0, |snap| snap.pending_len);

    let report = writer.flush_all_pending();
    for (_, err) in &report.failures {
        render_error(output, &CliError::from(err))?;
    }
    tally.io_failures += report.failures.len();
    if !report.flushed.is_empty()
        && let Some(snap) = writer.snapshot(&args.path)
        && !files.contains(&snap.target)
    {
        files.push(snap.target);
    }

    let finished = timing::step(started, "logspool.burst");
    let elapsed = finished.saturating_duration_since(started);

    Ok(BurstSummary {
        path: args.path.clone(),
        mode: args.mode,
        tally,
        pending_before_shutdown,
        shutdown_flush_bytes: report.bytes(),
        files,
        elapsed: timing::format_elapsed(elapsed),
    })
}
