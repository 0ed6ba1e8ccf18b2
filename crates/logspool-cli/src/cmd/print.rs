//! `logspool print`: send a message through the console channel.

use crate::output::{OutputMode, kv, render};
use clap::Args;
use logspool_core::LogConfig;
use logspool_core::console::{self, LogLevel};
use serde::Serialize;

/// Arguments for `logspool print`.
#[derive(Args, Debug)]
pub struct PrintArgs {
    /// Message to print.
    pub message: String,

    /// Severity (verbose|debug|info|warn|error, or v/d/i/w/e).
    #[arg(long, default_value = "info")]
    pub level: LogLevel,

    /// Tag attached to every chunk.
    #[arg(long, default_value = "Log")]
    pub tag: String,
}

#[derive(Debug, Serialize)]
struct PrintSummary {
    level: LogLevel,
    tag: String,
    chars: usize,
    max_chars: usize,
    chunks: usize,
}

/// Run the `logspool print` command.
pub fn run_print(args: &PrintArgs, config: &LogConfig, output: OutputMode) -> anyhow::Result<()> {
    let chunks = console::print(args.level, &args.tag, &args.message, config.log_max_length);

    let summary = PrintSummary {
        level: args.level,
        tag: args.tag.clone(),
        chars: args.message.chars().count(),
        max_chars: config.log_max_length,
        chunks,
    };

    render(output, &summary, |s, w| {
        kv(w, "level", s.level)?;
        kv(w, "chars", s.chars)?;
        kv(w, "chunks", s.chunks)
    })
}
