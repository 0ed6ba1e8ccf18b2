//! Console channel.
//!
//! Long messages (JSON bodies, dumps) are split into fixed-size chunks so
//! line-limited sinks such as logcat print them in full. Events go through
//! `tracing` under the `logspool::console` target, so the host's subscriber
//! decides where they end up.
//!
//! The file writer reports its own swallowed I/O failures here.

use std::error::Error;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Severity of a console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Verbose,
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Verbose => "verbose",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Matching `tracing` level. `Verbose` maps to `TRACE`.
    #[must_use]
    pub const fn tracing_level(self) -> tracing::Level {
        match self {
            Self::Verbose => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warning => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v" | "verbose" | "trace" => Ok(Self::Verbose),
            "d" | "debug" => Ok(Self::Debug),
            "i" | "info" => Ok(Self::Info),
            "w" | "warn" | "warning" => Ok(Self::Warning),
            "e" | "error" => Ok(Self::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// Split `message` into pieces of at most `max_chars` characters.
///
/// Splits fall on `char` boundaries. An empty message yields one empty
/// chunk so the line still shows up. `max_chars == 0` disables splitting.
#[must_use]
pub fn split_chunks(message: &str, max_chars: usize) -> Vec<&str> {
    if max_chars == 0 || message.is_empty() {
        return vec![message];
    }

    let mut chunks = Vec::with_capacity(message.len() / max_chars + 1);
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in message.char_indices() {
        if count == max_chars {
            chunks.push(&message[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    chunks.push(&message[start..]);
    chunks
}

/// Print `message` under `tag`, one event per chunk. Returns the number of
/// events emitted.
pub fn print(level: LogLevel, tag: &str, message: &str, max_chars: usize) -> usize {
    let chunks = split_chunks(message, max_chars);
    for chunk in &chunks {
        emit(level, tag, chunk);
    }
    chunks.len()
}

fn emit(level: LogLevel, tag: &str, line: &str) {
    match level {
        LogLevel::Verbose => tracing::trace!(target: "logspool::console", tag, "{line}"),
        LogLevel::Debug => tracing::debug!(target: "logspool::console", tag, "{line}"),
        LogLevel::Info => tracing::info!(target: "logspool::console", tag, "{line}"),
        LogLevel::Warning => tracing::warn!(target: "logspool::console", tag, "{line}"),
        LogLevel::Error => tracing::error!(target: "logspool::console", tag, "{line}"),
    }
}

/// Render an error and every `source()` below it, outermost first, framed
/// by a `=======<error>=======` header.
#[must_use]
pub fn error_chain_lines(err: &dyn Error) -> Vec<String> {
    let mut lines = vec![format!("======={err}=======")];
    let mut source = err.source();
    while let Some(cause) = source {
        lines.push(format!("caused by: {cause}"));
        source = cause.source();
    }
    lines
}

/// Print an error with its full cause chain at error level.
pub fn report_error(tag: &str, err: &dyn Error) {
    for line in error_chain_lines(err) {
        emit(LogLevel::Error, tag, &line);
    }
}
