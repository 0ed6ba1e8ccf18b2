//! Shared output layer for text/JSON parity across commands.
//!
//! Command results go to stdout; errors and tracing output go to stderr so
//! `--json` output stays machine-parseable.

use serde::Serialize;
use std::io::{self, Write};

/// Output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Plain `key: value` lines.
    Text,
    /// One pretty-printed JSON object per command.
    Json,
}

impl OutputMode {
    /// Returns `true` if JSON output was requested.
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// A structured error with optional hint and error code.
#[derive(Debug, Serialize)]
pub struct CliError {
    /// Human-readable error message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Machine-readable error code (`E####`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl From<&logspool_core::LogError> for CliError {
    fn from(err: &logspool_core::LogError) -> Self {
        Self {
            message: err.to_string(),
            suggestion: err.hint().map(ToOwned::to_owned),
            error_code: Some(err.code().code().to_string()),
        }
    }
}

/// Render a serializable value to stdout in the requested format.
///
/// In JSON mode the value is serialized with `serde_json`; otherwise
/// `text_fn` writes the human form.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Text => text_fn(value, &mut out)?,
    }
    Ok(())
}

/// Render an error to stderr in the requested format.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({ "error": error });
            serde_json::to_writer_pretty(&mut out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Text => {
            writeln!(out, "error: {}", error.message)?;
            if let Some(ref suggestion) = error.suggestion {
                writeln!(out, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}

/// Render a left-aligned key/value line in text output.
pub fn kv(w: &mut dyn Write, key: &str, value: impl std::fmt::Display) -> io::Result<()> {
    writeln!(w, "{:<18} {value}", format!("{key}:"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use logspool_core::{LogError, WriteMode};
    use std::path::PathBuf;

    #[test]
    fn json_mode_flag() {
        assert!(OutputMode::Json.is_json());
        assert!(!OutputMode::Text.is_json());
    }

    #[test]
    fn cli_error_carries_code_and_hint() {
        let err = LogError::WriteModeConflict {
            path: PathBuf::from("/tmp/a.log"),
            established: WriteMode::Single,
            requested: WriteMode::Collect,
        };
        let cli = CliError::from(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E2001"));
        assert!(cli.suggestion.is_some());
        assert!(cli.message.contains("/tmp/a.log"));
    }

    #[test]
    fn kv_pads_keys() {
        let mut buf = Vec::new();
        kv(&mut buf, "flushes", 3).expect("write");
        assert_eq!(String::from_utf8(buf).expect("utf-8"), "flushes:           3\n");
    }
}
