use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::registry::WriteMode;

/// Machine-readable error codes for host applications and operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    InvalidConfigValue,
    WriteModeConflict,
    LogFileCreateFailed,
    LogFileWriteFailed,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::InvalidConfigValue => "E1002",
            Self::WriteModeConflict => "E2001",
            Self::LogFileCreateFailed => "E5001",
            Self::LogFileWriteFailed => "E5002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidConfigValue => "Invalid config value",
            Self::WriteModeConflict => "Write mode conflict",
            Self::LogFileCreateFailed => "Log file create failed",
            Self::LogFileWriteFailed => "Log file write failed",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in logspool/config.toml and retry."),
            Self::InvalidConfigValue => Some("Size limits and batch sizes must be greater than zero."),
            Self::WriteModeConflict => {
                Some("Use one write mode per log path, or write to a different path.")
            }
            Self::LogFileCreateFailed => {
                Some("Check that the log directory is writable and its parents can be created.")
            }
            Self::LogFileWriteFailed => Some("Check disk space and write permissions."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised while resolving or writing a log destination.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// A write explicitly asked for a mode other than the one the path was
    /// first written with.
    #[error(
        "{}: write mode {requested} conflicts with established mode {established}",
        .path.display()
    )]
    WriteModeConflict {
        path: PathBuf,
        established: WriteMode,
        requested: WriteMode,
    },

    /// Creating a rotated target file failed.
    #[error("failed to create log file {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Appending to a target file failed.
    #[error("failed to append to log file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LogError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::WriteModeConflict { .. } => ErrorCode::WriteModeConflict,
            Self::Create { .. } => ErrorCode::LogFileCreateFailed,
            Self::Io { .. } => ErrorCode::LogFileWriteFailed,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }

    /// Path the failure concerns.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::WriteModeConflict { path, .. } | Self::Create { path, .. } | Self::Io { path, .. } => {
                path
            }
        }
    }

    /// True for failures that came from the filesystem rather than the caller.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Create { .. } | Self::Io { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorCode, LogError};
    use crate::registry::WriteMode;
    use std::collections::HashSet;
    use std::path::PathBuf;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ConfigParseError,
            ErrorCode::InvalidConfigValue,
            ErrorCode::WriteModeConflict,
            ErrorCode::LogFileCreateFailed,
            ErrorCode::LogFileWriteFailed,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::WriteModeConflict.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn conflict_message_names_path_and_both_modes() {
        let err = LogError::WriteModeConflict {
            path: PathBuf::from("/var/log/app/trace.log"),
            established: WriteMode::Single,
            requested: WriteMode::Collect,
        };
        let text = err.to_string();
        assert!(text.contains("/var/log/app/trace.log"));
        assert!(text.contains("single"));
        assert!(text.contains("collect"));
        assert_eq!(err.code(), ErrorCode::WriteModeConflict);
        assert!(!err.is_io());
        assert!(err.hint().is_some());
    }

    #[test]
    fn io_errors_map_to_file_codes() {
        let err = LogError::Io {
            path: PathBuf::from("a.log"),
            source: std::io::Error::other("disk gone"),
        };
        assert!(err.is_io());
        assert_eq!(err.code(), ErrorCode::LogFileWriteFailed);
        assert!(std::error::Error::source(&err).is_some());
    }
}
