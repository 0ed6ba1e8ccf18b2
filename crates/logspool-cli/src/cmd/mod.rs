pub mod burst;
pub mod print;
pub mod write;

use crate::output::CliError;
use logspool_core::WriteOutcome;

/// Running tally of write outcomes across one command.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct OutcomeTally {
    pub written: usize,
    pub flushes: usize,
    pub flushed_bytes: u64,
    pub skipped_low_space: usize,
    pub io_failures: usize,
}

impl OutcomeTally {
    /// Count one outcome. Returns the outcome's error, if it was a failure.
    pub fn record(&mut self, outcome: &WriteOutcome) -> Option<CliError> {
        match outcome {
            WriteOutcome::Buffered { .. } => {
                self.written += 1;
                None
            }
            WriteOutcome::Flushed { bytes, .. } => {
                self.written += 1;
                self.flushes += 1;
                self.flushed_bytes += bytes;
                None
            }
            WriteOutcome::SkippedLowSpace { .. } => {
                self.skipped_low_space += 1;
                None
            }
            WriteOutcome::IoFailed { code, reason, .. } => {
                self.io_failures += 1;
                Some(CliError {
                    message: reason.clone(),
                    suggestion: code.hint().map(ToOwned::to_owned),
                    error_code: Some(code.code().to_string()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logspool_core::ErrorCode;
    use std::path::PathBuf;

    #[test]
    fn tally_counts_each_outcome_kind() {
        let mut tally = OutcomeTally::default();
        assert!(tally.record(&WriteOutcome::Buffered { pending: 1 }).is_none());
        assert!(
            tally
                .record(&WriteOutcome::Flushed {
                    target: PathBuf::from("/tmp/a.log"),
                    bytes: 40,
                })
                .is_none()
        );
        assert!(
            tally
                .record(&WriteOutcome::SkippedLowSpace { available_kb: 3 })
                .is_none()
        );
        let err = tally
            .record(&WriteOutcome::IoFailed {
                path: PathBuf::from("/tmp/a.log"),
                code: ErrorCode::LogFileWriteFailed,
                reason: "disk gone".to_string(),
            })
            .expect("failure surfaces an error");

        assert_eq!(err.error_code.as_deref(), Some("E5002"));
        assert_eq!(
            tally,
            OutcomeTally {
                written: 2,
                flushes: 1,
                flushed_bytes: 40,
                skipped_low_space: 1,
                io_failures: 1,
            }
        );
    }
}
