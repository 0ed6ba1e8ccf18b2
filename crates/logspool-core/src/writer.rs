//! Entry point for file logging.
//!
//! [`LogWriter::write`] runs the whole pipeline for one message:
//!
//! 1. Resolve the caller's path to its absolute registry key.
//! 2. Check free space on the log volume; skip silently when low.
//! 3. Under the path's lock: format the line
//!    (`<timestamp> <tag> <Thread name:..>: <message>`), rotate if needed,
//!    check the write mode, buffer the line, and flush when the mode or
//!    batch size says so.
//!
//! Filesystem failures never reach the caller as `Err`. They are reported on
//! the console channel and returned as [`WriteOutcome::IoFailed`]. The only
//! `Err` is [`LogError::WriteModeConflict`], which signals a caller bug.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::Local;
use tracing::{debug, warn};

use crate::config::LogConfig;
use crate::console;
use crate::error::{ErrorCode, LogError};
use crate::guard::{FsSpaceProbe, SpaceCheck, SpaceProbe, check_free_space};
use crate::registry::{DestinationSnapshot, FlushDecision, FlushReport, Registry, WriteMode};
use crate::rotation::format_timestamp;

/// Tag used when the writer reports its own failures.
pub const SELF_TAG: &str = "logspool";

/// Result of a [`LogWriter::write`] call that did not hit a caller error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The line is held in memory; `pending` lines are buffered for the path.
    Buffered { pending: usize },
    /// The buffer, ending with this line, was appended to `target`.
    Flushed { target: PathBuf, bytes: u64 },
    /// The log volume is below the free-space floor; nothing was done.
    SkippedLowSpace { available_kb: u64 },
    /// The filesystem refused the write. Already reported on the console.
    IoFailed {
        path: PathBuf,
        code: ErrorCode,
        reason: String,
    },
}

impl WriteOutcome {
    /// True when this call caused a physical append.
    #[must_use]
    pub const fn flushed(&self) -> bool {
        matches!(self, Self::Flushed { .. })
    }
}

/// Format one log line. The trailing space before the newline is part of
/// the on-disk format.
#[must_use]
pub fn format_line(stamp: &str, tag: &str, thread: &str, message: &str) -> String {
    format!("{stamp} {tag} <Thread name:{thread}>: {message} \n")
}

/// Name of the calling thread, or its id when it has none.
#[must_use]
pub fn current_thread_label() -> String {
    let thread = std::thread::current();
    thread
        .name()
        .map_or_else(|| format!("{:?}", thread.id()), ToOwned::to_owned)
}

/// Thread-safe file logger. Share it behind an `Arc`.
pub struct LogWriter {
    registry: Registry,
    config: RwLock<LogConfig>,
    probe: Box<dyn SpaceProbe>,
}

impl LogWriter {
    /// Writer that probes free space on the real filesystem.
    #[must_use]
    pub fn new(config: LogConfig) -> Self {
        Self::with_probe(config, FsSpaceProbe)
    }

    /// Writer with a custom free-space probe.
    #[must_use]
    pub fn with_probe(config: LogConfig, probe: impl SpaceProbe + 'static) -> Self {
        Self {
            registry: Registry::new(),
            config: RwLock::new(config),
            probe: Box::new(probe),
        }
    }

    /// Current settings.
    #[must_use]
    pub fn config(&self) -> LogConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the settings; the next write call sees the new values.
    pub fn set_config(&self, config: LogConfig) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Snapshot of the destination for `path` as the caller spelled it.
    #[must_use]
    pub fn snapshot(&self, path: impl AsRef<Path>) -> Option<DestinationSnapshot> {
        let key = Registry::canonical_key(path.as_ref()).ok()?;
        self.registry.snapshot(&key)
    }

    /// Write `message` to the logical log file `path`.
    ///
    /// `mode` is `None` to use the path's established mode (or
    /// [`WriteMode::Single`] for a new path).
    ///
    /// # Errors
    ///
    /// Returns [`LogError::WriteModeConflict`] when `mode` is explicit and
    /// differs from the mode `path` was first written with. No other error
    /// is returned.
    pub fn write(
        &self,
        path: impl AsRef<Path>,
        tag: &str,
        message: &str,
        mode: Option<WriteMode>,
    ) -> Result<WriteOutcome, LogError> {
        let path = path.as_ref();
        let config = self.config();

        let key = match Registry::canonical_key(path) {
            Ok(key) => key,
            Err(source) => {
                return Ok(self.io_failed(&LogError::Io {
                    path: path.to_path_buf(),
                    source,
                }));
            }
        };

        if let SpaceCheck::Low { available_kb } =
            check_free_space(self.probe.as_ref(), &key, config.write_log_free_space_kb)
        {
            debug!(
                path = %key.display(),
                available_kb,
                floor_kb = config.write_log_free_space_kb,
                "log volume low on space; write skipped"
            );
            return Ok(WriteOutcome::SkippedLowSpace { available_kb });
        }

        let slot = self.registry.slot(&key);
        let mut guard = slot.lock();
        // Stamped under the path lock so file order matches timestamp order.
        let now = Local::now();
        let line = format_line(
            &format_timestamp(&now),
            tag,
            &current_thread_label(),
            message,
        );
        let result = guard
            .resolve_target(mode, line.len() as u64, config.max_file_bytes(), &now)
            .and_then(|dest| dest.append_and_maybe_flush(line, config.collect_log_size));
        drop(guard);
        if result.is_err() {
            self.registry.release_if_vacant(slot);
        }

        match result {
            Ok(FlushDecision::Held { pending }) => Ok(WriteOutcome::Buffered { pending }),
            Ok(FlushDecision::Flushed { target, bytes }) => {
                Ok(WriteOutcome::Flushed { target, bytes })
            }
            Err(err) if err.is_io() => Ok(self.io_failed(&err)),
            Err(err) => Err(err),
        }
    }

    /// Flush every buffered message to disk. Call once before the host exits.
    /// Failures are reported on the console and listed in the report.
    pub fn flush_all_pending(&self) -> FlushReport {
        let report = self.registry.flush_all_pending();
        for (_, err) in &report.failures {
            self.report(err);
        }
        debug!(
            destinations = report.flushed.len(),
            bytes = report.bytes(),
            failures = report.failures.len(),
            "flushed all pending log buffers"
        );
        report
    }

    fn io_failed(&self, err: &LogError) -> WriteOutcome {
        self.report(err);
        WriteOutcome::IoFailed {
            path: err.path().to_path_buf(),
            code: err.code(),
            reason: err.to_string(),
        }
    }

    fn report(&self, err: &LogError) {
        warn!(code = err.code().code(), error = %err, "log file write failed");
        let max_chars = self.config().log_max_length;
        for line in console::error_chain_lines(err) {
            console::print(console::LogLevel::Error, SELF_TAG, &line, max_chars);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::FixedSpaceProbe;
    use crate::test_support::{capture, console_events};
    use std::fs;
    use tempfile::TempDir;

    fn roomy_writer(config: LogConfig) -> LogWriter {
        LogWriter::with_probe(config, FixedSpaceProbe(u64::MAX))
    }

    #[test]
    fn line_format_matches_layout() {
        let line = format_line("2023-03-09_11:15:15", "Main", "worker-1", "hello");
        assert_eq!(
            line,
            "2023-03-09_11:15:15 Main <Thread name:worker-1>: hello \n"
        );
    }

    #[test]
    fn thread_label_prefers_name() {
        let label = std::thread::Builder::new()
            .name("uploader".to_string())
            .spawn(current_thread_label)
            .expect("spawn")
            .join()
            .expect("join");
        assert_eq!(label, "uploader");
    }

    #[test]
    fn single_write_lands_immediately() {
        let dir = TempDir::new().expect("temp dir");
        let writer = roomy_writer(LogConfig::default());
        let path = dir.path().join("app.log");

        let outcome = writer
            .write(&path, "Main", "started", None)
            .expect("write");
        let WriteOutcome::Flushed { target, bytes } = outcome else {
            panic!("expected a flush, got {outcome:?}");
        };

        let content = fs::read_to_string(&target).expect("read");
        assert_eq!(content.len() as u64, bytes);
        assert!(content.contains(" Main <Thread name:"));
        assert!(content.ends_with(">: started \n"));
    }

    #[test]
    fn low_space_skips_without_registry_entry() {
        let dir = TempDir::new().expect("temp dir");
        let writer = LogWriter::with_probe(LogConfig::default(), FixedSpaceProbe(5));
        let path = dir.path().join("logs/app.log");

        let outcome = writer.write(&path, "Main", "dropped", None).expect("write");
        assert_eq!(outcome, WriteOutcome::SkippedLowSpace { available_kb: 5 });
        assert!(writer.registry().is_empty());
        assert!(!dir.path().join("logs").exists());
    }

    #[test]
    fn config_changes_apply_to_next_write() {
        let dir = TempDir::new().expect("temp dir");
        let writer = roomy_writer(LogConfig {
            collect_log_size: 100,
            ..LogConfig::default()
        });
        let path = dir.path().join("batch.log");

        for _ in 0..3 {
            let outcome = writer
                .write(&path, "T", "m", Some(WriteMode::Collect))
                .expect("write");
            assert!(!outcome.flushed());
        }

        writer.set_config(LogConfig {
            collect_log_size: 4,
            ..writer.config()
        });
        let outcome = writer
            .write(&path, "T", "m", Some(WriteMode::Collect))
            .expect("write");
        assert!(outcome.flushed());
    }

    #[test]
    fn io_failure_is_an_outcome_not_an_error() {
        let dir = TempDir::new().expect("temp dir");
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file, not dir").expect("write blocker");
        let writer = roomy_writer(LogConfig::default());

        let outcome = writer
            .write(blocker.join("app.log"), "T", "m", None)
            .expect("io failures are swallowed");
        assert!(matches!(
            outcome,
            WriteOutcome::IoFailed {
                code: ErrorCode::LogFileCreateFailed,
                ..
            }
        ));
        assert!(writer.registry().is_empty());
    }

    #[test]
    fn io_failure_is_reported_on_console_channel() {
        let dir = TempDir::new().expect("temp dir");
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file, not dir").expect("write blocker");
        let writer = roomy_writer(LogConfig::default());

        let (outcome, events) = capture(|| writer.write(blocker.join("app.log"), "T", "m", None));
        assert!(matches!(outcome, Ok(WriteOutcome::IoFailed { .. })));

        let console = console_events(&events);
        assert_eq!(console.len(), 2, "{console:?}");
        assert!(console[0].message.starts_with("=======failed to create log file"));
        assert!(console[0].message.ends_with("======="));
        assert!(console[1].message.starts_with("caused by: "));
        for event in &console {
            assert_eq!(event.level, tracing::Level::ERROR);
            assert_eq!(event.tag.as_deref(), Some(SELF_TAG));
        }
        assert!(
            events
                .iter()
                .any(|e| e.level == tracing::Level::WARN && e.message == "log file write failed")
        );
    }

    #[test]
    fn failed_first_writes_do_not_pin_registry_slots() {
        let dir = TempDir::new().expect("temp dir");
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file, not dir").expect("write blocker");
        let writer = roomy_writer(LogConfig::default());

        for n in 0..50 {
            let outcome = writer
                .write(blocker.join(format!("{n}.log")), "T", "m", None)
                .expect("write");
            assert!(matches!(outcome, WriteOutcome::IoFailed { .. }));
        }
        assert!(writer.registry().is_empty());
        assert_eq!(writer.registry().slot_count(), 0);
    }

    #[test]
    fn dotted_and_plain_spellings_share_a_destination() {
        let dir = TempDir::new().expect("temp dir");
        let writer = roomy_writer(LogConfig::default());
        let absolute = dir.path().join("same.log");
        let dotted = dir.path().join(".").join("same.log");

        writer.write(&absolute, "T", "one", None).expect("write");
        writer.write(&dotted, "T", "two", None).expect("write");

        assert_eq!(writer.registry().len(), 1);
        let snap = writer.snapshot(&absolute).expect("snapshot");
        assert_eq!(snap.flushes, 2);
    }
}
