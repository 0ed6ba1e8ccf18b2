//! logspool-core library.
//!
//! File-backed logging with a path-keyed registry: each log path buffers
//! messages, flushes them per its write mode, and rotates to a new
//! timestamped file when the size ceiling is reached. Writes are skipped
//! while the log volume is low on space.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums with stable [`error::ErrorCode`]s in the
//!   library; `anyhow::Result` for config loading.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod console;
pub mod error;
pub mod guard;
pub mod registry;
pub mod rotation;
pub mod timing;
pub mod writer;

#[cfg(test)]
mod test_support;

pub use config::LogConfig;
pub use error::{ErrorCode, LogError};
pub use registry::{DestinationSnapshot, FlushReport, WriteMode};
pub use writer::{LogWriter, WriteOutcome};
