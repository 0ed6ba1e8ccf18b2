//! Size-based rotation of physical log files.
//!
//! A caller names a logical file such as `logs/app.log`. The bytes actually
//! land in `logs/app_<yyyy-MM-dd_HH:mm:ss>.log`, and a new timestamped file
//! replaces it whenever the projected size would cross the ceiling.
//!
//! # Invariants
//!
//! - A rotated target is created empty with `create_new`, so an existing file
//!   is never truncated or shared between two destinations.
//! - Two rotations inside the same second get distinct names
//!   (`app_<ts>.log`, `app_<ts>-1.log`, ...).
//! - An empty target is never rotated away; a fresh file cannot hold more.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::LogError;

/// `strftime` pattern for file-name and line timestamps (`yyyy-MM-dd_HH:mm:ss`).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

const MAX_COLLISION_SUFFIX: u32 = 1000;

/// Why a destination needs a new target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationReason {
    /// First write to this path in the process.
    NoTarget,
    /// The current target was deleted or cannot be stat'd.
    TargetMissing,
    /// Appending would push the target past the ceiling.
    SizeCeiling { projected: u64, ceiling: u64 },
}

/// Render `at` in [`TIMESTAMP_FORMAT`].
#[must_use]
pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Insert `_<stamp>` between a file name's base and its last extension.
///
/// `app.log` becomes `app_<stamp>.log`; `trace.2.txt` becomes
/// `trace.2_<stamp>.txt`; a name with no dot gets the stamp appended.
#[must_use]
pub fn timestamped_name(file_name: &str, stamp: &str) -> String {
    match file_name.rfind('.') {
        Some(dot) => {
            let (base, ext) = file_name.split_at(dot);
            format!("{base}_{stamp}{ext}")
        }
        None => format!("{file_name}_{stamp}"),
    }
}

/// Decide whether the destination must move to a new file before
/// `incoming_len` more bytes are buffered.
///
/// `target` is the current physical file, `None` for an unseen path.
#[must_use]
pub fn needs_rotation(
    target: Option<&Path>,
    pending_bytes: u64,
    incoming_len: u64,
    ceiling: u64,
) -> Option<RotationReason> {
    let Some(target) = target else {
        return Some(RotationReason::NoTarget);
    };

    let Ok(meta) = fs::metadata(target) else {
        return Some(RotationReason::TargetMissing);
    };
    if !meta.is_file() {
        return Some(RotationReason::TargetMissing);
    }

    let current = meta.len();
    let projected = current
        .saturating_add(pending_bytes)
        .saturating_add(incoming_len);
    if current > 0 && projected > ceiling {
        return Some(RotationReason::SizeCeiling { projected, ceiling });
    }

    None
}

/// Create a new, empty target file for the logical path `requested`.
///
/// Parent directories are created as needed.
///
/// # Errors
///
/// Returns [`LogError::Create`] if the directory or file cannot be created.
pub fn create_target(requested: &Path, at: &DateTime<Local>) -> Result<PathBuf, LogError> {
    let parent = requested.parent().unwrap_or_else(|| Path::new(""));
    let file_name = requested
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| LogError::Create {
            path: requested.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "log path has no file name"),
        })?;

    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent).map_err(|source| LogError::Create {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let stamp = format_timestamp(at);
    for attempt in 0..=MAX_COLLISION_SUFFIX {
        let stamp = if attempt == 0 {
            stamp.clone()
        } else {
            format!("{stamp}-{attempt}")
        };
        let candidate = parent.join(timestamped_name(&file_name, &stamp));

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(_) => return Ok(candidate),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
            Err(source) => {
                return Err(LogError::Create {
                    path: candidate,
                    source,
                });
            }
        }
    }

    Err(LogError::Create {
        path: requested.to_path_buf(),
        source: io::Error::new(
            io::ErrorKind::AlreadyExists,
            "every timestamped name for this second is taken",
        ),
    })
}
