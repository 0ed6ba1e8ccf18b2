//! Free-space guard.
//!
//! Every write first checks how much room is left on the volume that backs
//! the log directory. Below the configured floor the write is dropped
//! without touching the registry or the filesystem.

use std::io;
use std::path::{Path, PathBuf};

/// Reports available space on the volume holding a directory.
pub trait SpaceProbe: Send + Sync {
    /// Available space in KB for unprivileged writers.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the volume cannot be queried.
    fn available_kb(&self, dir: &Path) -> io::Result<u64>;
}

/// Probe backed by `statvfs`/`GetDiskFreeSpaceEx` through `fs2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSpaceProbe;

impl SpaceProbe for FsSpaceProbe {
    fn available_kb(&self, dir: &Path) -> io::Result<u64> {
        fs2::available_space(dir).map(|bytes| bytes / 1024)
    }
}

/// Probe that always reports the same amount. Useful for hosts that manage
/// quotas themselves, and for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedSpaceProbe(pub u64);

impl SpaceProbe for FixedSpaceProbe {
    fn available_kb(&self, _dir: &Path) -> io::Result<u64> {
        Ok(self.0)
    }
}

/// Result of a free-space check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceCheck {
    Enough { available_kb: u64 },
    Low { available_kb: u64 },
    /// The probe failed; the write is allowed to proceed.
    Unknown,
}

impl SpaceCheck {
    #[must_use]
    pub const fn allows_write(self) -> bool {
        !matches!(self, Self::Low { .. })
    }
}

/// Compare available space near `log_path` against `floor_kb`.
///
/// The log file and its parent directory may not exist yet, so the probe
/// runs against the nearest existing ancestor.
pub fn check_free_space(probe: &dyn SpaceProbe, log_path: &Path, floor_kb: u64) -> SpaceCheck {
    let dir = nearest_existing_dir(log_path);
    match probe.available_kb(&dir) {
        Ok(available_kb) if available_kb < floor_kb => SpaceCheck::Low { available_kb },
        Ok(available_kb) => SpaceCheck::Enough { available_kb },
        Err(err) => {
            tracing::debug!(dir = %dir.display(), error = %err, "free-space probe failed");
            SpaceCheck::Unknown
        }
    }
}

fn nearest_existing_dir(log_path: &Path) -> PathBuf {
    let mut current = log_path.parent();
    while let Some(dir) = current {
        if dir.is_dir() {
            return dir.to_path_buf();
        }
        current = dir.parent();
    }
    PathBuf::from(".")
}
