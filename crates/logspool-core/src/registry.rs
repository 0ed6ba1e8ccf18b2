//! Path-keyed registry of log destinations.
//!
//! Each logical log path maps to one [`Destination`]: the physical file
//! currently receiving appends, the write mode fixed on first use, and the
//! messages buffered since the last flush.
//!
//! # Locking
//!
//! The registry map is behind one mutex that is held only long enough to
//! find or insert the per-path slot. Everything else for a path (rotation
//! check, mode check, buffering, flushing) runs under that slot's own mutex,
//! so writes to one path are serialized while different paths proceed in
//! parallel.
//!
//! A slot stays empty until its first successful resolution. A first write
//! whose file creation fails therefore leaves no destination behind.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write as IoWrite};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LogError;
use crate::rotation::{self, RotationReason};

// ---------------------------------------------------------------------------
// Write mode
// ---------------------------------------------------------------------------

/// How a destination decides when buffered text reaches disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Every message is appended as soon as it is written.
    #[default]
    Single,
    /// Messages are held in memory until the batch size is reached.
    Collect,
}

impl WriteMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Collect => "collect",
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "collect" => Ok(Self::Collect),
            other => Err(format!("unknown write mode '{other}' (expected single|collect)")),
        }
    }
}

// ---------------------------------------------------------------------------
// Destination
// ---------------------------------------------------------------------------

/// Buffering state for one logical log path.
#[derive(Debug)]
pub struct Destination {
    target: PathBuf,
    mode: WriteMode,
    pending: Vec<String>,
    pending_bytes: u64,
    flushes: u64,
}

/// What happened to a message after it was buffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushDecision {
    /// The message is held in memory with `pending` messages in total.
    Held { pending: usize },
    /// The buffer was appended to `target` in one write of `bytes` bytes.
    Flushed { target: PathBuf, bytes: u64 },
}

impl Destination {
    fn new(target: PathBuf, mode: WriteMode) -> Self {
        Self {
            target,
            mode,
            pending: Vec::new(),
            pending_bytes: 0,
            flushes: 0,
        }
    }

    /// Physical file currently receiving appends.
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    #[must_use]
    pub const fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Buffered messages in flush order.
    #[must_use]
    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    #[must_use]
    pub const fn pending_bytes(&self) -> u64 {
        self.pending_bytes
    }

    /// Number of physical appends performed so far.
    #[must_use]
    pub const fn flushes(&self) -> u64 {
        self.flushes
    }

    /// Buffer `line` and flush when the mode or batch size calls for it.
    ///
    /// A flush happens in [`WriteMode::Single`], or once `collect_size`
    /// messages are pending in [`WriteMode::Collect`].
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Io`] if the flush fails. The buffer, including
    /// `line`, is kept for the next attempt.
    pub fn append_and_maybe_flush(
        &mut self,
        line: String,
        collect_size: usize,
    ) -> Result<FlushDecision, LogError> {
        self.pending_bytes = self.pending_bytes.saturating_add(line.len() as u64);
        self.pending.push(line);

        if self.mode == WriteMode::Single || self.pending.len() >= collect_size {
            let bytes = self.flush()?;
            Ok(FlushDecision::Flushed {
                target: self.target.clone(),
                bytes,
            })
        } else {
            Ok(FlushDecision::Held {
                pending: self.pending.len(),
            })
        }
    }

    /// Append every pending message to the target as a single write and
    /// clear the buffer. Returns the number of bytes written; an empty
    /// buffer writes nothing and returns 0.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Io`] on open or write failure; the buffer is
    /// left untouched.
    pub fn flush(&mut self) -> Result<u64, LogError> {
        if self.pending.is_empty() {
            return Ok(0);
        }

        let batch = self.pending.concat();
        append_all(&self.target, batch.as_bytes()).map_err(|source| LogError::Io {
            path: self.target.clone(),
            source,
        })?;

        self.pending.clear();
        self.pending_bytes = 0;
        self.flushes += 1;
        debug!(
            target_file = %self.target.display(),
            bytes = batch.len(),
            "flushed log buffer"
        );
        Ok(batch.len() as u64)
    }

    fn retarget(&mut self, target: PathBuf) {
        self.target = target;
    }

    fn snapshot(&self) -> DestinationSnapshot {
        DestinationSnapshot {
            target: self.target.clone(),
            mode: self.mode,
            pending_len: self.pending.len(),
            pending_bytes: self.pending_bytes,
            flushes: self.flushes,
        }
    }
}

fn append_all(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(bytes)?;
    file.flush()
}

/// Point-in-time copy of a destination's observable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DestinationSnapshot {
    pub target: PathBuf,
    pub mode: WriteMode,
    pub pending_len: usize,
    pub pending_bytes: u64,
    pub flushes: u64,
}

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

type SlotState = Arc<Mutex<Option<Destination>>>;

/// Handle on one path's slot, obtained from [`Registry::slot`].
#[derive(Debug, Clone)]
pub struct PathSlot {
    path: PathBuf,
    state: SlotState,
}

impl PathSlot {
    /// Canonical path this slot is keyed by.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Enter the path's critical section.
    pub fn lock(&self) -> SlotGuard<'_> {
        SlotGuard {
            path: &self.path,
            state: lock_ignoring_poison(&self.state),
        }
    }
}

/// Exclusive access to one path's destination for the duration of a write.
pub struct SlotGuard<'a> {
    path: &'a Path,
    state: MutexGuard<'a, Option<Destination>>,
}

impl SlotGuard<'_> {
    /// Return the destination ready to receive `incoming_len` more bytes.
    ///
    /// Creates the destination on first use with `requested` (or
    /// [`WriteMode::Single`] when `None`), rotates to a fresh timestamped
    /// file when the current one is missing or would exceed `ceiling`, then
    /// checks that an explicit `requested` mode matches the established one.
    /// Rotation keeps the mode and pending buffer.
    ///
    /// # Errors
    ///
    /// - [`LogError::Create`] if a new target file cannot be created; the
    ///   previous state is kept.
    /// - [`LogError::WriteModeConflict`] if `requested` is explicit and
    ///   differs from the established mode; nothing is buffered.
    pub fn resolve_target(
        &mut self,
        requested: Option<WriteMode>,
        incoming_len: u64,
        ceiling: u64,
        now: &DateTime<Local>,
    ) -> Result<&mut Destination, LogError> {
        let path = self.path;
        let state: &mut Option<Destination> = &mut self.state;
        let dest = match state {
            Some(dest) => {
                let reason = rotation::needs_rotation(
                    Some(&dest.target),
                    dest.pending_bytes,
                    incoming_len,
                    ceiling,
                );
                if let Some(reason) = reason {
                    let target = rotation::create_target(path, now)?;
                    log_rotation(path, &target, reason);
                    dest.retarget(target);
                }
                dest
            }
            None => {
                let target = rotation::create_target(path, now)?;
                log_rotation(path, &target, RotationReason::NoTarget);
                state.insert(Destination::new(target, requested.unwrap_or_default()))
            }
        };

        if let Some(requested) = requested
            && requested != dest.mode
        {
            return Err(LogError::WriteModeConflict {
                path: path.to_path_buf(),
                established: dest.mode,
                requested,
            });
        }

        Ok(dest)
    }

    /// The destination, if this path has been written before.
    #[must_use]
    pub fn destination(&self) -> Option<&Destination> {
        self.state.as_ref()
    }
}

fn log_rotation(path: &Path, target: &Path, reason: RotationReason) {
    debug!(
        path = %path.display(),
        target_file = %target.display(),
        ?reason,
        "opened new log file"
    );
}

fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Outcome of [`Registry::flush_all_pending`].
#[derive(Debug, Default)]
pub struct FlushReport {
    /// Paths whose buffers were written, with the bytes written for each.
    pub flushed: Vec<(PathBuf, u64)>,
    /// Paths whose buffers could not be written; their buffers are kept.
    pub failures: Vec<(PathBuf, LogError)>,
}

impl FlushReport {
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.flushed.iter().map(|(_, bytes)| bytes).sum()
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Process-wide map from canonical log path to destination state.
#[derive(Debug, Default)]
pub struct Registry {
    slots: Mutex<BTreeMap<PathBuf, SlotState>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Absolute form of `path` used as the registry key. Relative paths are
    /// resolved against the current directory; symlinks are not followed.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined.
    pub fn canonical_key(path: &Path) -> io::Result<PathBuf> {
        std::path::absolute(path)
    }

    /// Find or create the slot for an already-canonical `path`.
    pub fn slot(&self, path: &Path) -> PathSlot {
        let mut slots = lock_ignoring_poison(&self.slots);
        let state = slots
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone();
        PathSlot {
            path: path.to_path_buf(),
            state,
        }
    }

    /// Remove `slot` from the map if it never received a destination and no
    /// other caller holds it. Called after a failed first write so bad paths
    /// do not accumulate empty slots.
    pub fn release_if_vacant(&self, slot: PathSlot) {
        let mut slots = lock_ignoring_poison(&self.slots);
        // One reference in the map, one in `slot`.
        let vacant =
            Arc::strong_count(&slot.state) == 2 && lock_ignoring_poison(&slot.state).is_none();
        if vacant {
            slots.remove(&slot.path);
        }
    }

    fn filled_slots(&self) -> Vec<(PathBuf, SlotState)> {
        lock_ignoring_poison(&self.slots)
            .iter()
            .map(|(path, state)| (path.clone(), Arc::clone(state)))
            .collect()
    }

    /// Snapshot of the destination for `path`, if one exists.
    #[must_use]
    pub fn snapshot(&self, path: &Path) -> Option<DestinationSnapshot> {
        let state = lock_ignoring_poison(&self.slots).get(path).cloned()?;
        let guard = lock_ignoring_poison(&state);
        guard.as_ref().map(Destination::snapshot)
    }

    /// Canonical paths that have a live destination, in sorted order.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.filled_slots()
            .into_iter()
            .filter(|(_, state)| lock_ignoring_poison(state).is_some())
            .map(|(path, _)| path)
            .collect()
    }

    /// Number of map entries, including slots still waiting for their
    /// first destination.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        lock_ignoring_poison(&self.slots).len()
    }

    /// Number of live destinations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append every non-empty buffer to its target and clear it.
    ///
    /// Hosts call this once before exit; buffered collect-mode messages are
    /// otherwise lost. Each path is flushed under its own lock, so this may
    /// run while other threads keep writing.
    pub fn flush_all_pending(&self) -> FlushReport {
        let mut report = FlushReport::default();

        for (path, state) in self.filled_slots() {
            let mut guard = lock_ignoring_poison(&state);
            let Some(dest) = guard.as_mut() else {
                continue;
            };
            if dest.pending.is_empty() {
                continue;
            }
            match dest.flush() {
                Ok(bytes) => report.flushed.push((path, bytes)),
                Err(err) => report.failures.push((path, err)),
            }
        }

        report
    }
}
