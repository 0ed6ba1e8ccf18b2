//! Ad-hoc timing helpers that report through the console channel.

use std::time::{Duration, Instant};

use crate::console::{self, LogLevel};

/// Report the time since `since` under `tag` and return the current instant,
/// so successive calls measure consecutive stages:
///
/// ```
/// let t = std::time::Instant::now();
/// let t = logspool_core::timing::step(t, "load");
/// let _ = logspool_core::timing::step(t, "parse");
/// ```
pub fn step(since: Instant, tag: &str) -> Instant {
    let now = Instant::now();
    let elapsed = now.saturating_duration_since(since);
    console::print(
        LogLevel::Info,
        tag,
        &format!("[{tag}] took {}", format_elapsed(elapsed)),
        0,
    );
    now
}

/// Run `f`, reporting when it starts and how long it took.
pub fn interval<R>(tag: &str, f: impl FnOnce() -> R) -> R {
    let started = Instant::now();
    console::print(LogLevel::Info, tag, "timer started", 0);
    let result = f();
    console::print(
        LogLevel::Info,
        tag,
        &format!("total {}", format_elapsed(started.elapsed())),
        0,
    );
    result
}

/// Human-scale rendering: `µs` below a millisecond, `ms` below a second.
#[must_use]
pub fn format_elapsed(duration: Duration) -> String {
    let micros = duration.as_micros();

    if micros >= 1_000_000 {
        let secs = micros / 1_000_000;
        let millis = (micros % 1_000_000) / 1_000;
        format!("{secs}.{millis:03}s")
    } else if micros >= 1_000 {
        let millis = micros / 1_000;
        let rem = micros % 1_000;
        format!("{millis}.{rem:03}ms")
    } else {
        format!("{micros}µs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_returns_later_instant() {
        let start = Instant::now();
        let next = step(start, "stage");
        assert!(next >= start);
    }

    #[test]
    fn interval_passes_result_through() {
        let value = interval("compute", || 6 * 7);
        assert_eq!(value, 42);
    }

    #[test]
    fn elapsed_formatting_picks_unit() {
        assert_eq!(format_elapsed(Duration::from_micros(250)), "250µs");
        assert_eq!(format_elapsed(Duration::from_micros(1_500)), "1.500ms");
        assert_eq!(format_elapsed(Duration::from_millis(2_050)), "2.050s");
    }
}
