//! Wall-clock arithmetic for the session timer.
//!
//! Nothing here is advanced by ticks. Every figure is derived from a start
//! instant and "now", so a process that was suspended or killed recovers the
//! exact value on the next read. Pause, stop, skip and tick all go through
//! these functions so they agree on how much time has passed.

use std::sync::atomic::{AtomicU64, Ordering};

/// Whole seconds between `start_ms` and `now_ms` (epoch milliseconds).
///
/// Floors, and saturates at zero if the clock went backwards.
pub fn compute_elapsed(start_ms: u64, now_ms: u64) -> u64 {
    now_ms.saturating_sub(start_ms) / 1000
}

/// Seconds left in a countdown, never negative.
pub fn compute_remaining(session_duration: u64, elapsed: u64) -> u64 {
    session_duration.saturating_sub(elapsed)
}

/// Seconds elapsed in a count-up session, clamped at `cap`.
pub fn compute_countup_elapsed(start_ms: u64, now_ms: u64, cap: u64) -> u64 {
    compute_elapsed(start_ms, now_ms).min(cap)
}

/// Minutes counted toward rewards; any started minute counts.
pub fn completed_minutes(elapsed_secs: u64) -> u64 {
    elapsed_secs.div_ceil(60)
}

/// `MM:SS`, or `H:MM:SS` once an hour is reached.
pub fn format_clock(secs: u64) -> String {
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// A clock that only moves when told to. Used by tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    pub fn advance_secs(&self, secs: u64) {
        self.now_ms.fetch_add(secs * 1000, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set_ms(&self, ms: u64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}
