//! Wall-clock sources for the interval timer
//!
//! The timer never calls `Local::now()` directly; it asks a [`Clock`]. Production
//! code uses [`SystemClock`], tests drive a [`ManualClock`] by hand and can
//! check how many times the timer looked at it.

use chrono::{DateTime, Local, TimeDelta};
use std::cell::Cell;
use std::rc::Rc;

/// A source of wall-clock timestamps with at least millisecond resolution
pub trait Clock {
    /// Read the current time
    fn now(&self) -> DateTime<Local>;
}

/// Clock backed by the operating system's local time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

#[derive(Debug)]
struct ManualState {
    now: Cell<DateTime<Local>>,
    reads: Cell<usize>,
}

/// Hand-driven clock for deterministic timing
///
/// Clones share the same underlying time, so a test can keep one handle and
/// give another to the timer.
///
/// # Example
/// ```
/// use chrono::TimeDelta;
/// use export_solution::clock::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let before = clock.now();
/// clock.advance(TimeDelta::milliseconds(100));
/// assert_eq!(clock.now() - before, TimeDelta::milliseconds(100));
/// assert_eq!(clock.reads(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    state: Rc<ManualState>,
}

impl ManualClock {
    /// Create a manual clock frozen at the current local time
    pub fn new() -> Self {
        Self::at(Local::now())
    }

    /// Create a manual clock frozen at `start`
    pub fn at(start: DateTime<Local>) -> Self {
        Self {
            state: Rc::new(ManualState {
                now: Cell::new(start),
                reads: Cell::new(0),
            }),
        }
    }

    /// Move the clock forward (or backward, for a negative delta)
    pub fn advance(&self, delta: TimeDelta) {
        self.state.now.set(self.state.now.get() + delta);
    }

    /// Jump to an absolute time
    pub fn set(&self, now: DateTime<Local>) {
        self.state.now.set(now);
    }

    /// Number of times [`Clock::now`] has been called on any clone
    pub fn reads(&self) -> usize {
        self.state.reads.get()
    }

    /// Forget past reads
    pub fn reset_reads(&self) {
        self.state.reads.set(0);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        self.state.reads.set(self.state.reads.get() + 1);
        self.state.now.get()
    }
}
