//! Interval timer that accumulates samples
//!
//! A sample is the interval between a [`ElapsedTimer::start`] and the
//! following [`ElapsedTimer::stop`]. The timer keeps the running total of all
//! samples since the last reset, the wall-clock window since the first start
//! and the sample count, and derives percentages and averages from them.
//!
//! Every operation reads its [`Clock`] at most once, and every derived value
//! reported together (see [`ElapsedTimer::snapshot`]) is computed against that
//! single timestamp.

use crate::clock::{Clock, SystemClock};
use chrono::{DateTime, Local, TimeDelta};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Time-of-day format used by [`FormatMode::B`]
const TIME_OF_DAY: &str = "%H:%M:%S%.3f";

/// Errors raised by the timer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    #[error("Invalid timer format mode: {0:?} (expected one of a, b, c, d)")]
    InvalidFormat(String),
}

/// Lifecycle phase of an [`ElapsedTimer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    /// Freshly constructed or reset, no sample started yet
    #[default]
    Reset,
    /// A sample is in progress
    Started,
    /// The last sample has been closed
    Stopped,
}

/// Rendering selected by [`ElapsedTimer::format`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatMode {
    /// Total measured milliseconds
    #[default]
    A,
    /// First, start and end timestamps as time of day
    B,
    /// Percentage of the wall-clock window, measured and window milliseconds
    C,
    /// Average sample milliseconds and sample count
    D,
}

impl FromStr for FormatMode {
    type Err = TimerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a" => Ok(FormatMode::A),
            "b" => Ok(FormatMode::B),
            "c" => Ok(FormatMode::C),
            "d" => Ok(FormatMode::D),
            other => Err(TimerError::InvalidFormat(other.to_string())),
        }
    }
}

/// Construction options for an [`ElapsedTimer`]
#[derive(Debug, Clone, Default)]
pub struct TimerConfig {
    /// Start the first sample immediately
    pub start: bool,
    /// Measure [`ElapsedTimer::all`] up to the current time even while stopped
    pub all_from_now: bool,
    /// Tag shown in the summary line
    pub label: Option<String>,
}

impl TimerConfig {
    /// Options for a labelled timer that starts immediately
    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            start: true,
            label: Some(label.into()),
            ..Default::default()
        }
    }
}

/// Every derived timer value, computed from one clock read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub state: RunState,
    /// Accumulated time including the in-progress sample
    pub value: TimeDelta,
    /// Duration of the most recent sample
    pub current: TimeDelta,
    /// Wall-clock window since the first start
    pub all: TimeDelta,
    /// `100 * value / all`, truncated; 0 when the window is empty
    pub percent_all: i64,
    /// `value / count`; zero when no sample completed
    pub average: TimeDelta,
    /// Completed samples
    pub count: u32,
    pub first_time: DateTime<Local>,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
}

/// Stopwatch accumulating elapsed time over several start/stop samples
///
/// # Example
/// ```
/// use chrono::TimeDelta;
/// use export_solution::clock::ManualClock;
/// use export_solution::timer::{ElapsedTimer, TimerConfig};
///
/// let clock = ManualClock::new();
/// let mut timer = ElapsedTimer::with_clock(clock.clone(), TimerConfig::default());
///
/// timer.start();
/// clock.advance(TimeDelta::milliseconds(100));
/// timer.stop();
///
/// assert_eq!(timer.value(), TimeDelta::milliseconds(100));
/// assert_eq!(timer.count(), 1);
/// ```
#[derive(Debug)]
pub struct ElapsedTimer<C: Clock = SystemClock> {
    clock: C,
    state: RunState,
    first_time: DateTime<Local>,
    start_time: DateTime<Local>,
    end_time: DateTime<Local>,
    accumulated: TimeDelta,
    count: u32,
    all_from_now: bool,
    label: Option<String>,
}

impl ElapsedTimer<SystemClock> {
    /// Create an idle (reset) timer on the system clock
    pub fn new() -> Self {
        Self::with_config(TimerConfig::default())
    }

    /// Create a timer on the system clock that is already measuring
    pub fn started() -> Self {
        Self::with_config(TimerConfig {
            start: true,
            ..Default::default()
        })
    }

    /// Create a running, labelled timer on the system clock
    pub fn with_label(label: impl Into<String>) -> Self {
        Self::with_config(TimerConfig::labelled(label))
    }

    pub fn with_config(config: TimerConfig) -> Self {
        Self::with_clock(SystemClock, config)
    }
}

impl Default for ElapsedTimer<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> ElapsedTimer<C> {
    /// Create a timer reading time from `clock`
    pub fn with_clock(clock: C, config: TimerConfig) -> Self {
        let now = clock.now();
        let mut timer = Self {
            clock,
            state: RunState::Reset,
            first_time: now,
            start_time: now,
            end_time: now,
            accumulated: TimeDelta::zero(),
            count: 0,
            all_from_now: config.all_from_now,
            label: config.label,
        };
        if config.start {
            timer.start_at(now);
        }
        timer
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = Some(label.into());
    }

    pub fn all_from_now(&self) -> bool {
        self.all_from_now
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Started
    }

    /// Number of completed samples
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Time of the first start after the last reset
    pub fn first_time(&self) -> DateTime<Local> {
        self.first_time
    }

    /// Time of the most recent start
    pub fn start_time(&self) -> DateTime<Local> {
        self.start_time
    }

    /// Open a sample. Ignored while a sample is already running.
    pub fn start(&mut self) {
        let now = self.clock.now();
        self.start_at(now);
    }

    /// Close the running sample and return the total accumulated time.
    ///
    /// Ignored (apart from marking the timer stopped) when no sample is running.
    pub fn stop(&mut self) -> TimeDelta {
        let now = self.clock.now();
        self.stop_at(now);
        self.value_at(now)
    }

    /// Clear all samples, optionally opening a new one at the same instant
    pub fn reset(&mut self, start: bool) {
        let now = self.clock.now();
        self.state = RunState::Reset;
        self.first_time = now;
        self.start_time = now;
        self.end_time = now;
        self.accumulated = TimeDelta::zero();
        self.count = 0;
        tracing::trace!(label = ?self.label, start, "timer reset");
        if start {
            self.start_at(now);
        }
    }

    /// Equivalent to `reset(true)`
    pub fn restart(&mut self) {
        self.reset(true);
    }

    /// Close the running sample and open the next one at the same instant.
    ///
    /// Returns the duration of the closed sample. When no sample is running
    /// this only starts one and returns the duration of the previous sample.
    pub fn add_sample(&mut self) -> TimeDelta {
        let now = self.clock.now();
        if self.state != RunState::Started {
            let previous = self.current_at(now);
            self.start_at(now);
            return previous;
        }
        self.stop_at(now);
        let closed = self.current_at(now);
        self.start_at(now);
        closed
    }

    /// Total measured time, including the in-progress sample
    pub fn value(&self) -> TimeDelta {
        self.value_at(self.clock.now())
    }

    /// Duration of the most recent (or running) sample
    pub fn current(&self) -> TimeDelta {
        self.current_at(self.clock.now())
    }

    /// Wall-clock window since the first start
    pub fn all(&self) -> TimeDelta {
        self.all_at(self.clock.now())
    }

    /// End of the most recent sample, or now while running
    pub fn end_time(&self) -> DateTime<Local> {
        self.end_time_at(self.clock.now())
    }

    /// Measured time as an integer percentage of the wall-clock window
    pub fn percent_all(&self) -> i64 {
        let now = self.clock.now();
        percent(self.value_at(now), self.all_at(now))
    }

    /// Mean sample duration
    pub fn average(&self) -> TimeDelta {
        self.average_at(self.clock.now())
    }

    /// All derived values against a single clock read
    pub fn snapshot(&self) -> TimerSnapshot {
        self.snapshot_at(self.clock.now())
    }

    /// All derived values as they would be at `now`
    pub fn snapshot_at(&self, now: DateTime<Local>) -> TimerSnapshot {
        let value = self.value_at(now);
        let all = self.all_at(now);
        TimerSnapshot {
            state: self.state,
            value,
            current: self.current_at(now),
            all,
            percent_all: percent(value, all),
            average: self.average_at(now),
            count: self.count,
            first_time: self.first_time,
            start_time: self.start_time,
            end_time: self.end_time_at(now),
        }
    }

    /// Render the timer in the mode named by `mode` (`"a"` to `"d"`)
    pub fn format(&self, mode: &str) -> Result<String, TimerError> {
        let mode = mode.parse::<FormatMode>()?;
        Ok(self.format_mode(mode))
    }

    pub fn format_mode(&self, mode: FormatMode) -> String {
        let snap = self.snapshot();
        match mode {
            FormatMode::A => format!("{}", snap.value.num_milliseconds()),
            FormatMode::B => format!(
                "{} | {} | {}",
                snap.first_time.format(TIME_OF_DAY),
                snap.start_time.format(TIME_OF_DAY),
                snap.end_time.format(TIME_OF_DAY)
            ),
            FormatMode::C => format!(
                "{:02}% - {} of {}",
                snap.percent_all,
                snap.value.num_milliseconds(),
                snap.all.num_milliseconds()
            ),
            FormatMode::D => format!(
                "{} [{} samples]",
                snap.average.num_milliseconds(),
                snap.count
            ),
        }
    }

    /// One-line human-readable summary of the timer
    pub fn summary(&self) -> String {
        let snap = self.snapshot();
        format!(
            "{} => All: {:05} , Value: {:05} , Current: {:05}, Stats: {:>3}%, Average: {:05} [{} samples]",
            self.label.as_deref().unwrap_or(""),
            snap.all.num_milliseconds(),
            snap.value.num_milliseconds(),
            snap.current.num_milliseconds(),
            snap.percent_all,
            snap.average.num_milliseconds(),
            snap.count
        )
    }

    /// Print [`summary`](Self::summary) to stdout
    pub fn display(&self) {
        println!("{}", self.summary());
    }

    fn start_at(&mut self, now: DateTime<Local>) {
        if self.state == RunState::Started {
            return;
        }
        self.start_time = now;
        if self.state == RunState::Reset {
            self.first_time = now;
        }
        self.state = RunState::Started;
    }

    fn stop_at(&mut self, now: DateTime<Local>) {
        if self.state == RunState::Started {
            self.end_time = now;
            self.accumulated = self.accumulated + (self.end_time - self.start_time);
            self.count += 1;
            tracing::trace!(
                label = ?self.label,
                samples = self.count,
                total_ms = self.accumulated.num_milliseconds(),
                "timer sample closed"
            );
        }
        self.state = RunState::Stopped;
    }

    fn end_time_at(&self, now: DateTime<Local>) -> DateTime<Local> {
        if self.state == RunState::Started {
            now
        } else {
            self.end_time
        }
    }

    fn current_at(&self, now: DateTime<Local>) -> TimeDelta {
        self.end_time_at(now) - self.start_time
    }

    fn value_at(&self, now: DateTime<Local>) -> TimeDelta {
        if self.state == RunState::Started {
            self.accumulated + self.current_at(now)
        } else {
            self.accumulated
        }
    }

    fn all_at(&self, now: DateTime<Local>) -> TimeDelta {
        if !self.all_from_now && self.state != RunState::Started {
            self.end_time - self.first_time
        } else {
            now - self.first_time
        }
    }

    fn average_at(&self, now: DateTime<Local>) -> TimeDelta {
        if self.count == 0 {
            return TimeDelta::zero();
        }
        let mean = nanos(self.value_at(now)) / i128::from(self.count);
        TimeDelta::nanoseconds(i64::try_from(mean).unwrap_or(i64::MAX))
    }
}

impl<C: Clock> fmt::Display for ElapsedTimer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_mode(FormatMode::A))
    }
}

fn nanos(delta: TimeDelta) -> i128 {
    i128::from(delta.num_seconds()) * 1_000_000_000 + i128::from(delta.subsec_nanos())
}

fn percent(value: TimeDelta, all: TimeDelta) -> i64 {
    let total = nanos(all);
    if total == 0 {
        return 0;
    }
    i64::try_from(100 * nanos(value) / total).unwrap_or(i64::MAX)
}
