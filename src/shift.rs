//! Shift window evaluation.
//!
//! A shift arrives from the session as `"HH:MM - HH:MM"`. Once parsed into a
//! [`ShiftDefinition`] it can be evaluated against a single sampled
//! [`TimeOfDay`] to produce the [`AttendanceState`] flags that drive the
//! clock-in/clock-out screen.

use std::fmt;

use chrono::{Local, NaiveTime, Timelike};
use thiserror::Error;

/// Grace period after shift end, in seconds (1 hour).
pub const DEFAULT_GRACE_SECONDS: u32 = 3600;

/// Separator between start and end in the shift string.
const SHIFT_SEPARATOR: &str = " - ";

/// Seconds in one calendar day.
const SECONDS_PER_DAY: u32 = 86_400;

/// Shift string could not be turned into a schedule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShiftParseError {
    /// No shift assigned to the user.
    #[error("Shift is not set")]
    Missing,

    /// String does not have the `HH:MM - HH:MM` shape.
    #[error("Invalid shift format '{0}', expected \"HH:MM - HH:MM\"")]
    Format(String),

    /// One side is not a valid clock time.
    #[error("Invalid shift time '{0}'")]
    Time(String),
}

impl ShiftParseError {
    /// Text shown to the user. The details go to the log only.
    pub fn user_message(&self) -> &'static str {
        "Your work shift is not configured correctly. Please contact your administrator."
    }
}

/// Time of day in whole seconds since local midnight, always in `[0, 86399]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u32);

impl TimeOfDay {
    /// Build from seconds since midnight. Returns `None` past 23:59:59.
    pub fn from_seconds(seconds: u32) -> Option<Self> {
        (seconds < SECONDS_PER_DAY).then_some(Self(seconds))
    }

    /// Build from hour, minute and second.
    pub fn from_hms(hour: u32, minute: u32, second: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, second).map(Self::from)
    }

    /// Sample the local wall clock.
    pub fn now_local() -> Self {
        Self::from(Local::now().time())
    }

    /// Seconds since midnight.
    pub fn seconds(self) -> u32 {
        self.0
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(time: NaiveTime) -> Self {
        // Leap seconds are reported as nanosecond overflow, never as second 60.
        Self(time.num_seconds_from_midnight())
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (h, m, s) = (self.0 / 3600, (self.0 / 60) % 60, self.0 % 60);
        write!(f, "{h:02}:{m:02}:{s:02}")
    }
}

/// A daily work shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftDefinition {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl ShiftDefinition {
    /// Parse a `"HH:MM - HH:MM"` shift string.
    ///
    /// Exactly one ` - ` separator is accepted. Each side is trimmed, must be
    /// two-digit `HH:MM`, and is read with zero seconds.
    pub fn parse(raw: &str) -> Result<Self, ShiftParseError> {
        if raw.trim().is_empty() {
            return Err(ShiftParseError::Missing);
        }

        let parts: Vec<&str> = raw.split(SHIFT_SEPARATOR).collect();
        let [start, end] = parts.as_slice() else {
            return Err(ShiftParseError::Format(raw.to_string()));
        };

        Ok(Self {
            start: parse_clock(start)?,
            end: parse_clock(end)?,
        })
    }

    /// Shift start as seconds since midnight.
    pub fn start_seconds(&self) -> u32 {
        self.start.num_seconds_from_midnight()
    }

    /// Shift end as seconds since midnight.
    pub fn end_seconds(&self) -> u32 {
        self.end.num_seconds_from_midnight()
    }

    /// Whether the shift ends after it starts on the same day.
    ///
    /// Overnight and zero-length shifts return false and are never inside the
    /// allowed window.
    pub fn is_same_day(&self) -> bool {
        self.start_seconds() < self.end_seconds()
    }

    /// Evaluate attendance flags at `now`.
    pub fn evaluate(&self, now: TimeOfDay, grace_seconds: u32) -> AttendanceState {
        let s = self.start_seconds();
        let e = self.end_seconds();
        let n = now.seconds();

        AttendanceState {
            is_late: n > s,
            is_before_end_shift: n < e,
            is_allowed_time: s < e && n >= s && n <= e,
            is_after_shift: n >= e,
            is_after_shift_plus_grace: u64::from(n) > u64::from(e) + u64::from(grace_seconds),
        }
    }
}

impl fmt::Display for ShiftDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SHIFT_SEPARATOR}{}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

/// Parse one trimmed `HH:MM` side of a shift string.
fn parse_clock(side: &str) -> Result<NaiveTime, ShiftParseError> {
    let side = side.trim();
    let bytes = side.as_bytes();

    let well_formed = bytes.len() == 5
        && bytes[2] == b':'
        && bytes[..2].iter().all(u8::is_ascii_digit)
        && bytes[3..].iter().all(u8::is_ascii_digit);
    if !well_formed {
        return Err(ShiftParseError::Time(side.to_string()));
    }

    NaiveTime::parse_from_str(&format!("{side}:00"), "%H:%M:%S")
        .map_err(|_| ShiftParseError::Time(side.to_string()))
}

/// Attendance flags derived from a shift and one sampled time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttendanceState {
    /// Past shift start.
    pub is_late: bool,
    /// Before shift end.
    pub is_before_end_shift: bool,
    /// Inside `[start, end]` of a same-day shift.
    pub is_allowed_time: bool,
    /// At or past shift end.
    pub is_after_shift: bool,
    /// Past shift end plus the grace period.
    pub is_after_shift_plus_grace: bool,
}

/// Evaluates shift strings against the current time with a fixed grace period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftWindowEvaluator {
    grace_seconds: u32,
}

impl Default for ShiftWindowEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE_SECONDS)
    }
}

impl ShiftWindowEvaluator {
    pub fn new(grace_seconds: u32) -> Self {
        Self { grace_seconds }
    }

    pub fn grace_seconds(&self) -> u32 {
        self.grace_seconds
    }

    /// Parse `shift` and evaluate it at `now`.
    pub fn evaluate(&self, shift: &str, now: TimeOfDay) -> Result<AttendanceState, ShiftParseError> {
        evaluate(shift, now, self.grace_seconds)
    }
}

/// Parse `shift` and evaluate it at `now` with the given grace period.
pub fn evaluate(shift: &str, now: TimeOfDay, grace_seconds: u32) -> Result<AttendanceState, ShiftParseError> {
    let definition = ShiftDefinition::parse(shift)?;
    Ok(definition.evaluate(now, grace_seconds))
}
