//! Media Time and Clock Abstractions
//!
//! Positions and durations handed across the bridge are rational
//! `(value, timescale)` pairs, the same representation platform media
//! frameworks use. Comparisons are exact: two times are equal when their
//! ratios are equal, regardless of timescale.
//!
//! The [`Clock`] trait abstracts wall-clock time so persisted timestamps can
//! be stamped deterministically in tests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, Sub};

/// Timescale used when converting from seconds.
///
/// 600 divides evenly into the common video frame rates and gives
/// sub-frame precision for audio positions.
pub const PREFERRED_TIMESCALE: i32 = 600;

/// Rational media time.
///
/// A time with a non-positive timescale is *invalid*; invalid times never
/// compare equal to valid ones and sort before them.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct MediaTime {
    pub value: i64,
    pub timescale: i32,
}

impl MediaTime {
    pub const ZERO: MediaTime = MediaTime {
        value: 0,
        timescale: PREFERRED_TIMESCALE,
    };

    pub const INVALID: MediaTime = MediaTime {
        value: 0,
        timescale: 0,
    };

    pub fn new(value: i64, timescale: i32) -> Self {
        Self { value, timescale }
    }

    /// Convert seconds into a time at [`PREFERRED_TIMESCALE`], rounding to
    /// the nearest tick. Non-finite input yields [`MediaTime::INVALID`].
    pub fn from_seconds(seconds: f64) -> Self {
        Self::from_seconds_with_timescale(seconds, PREFERRED_TIMESCALE)
    }

    pub fn from_seconds_with_timescale(seconds: f64, timescale: i32) -> Self {
        if !seconds.is_finite() || timescale <= 0 {
            return Self::INVALID;
        }
        let value = (seconds * timescale as f64).round();
        if value > i64::MAX as f64 || value < i64::MIN as f64 {
            return Self::INVALID;
        }
        Self {
            value: value as i64,
            timescale,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.timescale > 0
    }

    /// Seconds as a float, for display and host APIs only. Never compare
    /// the result for equality.
    pub fn seconds(&self) -> f64 {
        if !self.is_valid() {
            return f64::NAN;
        }
        self.value as f64 / self.timescale as f64
    }

    /// Re-express this time in another timescale, rounding half away from zero.
    pub fn convert_scale(&self, timescale: i32) -> Self {
        if !self.is_valid() || timescale <= 0 {
            return Self::INVALID;
        }
        if timescale == self.timescale {
            return *self;
        }
        let numerator = self.value as i128 * timescale as i128;
        let denominator = self.timescale as i128;
        let half = denominator / 2;
        let scaled = if numerator >= 0 {
            (numerator + half) / denominator
        } else {
            (numerator - half) / denominator
        };
        Self {
            value: clamp_i64(scaled),
            timescale,
        }
    }

    pub fn max(self, other: Self) -> Self {
        if self >= other {
            self
        } else {
            other
        }
    }

    pub fn min(self, other: Self) -> Self {
        if self <= other {
            self
        } else {
            other
        }
    }

    fn combine(self, other: Self, op: impl Fn(i128, i128) -> i128) -> Self {
        if !self.is_valid() || !other.is_valid() {
            return Self::INVALID;
        }
        if self.timescale == other.timescale {
            return Self {
                value: clamp_i64(op(self.value as i128, other.value as i128)),
                timescale: self.timescale,
            };
        }
        let common = lcm(self.timescale as i64, other.timescale as i64);
        // Fall back to the finer scale when the exact common one overflows.
        if common > i32::MAX as i64 {
            let scale = self.timescale.max(other.timescale);
            return self.convert_scale(scale).combine(other.convert_scale(scale), op);
        }
        let lhs = self.value as i128 * (common / self.timescale as i64) as i128;
        let rhs = other.value as i128 * (common / other.timescale as i64) as i128;
        Self {
            value: clamp_i64(op(lhs, rhs)),
            timescale: common as i32,
        }
    }
}

impl Add for MediaTime {
    type Output = MediaTime;

    fn add(self, rhs: Self) -> Self::Output {
        self.combine(rhs, |a, b| a + b)
    }
}

impl Sub for MediaTime {
    type Output = MediaTime;

    fn sub(self, rhs: Self) -> Self::Output {
        self.combine(rhs, |a, b| a - b)
    }
}

impl PartialEq for MediaTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MediaTime {}

impl PartialOrd for MediaTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MediaTime {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_valid(), other.is_valid()) {
            (false, false) => Ordering::Equal,
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
            (true, true) => {
                let lhs = self.value as i128 * other.timescale as i128;
                let rhs = other.value as i128 * self.timescale as i128;
                lhs.cmp(&rhs)
            }
        }
    }
}

impl Hash for MediaTime {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if !self.is_valid() {
            return state.write_u8(0);
        }
        let divisor = gcd(self.value.unsigned_abs(), self.timescale as u64).max(1);
        (self.value / divisor as i64).hash(state);
        (self.timescale as u64 / divisor).hash(state);
    }
}

impl fmt::Debug for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "MediaTime({}/{})", self.value, self.timescale)
        } else {
            write!(f, "MediaTime(invalid)")
        }
    }
}

impl fmt::Display for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{:.3}s", self.seconds())
        } else {
            write!(f, "invalid")
        }
    }
}

/// Seekable interval reported by a media handle. The end is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: MediaTime,
    pub duration: MediaTime,
}

impl TimeRange {
    pub fn new(start: MediaTime, duration: MediaTime) -> Self {
        Self { start, duration }
    }

    pub fn end(&self) -> MediaTime {
        self.start + self.duration
    }

    pub fn contains(&self, time: MediaTime) -> bool {
        time.is_valid() && time >= self.start && time <= self.end()
    }
}

/// Time source trait
///
/// Abstracts system time to enable deterministic testing.
pub trait Clock: Send + Sync {
    /// Get current UTC time
    fn now(&self) -> DateTime<Utc>;
}

/// System clock implementation using actual system time
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

fn clamp_i64(value: i128) -> i64 {
    value.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

fn lcm(a: i64, b: i64) -> i64 {
    let divisor = gcd(a.unsigned_abs(), b.unsigned_abs()).max(1) as i64;
    (a / divisor).saturating_mul(b)
}
