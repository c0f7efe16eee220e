use std::{
    cmp::Ordering,
    fmt,
    ops::{Add, Sub},
};

/// A time instant expressed as `value` units at `rate` units per second.
///
/// Comparisons cross-multiply instead of rescaling, so `RationalTime::new(12.0, 24.0)`
/// equals `RationalTime::new(15.0, 30.0)` exactly.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct RationalTime {
    /// Time value in units of `1 / rate` seconds.
    pub value: f64,
    /// Units per second; must be finite and > 0 for a valid time.
    pub rate: f64,
}

impl RationalTime {
    /// Build a time from raw value and rate.
    pub const fn new(value: f64, rate: f64) -> Self {
        Self { value, rate }
    }

    /// Sentinel used for "no time" (rate 0).
    pub const fn invalid() -> Self {
        Self {
            value: 0.0,
            rate: 0.0,
        }
    }

    /// `false` for the [`RationalTime::invalid`] sentinel or non-finite components.
    pub fn is_valid(self) -> bool {
        self.value.is_finite() && self.rate.is_finite() && self.rate > 0.0
    }

    /// Same instant expressed at `rate`.
    pub fn rescaled_to(self, rate: f64) -> Self {
        Self::new(self.value_rescaled_to(rate), rate)
    }

    /// Value of this instant expressed at `rate`.
    pub fn value_rescaled_to(self, rate: f64) -> f64 {
        if rate == self.rate {
            self.value
        } else {
            self.value * rate / self.rate
        }
    }

    /// Seconds since zero.
    pub fn to_seconds(self) -> f64 {
        self.value / self.rate
    }

    /// Round the value down to a whole unit, keeping the rate.
    pub fn floor(self) -> Self {
        Self::new(self.value.floor(), self.rate)
    }

    /// Strict identity: same value and same rate.
    pub fn compare_exact(self, other: Self) -> bool {
        self.value == other.value && self.rate == other.rate
    }

    fn common_rate(self, other: Self) -> f64 {
        if self.rate >= other.rate {
            self.rate
        } else {
            other.rate
        }
    }
}

impl Default for RationalTime {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

impl PartialEq for RationalTime {
    fn eq(&self, other: &Self) -> bool {
        self.value * other.rate == other.value * self.rate
    }
}

impl PartialOrd for RationalTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        (self.value * other.rate).partial_cmp(&(other.value * self.rate))
    }
}

impl Add for RationalTime {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let rate = self.common_rate(rhs);
        Self::new(
            self.value_rescaled_to(rate) + rhs.value_rescaled_to(rate),
            rate,
        )
    }
}

impl Sub for RationalTime {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        let rate = self.common_rate(rhs);
        Self::new(
            self.value_rescaled_to(rate) - rhs.value_rescaled_to(rate),
            rate,
        )
    }
}

impl fmt::Display for RationalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.value, self.rate)
    }
}

/// Half-open time range `[start_time, start_time + duration)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeRange {
    /// First instant in the range.
    pub start_time: RationalTime,
    /// Length of the range.
    pub duration: RationalTime,
}

impl TimeRange {
    /// Build a range from a start and a duration.
    pub const fn new(start_time: RationalTime, duration: RationalTime) -> Self {
        Self {
            start_time,
            duration,
        }
    }

    /// Build a range of whole frames at `rate`.
    pub const fn from_frames(start: f64, duration: f64, rate: f64) -> Self {
        Self::new(
            RationalTime::new(start, rate),
            RationalTime::new(duration, rate),
        )
    }

    /// Range covering `[start, end_exclusive)`, expressed at the start's rate.
    pub fn range_from_start_end_time(start: RationalTime, end_exclusive: RationalTime) -> Self {
        let duration = (end_exclusive - start).rescaled_to(start.rate);
        Self::new(start, duration)
    }

    /// Range covering `[start, end_inclusive]`, where the end is one unit of the start's rate.
    pub fn range_from_start_end_time_inclusive(
        start: RationalTime,
        end_inclusive: RationalTime,
    ) -> Self {
        let duration =
            (end_inclusive - start).rescaled_to(start.rate) + RationalTime::new(1.0, start.rate);
        Self::new(start, duration)
    }

    /// First instant after the range.
    pub fn end_time_exclusive(self) -> RationalTime {
        self.start_time + self.duration.rescaled_to(self.start_time.rate)
    }

    /// Last whole unit inside the range.
    pub fn end_time_inclusive(self) -> RationalTime {
        let end = self.end_time_exclusive();
        if self.duration.value > 1.0 {
            if self.duration.value != self.duration.value.floor() {
                RationalTime::new(end.value.floor(), end.rate)
            } else {
                end - RationalTime::new(1.0, self.duration.rate)
            }
        } else {
            self.start_time
        }
    }

    /// `start_time <= time < end_time_exclusive()`.
    pub fn contains(self, time: RationalTime) -> bool {
        self.start_time <= time && time < self.end_time_exclusive()
    }

    /// `true` when the two ranges share at least one instant.
    pub fn intersects(self, other: TimeRange) -> bool {
        self.start_time < other.end_time_exclusive() && other.start_time < self.end_time_exclusive()
    }

    /// Clamp `time` into `[start_time, end_time_inclusive()]`.
    pub fn clamped(self, time: RationalTime) -> RationalTime {
        if time < self.start_time {
            self.start_time.rescaled_to(time.rate)
        } else {
            let last = self.end_time_inclusive();
            if time > last {
                last.rescaled_to(time.rate)
            } else {
                time
            }
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, +{})", self.start_time, self.duration)
    }
}

/// Collapse a set of frame times into sorted, contiguous ranges.
///
/// Frames are considered contiguous when their values differ by at most one unit.
pub fn to_ranges(mut frames: Vec<RationalTime>) -> Vec<TimeRange> {
    let mut out = Vec::new();
    frames.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let Some((&first, rest)) = frames.split_first() else {
        return out;
    };

    let mut start = first;
    let mut prev = first;
    for &frame in rest {
        if (frame - prev).value > 1.0 {
            out.push(TimeRange::range_from_start_end_time_inclusive(start, prev));
            start = frame;
        }
        prev = frame;
    }
    out.push(TimeRange::range_from_start_end_time_inclusive(start, prev));
    out
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/time.rs"]
mod tests;
