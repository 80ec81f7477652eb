//! Minute-of-day arithmetic on a 24 hour circle.
//!
//! Bedtimes cluster around midnight, so a plain arithmetic mean of 23:30 and
//! 00:30 would land at noon. Everything here unwraps values around a
//! reference point first.

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub const MINUTES_PER_DAY: i32 = 24 * 60;
const HALF_DAY: i32 = 12 * 60;

/// Minute of day (0..1440) of a wall-clock timestamp
pub fn minute_of_day(ts: &NaiveDateTime) -> i32 {
    (ts.hour() * 60 + ts.minute()) as i32
}

/// Wrap any minute count into 0..1440
pub fn wrap_minutes(minutes: f64) -> f64 {
    minutes.rem_euclid(MINUTES_PER_DAY as f64)
}

/// Signed difference `a - b` normalized into (-720, 720]
pub fn signed_difference(a: f64, b: f64) -> f64 {
    let mut diff = (a - b).rem_euclid(MINUTES_PER_DAY as f64);
    if diff > HALF_DAY as f64 {
        diff -= MINUTES_PER_DAY as f64;
    }
    diff
}

/// Mean minute-of-day, unwrapping every value to within half a day of the first
pub fn circular_mean(minutes: &[i32]) -> Option<f64> {
    let reference = *minutes.first()? as f64;
    let sum: f64 = minutes
        .iter()
        .map(|&m| reference + signed_difference(m as f64, reference))
        .sum();
    Some(wrap_minutes(sum / minutes.len() as f64))
}

/// Smallest arc of the clock (in hours) that contains every value
pub fn circular_spread_hours(minutes: &[i32]) -> Option<f64> {
    if minutes.is_empty() {
        return None;
    }
    let mut sorted: Vec<i32> = minutes.iter().map(|m| m.rem_euclid(MINUTES_PER_DAY)).collect();
    sorted.sort_unstable();

    // The complement of the largest gap between neighbours is the spread
    let mut largest_gap = sorted[0] + MINUTES_PER_DAY - sorted[sorted.len() - 1];
    for pair in sorted.windows(2) {
        largest_gap = largest_gap.max(pair[1] - pair[0]);
    }
    Some((MINUTES_PER_DAY - largest_gap) as f64 / 60.0)
}

/// Wall-clock time of day with minute resolution, serialized as `HH:MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

impl ClockTime {
    /// Build from a minute count, wrapping around midnight
    pub fn from_minutes(minutes: i32) -> Self {
        ClockTime(minutes.rem_euclid(MINUTES_PER_DAY) as u16)
    }

    pub fn from_hm(hour: u32, minute: u32) -> Self {
        Self::from_minutes((hour * 60 + minute) as i32)
    }

    pub fn minutes(&self) -> i32 {
        self.0 as i32
    }

    pub fn to_naive_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.0 as u32 / 60, self.0 as u32 % 60, 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl From<NaiveTime> for ClockTime {
    fn from(t: NaiveTime) -> Self {
        ClockTime::from_hm(t.hour(), t.minute())
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl std::str::FromStr for ClockTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s, "%H:%M")
            .map(ClockTime::from)
            .map_err(|e| format!("Invalid time '{}': {}", s, e))
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A start/end pair on the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockWindow {
    pub start: ClockTime,
    pub end: ClockTime,
}

impl ClockWindow {
    pub fn new(start: ClockTime, end: ClockTime) -> Self {
        ClockWindow { start, end }
    }

    pub fn from_hm(start: (u32, u32), end: (u32, u32)) -> Self {
        ClockWindow::new(
            ClockTime::from_hm(start.0, start.1),
            ClockTime::from_hm(end.0, end.1),
        )
    }

    pub fn span_minutes(&self) -> i32 {
        self.end.minutes() - self.start.minutes()
    }
}

impl fmt::Display for ClockWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
