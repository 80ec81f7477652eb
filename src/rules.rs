//! Threshold rules over the recent sleep and check-in window
//!
//! Rules see the newest-first window handed to the engine. A rule without
//! enough data to decide simply does not trigger.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{CheckIn, SleepRecord};
use crate::physiology::consistency::{self, ScheduleAnchor};

const SHORT_NIGHT_MINUTES: u32 = 360;
const CHRONIC_SHORT_MINUTES: u32 = 420;
const LOW_QUALITY_MAX: u8 = 3;
const MIDPOINT_SHIFT_HOURS: f64 = 2.0;
const CLARITY_DROP_POINTS: f64 = 2.0;
const CLARITY_PRIOR_DAYS: usize = 7;
const CLARITY_MIN_PRIORS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// At least 3 of the last 5 nights under 6 hours
    #[serde(rename = "short_sleep_3_nights")]
    ShortSleep3Nights,
    /// At least 5 of the last 7 nights under 7 hours
    ChronicShortSleep,
    /// Sleep midpoint moved more than 2 hours across the last 5 nights
    SleepMidpointShift,
    /// At least 3 of the last 5 nights rated 3 or lower
    #[serde(rename = "low_quality_3_nights")]
    LowQuality3Nights,
    /// Today's clarity at least 2 points under the prior week's average
    ClarityDrop,
}

impl Rule {
    pub const ALL: [Rule; 5] = [
        Rule::ShortSleep3Nights,
        Rule::ChronicShortSleep,
        Rule::SleepMidpointShift,
        Rule::LowQuality3Nights,
        Rule::ClarityDrop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::ShortSleep3Nights => "short_sleep_3_nights",
            Rule::ChronicShortSleep => "chronic_short_sleep",
            Rule::SleepMidpointShift => "sleep_midpoint_shift",
            Rule::LowQuality3Nights => "low_quality_3_nights",
            Rule::ClarityDrop => "clarity_drop",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn count_nights(records: &[SleepRecord], nights: usize, pred: impl Fn(&SleepRecord) -> bool) -> usize {
    records.iter().take(nights).filter(|r| pred(r)).count()
}

pub fn short_sleep_3_nights(records: &[SleepRecord]) -> bool {
    count_nights(records, 5, |r| {
        r.duration_minutes.is_some_and(|m| m < SHORT_NIGHT_MINUTES)
    }) >= 3
}

pub fn chronic_short_sleep(records: &[SleepRecord]) -> bool {
    count_nights(records, 7, |r| {
        r.duration_minutes.is_some_and(|m| m < CHRONIC_SHORT_MINUTES)
    }) >= 5
}

pub fn sleep_midpoint_shift(records: &[SleepRecord]) -> bool {
    consistency::schedule_spread_hours(records, ScheduleAnchor::Midpoint)
        .is_some_and(|spread| spread > MIDPOINT_SHIFT_HOURS)
}

pub fn low_quality_3_nights(records: &[SleepRecord]) -> bool {
    count_nights(records, 5, |r| {
        r.quality_rating.is_some_and(|q| q <= LOW_QUALITY_MAX)
    }) >= 3
}

/// Compares the check-in filed on `date` against up to seven earlier ones
pub fn clarity_drop(checkins: &[CheckIn], date: NaiveDate) -> bool {
    let Some((today, prior)) = checkins.split_first() else {
        return false;
    };
    if today.date != date {
        return false;
    }
    let Some(clarity) = today.mental_clarity else {
        return false;
    };

    let valid: Vec<f64> = prior
        .iter()
        .take(CLARITY_PRIOR_DAYS)
        .filter_map(|c| c.mental_clarity)
        .map(f64::from)
        .collect();
    if valid.len() < CLARITY_MIN_PRIORS {
        return false;
    }

    let average = valid.iter().sum::<f64>() / valid.len() as f64;
    f64::from(clarity) <= average - CLARITY_DROP_POINTS
}

/// Triggered rules in declaration order
pub fn evaluate_rules(sleep: &[SleepRecord], checkins: &[CheckIn], date: NaiveDate) -> Vec<Rule> {
    Rule::ALL
        .into_iter()
        .filter(|rule| match rule {
            Rule::ShortSleep3Nights => short_sleep_3_nights(sleep),
            Rule::ChronicShortSleep => chronic_short_sleep(sleep),
            Rule::SleepMidpointShift => sleep_midpoint_shift(sleep),
            Rule::LowQuality3Nights => low_quality_3_nights(sleep),
            Rule::ClarityDrop => clarity_drop(checkins, date),
        })
        .collect()
}
