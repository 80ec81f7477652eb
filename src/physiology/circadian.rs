//! Circadian alignment between the biological night and the chosen bedtime
//!
//! Dim-light melatonin onset (DLMO) is estimated 2.5 hours before the
//! habitual bedtime, shifted by chronotype. Biological readiness time (BRT)
//! sits 75 minutes after DLMO, the midpoint of the 60-90 minute window in
//! which sleep onset is easiest.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::clock::{self, ClockTime};
use crate::models::{Chronotype, SleepRecord};

const DLMO_OFFSET_MINUTES: f64 = 150.0;
const BRT_OFFSET_MINUTES: f64 = 75.0;
const MAX_BEDTIMES: usize = 7;
const MIN_BEDTIMES: usize = 3;

/// How closely bedtime tracks biological readiness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentLevel {
    /// Within 15 minutes of BRT
    High,
    /// Within 45 minutes of BRT
    Moderate,
    /// More than 45 minutes away from BRT
    Misaligned,
}

impl AlignmentLevel {
    pub fn from_difference(abs_diff_minutes: f64) -> Self {
        if abs_diff_minutes <= 15.0 {
            AlignmentLevel::High
        } else if abs_diff_minutes <= 45.0 {
            AlignmentLevel::Moderate
        } else {
            AlignmentLevel::Misaligned
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AlignmentLevel::High => "Bedtime matches biological readiness",
            AlignmentLevel::Moderate => "Bedtime is close to biological readiness",
            AlignmentLevel::Misaligned => "Bedtime is far from biological readiness",
        }
    }
}

impl fmt::Display for AlignmentLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignmentLevel::High => write!(f, "high"),
            AlignmentLevel::Moderate => write!(f, "moderate"),
            AlignmentLevel::Misaligned => write!(f, "misaligned"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircadianAlignment {
    /// Modeled optimal sleep-onset time
    pub biological_readiness_time: ClockTime,

    /// 0-100, 100 when bedtime equals BRT
    pub circadian_alignment_pct: f64,

    /// Signed bedtime minus BRT; negative means earlier than BRT
    pub bedtime_vs_brt_minutes: i32,

    pub interpretation: AlignmentLevel,

    /// Average bedtime over the inspected nights
    pub avg_bedtime_7d: ClockTime,
}

fn chronotype_offset_minutes(chronotype: Chronotype) -> f64 {
    match chronotype {
        Chronotype::Early => -30.0,
        Chronotype::Intermediate => 0.0,
        Chronotype::Late => 30.0,
    }
}

/// Alignment percentage for a signed bedtime-to-BRT difference
pub fn alignment_pct(diff_minutes: f64) -> f64 {
    (100.0 - diff_minutes.abs() * 2.0).clamp(0.0, 100.0)
}

/// Compare tonight's planned bedtime (or the recent average) against BRT.
///
/// Uses up to seven records that carry a bedtime, newest first; returns
/// `None` when fewer than three are available.
pub fn compute_circadian_alignment(
    recent_sleep: &[SleepRecord],
    tonight_bedtime: Option<ClockTime>,
    chronotype: Chronotype,
) -> Option<CircadianAlignment> {
    let bedtimes: Vec<i32> = recent_sleep
        .iter()
        .filter_map(|r| r.bedtime.as_ref().map(clock::minute_of_day))
        .take(MAX_BEDTIMES)
        .collect();
    if bedtimes.len() < MIN_BEDTIMES {
        return None;
    }

    let avg_bedtime = clock::circular_mean(&bedtimes)?;
    let dlmo = avg_bedtime - DLMO_OFFSET_MINUTES + chronotype_offset_minutes(chronotype);
    let brt = clock::wrap_minutes(dlmo + BRT_OFFSET_MINUTES);

    let compared = tonight_bedtime
        .map(|t| t.minutes() as f64)
        .unwrap_or(avg_bedtime);
    let diff = clock::signed_difference(compared, brt);

    Some(CircadianAlignment {
        biological_readiness_time: ClockTime::from_minutes(brt.floor() as i32),
        circadian_alignment_pct: alignment_pct(diff).round(),
        bedtime_vs_brt_minutes: diff.round() as i32,
        interpretation: AlignmentLevel::from_difference(diff.abs()),
        avg_bedtime_7d: ClockTime::from_minutes(avg_bedtime.floor() as i32),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn history(bed_minutes: &[i32]) -> Vec<SleepRecord> {
        let end = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        bed_minutes
            .iter()
            .enumerate()
            .map(|(i, &m)| {
                let date = end - Duration::days(i as i64);
                let bedtime = date.and_hms_opt(0, 0, 0).unwrap() + Duration::minutes(m as i64);
                SleepRecord {
                    bedtime: Some(bedtime),
                    duration_minutes: Some(450),
                    ..SleepRecord::new(date)
                }
            })
            .collect()
    }

    #[test]
    fn test_brt_from_average_bedtime() {
        let records = history(&[23 * 60, 23 * 60, 23 * 60]);
        let result =
            compute_circadian_alignment(&records, None, Chronotype::Intermediate).unwrap();

        assert_eq!(result.avg_bedtime_7d.to_string(), "23:00");
        assert_eq!(result.biological_readiness_time.to_string(), "21:45");
        // Habitual bedtime sits 75 minutes after BRT
        assert_eq!(result.bedtime_vs_brt_minutes, 75);
        assert_eq!(result.circadian_alignment_pct, 0.0);
        assert_eq!(result.interpretation, AlignmentLevel::Misaligned);
    }

    #[test]
    fn test_chronotype_shifts_brt() {
        let records = history(&[23 * 60, 23 * 60, 23 * 60]);
        let early = compute_circadian_alignment(&records, None, Chronotype::Early).unwrap();
        let late = compute_circadian_alignment(&records, None, Chronotype::Late).unwrap();

        assert_eq!(early.biological_readiness_time.to_string(), "21:15");
        assert_eq!(late.biological_readiness_time.to_string(), "22:15");
        assert_eq!(late.bedtime_vs_brt_minutes, 45);
        assert_eq!(late.circadian_alignment_pct, 10.0);
        assert_eq!(late.interpretation, AlignmentLevel::Moderate);
    }

    #[test]
    fn test_planned_bedtime_at_brt_is_fully_aligned() {
        let records = history(&[23 * 60, 23 * 60, 23 * 60, 23 * 60]);
        let planned = ClockTime::from_hm(21, 45);
        let result =
            compute_circadian_alignment(&records, Some(planned), Chronotype::Intermediate)
                .unwrap();
        assert_eq!(result.circadian_alignment_pct, 100.0);
        assert_eq!(result.bedtime_vs_brt_minutes, 0);
        assert_eq!(result.interpretation, AlignmentLevel::High);
    }

    #[test]
    fn test_alignment_is_symmetric() {
        let records = history(&[23 * 60, 23 * 60, 23 * 60]);
        let brt = 21 * 60 + 45;
        for offset in [5, 20, 40, 90] {
            let earlier = compute_circadian_alignment(
                &records,
                Some(ClockTime::from_minutes(brt - offset)),
                Chronotype::Intermediate,
            )
            .unwrap();
            let later = compute_circadian_alignment(
                &records,
                Some(ClockTime::from_minutes(brt + offset)),
                Chronotype::Intermediate,
            )
            .unwrap();
            assert_eq!(earlier.circadian_alignment_pct, later.circadian_alignment_pct);
            assert_eq!(earlier.bedtime_vs_brt_minutes, -later.bedtime_vs_brt_minutes);
            assert_eq!(earlier.interpretation, later.interpretation);
        }
    }

    #[test]
    fn test_average_wraps_midnight() {
        let records = history(&[23 * 60 + 30, 30, 0]);
        let result =
            compute_circadian_alignment(&records, None, Chronotype::Intermediate).unwrap();
        assert_eq!(result.avg_bedtime_7d.to_string(), "00:00");
        assert_eq!(result.biological_readiness_time.to_string(), "22:45");
    }

    #[test]
    fn test_requires_three_bedtimes() {
        let mut records = history(&[23 * 60, 23 * 60, 23 * 60]);
        records[1].bedtime = None;
        assert!(compute_circadian_alignment(&records, None, Chronotype::Intermediate).is_none());
    }

    #[test]
    fn test_only_seven_most_recent_bedtimes_count() {
        let mut minutes = vec![22 * 60; 7];
        minutes.extend([2 * 60; 5]);
        let records = history(&minutes);
        let result =
            compute_circadian_alignment(&records, None, Chronotype::Intermediate).unwrap();
        assert_eq!(result.avg_bedtime_7d.to_string(), "22:00");
    }
}
