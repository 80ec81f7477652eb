//! Peak performance windows for planning the working day.
//!
//! Coarser than [`super::windows`]: three back-to-back blocks (strategic,
//! execution, recovery) per chronotype. Short sleep and an irregular
//! schedule narrow the first two blocks, and a falling clarity or rising
//! stress trend in recent check-ins narrows them a little more. Short
//! sleep also moves all three earlier.

use serde::{Deserialize, Serialize};

use super::clock::ClockWindow;
use super::consistency::{self, ScheduleAnchor};
use super::windows::{shift_window, shrink_window_with_floor};
use crate::models::{CheckIn, Chronotype, SleepRecord};

const MIN_PEAK_SPAN_MINUTES: i32 = 60;
const DEFAULT_DURATION_MINUTES: u32 = 480;
const DEFAULT_CONSISTENCY: f64 = 80.0;
const EXECUTION_SHRINK_FACTOR: f64 = 0.8;
const TREND_SHRINK_PCT: f64 = 5.0;

/// Check-ins needed before a trend is read
const MIN_TREND_CHECKINS: usize = 5;
/// Ratings per side of the comparison
const TREND_SPAN: usize = 3;
const MIN_TREND_RATINGS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakWindows {
    pub strategic: ClockWindow,
    pub execution: ClockWindow,
    pub recovery: ClockWindow,
}

impl PeakWindows {
    pub fn baseline(chronotype: Chronotype) -> Self {
        match chronotype {
            Chronotype::Early => PeakWindows {
                strategic: ClockWindow::from_hm((8, 0), (11, 0)),
                execution: ClockWindow::from_hm((11, 0), (14, 0)),
                recovery: ClockWindow::from_hm((14, 0), (18, 0)),
            },
            Chronotype::Intermediate => PeakWindows {
                strategic: ClockWindow::from_hm((9, 0), (12, 0)),
                execution: ClockWindow::from_hm((12, 0), (15, 0)),
                recovery: ClockWindow::from_hm((15, 0), (19, 0)),
            },
            Chronotype::Late => PeakWindows {
                strategic: ClockWindow::from_hm((10, 0), (13, 0)),
                execution: ClockWindow::from_hm((13, 0), (16, 0)),
                recovery: ClockWindow::from_hm((16, 0), (20, 0)),
            },
        }
    }
}

/// Mean of the newest three ratings minus the mean of the three before.
///
/// 0.0 with fewer than five check-ins or fewer than two ratings on a side.
fn rating_trend<F>(checkins: &[CheckIn], rating: F) -> f64
where
    F: Fn(&CheckIn) -> Option<u8>,
{
    if checkins.len() < MIN_TREND_CHECKINS {
        return 0.0;
    }
    let mean_of = |slice: &[CheckIn]| -> Option<f64> {
        let values: Vec<f64> = slice.iter().filter_map(&rating).map(f64::from).collect();
        (values.len() >= MIN_TREND_RATINGS).then(|| values.iter().sum::<f64>() / values.len() as f64)
    };

    let recent = &checkins[..TREND_SPAN];
    let older = &checkins[TREND_SPAN..checkins.len().min(2 * TREND_SPAN)];
    match (mean_of(recent), mean_of(older)) {
        (Some(recent), Some(older)) => recent - older,
        _ => 0.0,
    }
}

/// Peak windows from the newest-first sleep and check-in windows
pub fn compute_peak_windows(
    latest_sleep: Option<&SleepRecord>,
    recent_sleep: &[SleepRecord],
    recent_checkins: &[CheckIn],
    chronotype: Chronotype,
) -> PeakWindows {
    let mut windows = PeakWindows::baseline(chronotype);

    let mut shrink_pct = 0.0;
    let mut shift_minutes = 0;

    let hours = latest_sleep
        .and_then(|s| s.duration_minutes)
        .unwrap_or(DEFAULT_DURATION_MINUTES) as f64
        / 60.0;
    if hours < 6.0 {
        shrink_pct += 20.0;
        shift_minutes += 30;
    } else if hours < 7.0 {
        shrink_pct += 10.0;
        shift_minutes += 15;
    }

    let consistency = consistency::consistency_score(recent_sleep, ScheduleAnchor::Midpoint)
        .unwrap_or(DEFAULT_CONSISTENCY);
    if consistency < 60.0 {
        shrink_pct += 15.0;
    } else if consistency < 80.0 {
        shrink_pct += 8.0;
    }

    let clarity_trend = rating_trend(recent_checkins, |c| c.mental_clarity);
    let stress_trend = rating_trend(recent_checkins, |c| c.stress_level);
    if clarity_trend < 0.0 || stress_trend > 0.0 {
        shrink_pct += TREND_SHRINK_PCT;
    }

    if shrink_pct > 0.0 {
        windows.strategic =
            shrink_window_with_floor(windows.strategic, shrink_pct, MIN_PEAK_SPAN_MINUTES);
        windows.execution = shrink_window_with_floor(
            windows.execution,
            shrink_pct * EXECUTION_SHRINK_FACTOR,
            MIN_PEAK_SPAN_MINUTES,
        );
    }
    if shift_minutes > 0 {
        windows.strategic = shift_window(windows.strategic, -shift_minutes);
        windows.execution = shift_window(windows.execution, -shift_minutes);
        windows.recovery = shift_window(windows.recovery, -shift_minutes);
    }

    windows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 1).unwrap()
    }

    fn nights(minutes: u32, count: usize) -> Vec<SleepRecord> {
        (0..count)
            .map(|i| {
                let date = end() - Duration::days(i as i64);
                let bedtime = (date - Duration::days(1)).and_hms_opt(23, 0, 0).unwrap();
                SleepRecord {
                    duration_minutes: Some(minutes),
                    bedtime: Some(bedtime),
                    wake_time: Some(bedtime + Duration::minutes(minutes as i64)),
                    ..SleepRecord::new(date)
                }
            })
            .collect()
    }

    fn checkins(clarity: &[u8], stress: &[u8]) -> Vec<CheckIn> {
        clarity
            .iter()
            .zip(stress)
            .enumerate()
            .map(|(i, (&c, &s))| CheckIn {
                mental_clarity: Some(c),
                stress_level: Some(s),
                ..CheckIn::new(end() - Duration::days(i as i64))
            })
            .collect()
    }

    #[test]
    fn test_rested_user_gets_baseline() {
        let records = nights(480, 7);
        let steady = checkins(&[7; 6], &[4; 6]);
        for chronotype in [Chronotype::Early, Chronotype::Intermediate, Chronotype::Late] {
            let result = compute_peak_windows(records.first(), &records, &steady, chronotype);
            assert_eq!(result, PeakWindows::baseline(chronotype));
        }
    }

    #[test]
    fn test_short_night_narrows_and_moves_earlier() {
        let records = nights(330, 7);
        let result = compute_peak_windows(records.first(), &records, &[], Chronotype::Intermediate);

        // 180 min shrunk 20% -> 144, centred, then 30 minutes earlier
        assert_eq!(result.strategic.to_string(), "08:48-11:12");
        // Execution shrinks by 16%
        assert_eq!(result.execution.to_string(), "11:45-14:16");
        // Recovery keeps its length
        assert_eq!(result.recovery.to_string(), "14:30-18:30");
    }

    #[test]
    fn test_falling_clarity_narrows() {
        let records = nights(480, 7);
        let falling = checkins(&[4, 4, 4, 8, 8, 8], &[4; 6]);
        let result =
            compute_peak_windows(records.first(), &records, &falling, Chronotype::Intermediate);

        assert_eq!(result.strategic.to_string(), "09:05-11:56");
        assert_eq!(result.execution.to_string(), "12:04-14:57");
        assert_eq!(result.recovery, PeakWindows::baseline(Chronotype::Intermediate).recovery);
    }

    #[test]
    fn test_rising_stress_narrows() {
        let records = nights(480, 7);
        let rising = checkins(&[7; 6], &[8, 8, 7, 3, 3, 3]);
        let result =
            compute_peak_windows(records.first(), &records, &rising, Chronotype::Intermediate);
        assert_eq!(result.strategic.span_minutes(), 171);
    }

    #[test]
    fn test_trend_needs_five_checkins() {
        assert_eq!(rating_trend(&checkins(&[2, 2, 9, 9], &[5; 4]), |c| c.mental_clarity), 0.0);

        let mut sparse = checkins(&[2, 2, 2, 9, 9], &[5; 5]);
        sparse[3].mental_clarity = None;
        // One older rating is not enough
        assert_eq!(rating_trend(&sparse, |c| c.mental_clarity), 0.0);

        let full = checkins(&[2, 2, 2, 9, 9], &[5; 5]);
        assert_eq!(rating_trend(&full, |c| c.mental_clarity), -7.0);
    }

    #[test]
    fn test_missing_duration_counts_as_full_night() {
        let records: Vec<SleepRecord> = nights(330, 7)
            .into_iter()
            .map(|r| SleepRecord {
                duration_minutes: None,
                ..r
            })
            .collect();
        let result = compute_peak_windows(records.first(), &records, &[], Chronotype::Late);
        assert_eq!(result, PeakWindows::baseline(Chronotype::Late));
    }
}
