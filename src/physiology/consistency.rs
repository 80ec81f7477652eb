//! Sleep schedule regularity over the five most recent nights.

use super::clock;
use crate::models::SleepRecord;

/// Nights inspected for schedule regularity
pub const CONSISTENCY_NIGHTS: usize = 5;

/// Which clock reading of a night is compared across nights
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleAnchor {
    Bedtime,
    Midpoint,
    WakeTime,
}

impl ScheduleAnchor {
    fn minute_of(&self, record: &SleepRecord) -> Option<i32> {
        let ts = match self {
            ScheduleAnchor::Bedtime => record.bedtime,
            ScheduleAnchor::Midpoint => record.midpoint(),
            ScheduleAnchor::WakeTime => record.wake_time,
        }?;
        Some(clock::minute_of_day(&ts))
    }
}

/// Clock spread in hours of the anchor over the last five nights.
///
/// `None` unless all five most recent records carry the anchor.
pub fn schedule_spread_hours(records: &[SleepRecord], anchor: ScheduleAnchor) -> Option<f64> {
    if records.len() < CONSISTENCY_NIGHTS {
        return None;
    }
    let minutes: Vec<i32> = records
        .iter()
        .take(CONSISTENCY_NIGHTS)
        .filter_map(|r| anchor.minute_of(r))
        .collect();
    if minutes.len() < CONSISTENCY_NIGHTS {
        return None;
    }
    clock::circular_spread_hours(&minutes)
}

/// Regularity score (40-100) from the spread; `None` with too little data
pub fn consistency_score(records: &[SleepRecord], anchor: ScheduleAnchor) -> Option<f64> {
    schedule_spread_hours(records, anchor).map(score_from_spread)
}

/// Step function shared by every consumer of the spread
pub fn score_from_spread(spread_hours: f64) -> f64 {
    if spread_hours <= 1.0 {
        100.0
    } else if spread_hours <= 2.0 {
        80.0
    } else if spread_hours <= 3.0 {
        60.0
    } else {
        40.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn nights(bed_hours: &[u32]) -> Vec<SleepRecord> {
        let start = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();
        bed_hours
            .iter()
            .enumerate()
            .map(|(i, &h)| {
                let date = start - Duration::days(i as i64);
                let bedtime = date.and_hms_opt(h, 0, 0).unwrap();
                SleepRecord {
                    duration_minutes: Some(420),
                    bedtime: Some(bedtime),
                    wake_time: Some(bedtime + Duration::hours(7)),
                    ..SleepRecord::new(date)
                }
            })
            .collect()
    }

    #[test]
    fn test_identical_schedule_scores_full() {
        let records = nights(&[23, 23, 23, 23, 23, 23, 23]);
        assert_eq!(consistency_score(&records, ScheduleAnchor::Bedtime), Some(100.0));
        assert_eq!(consistency_score(&records, ScheduleAnchor::Midpoint), Some(100.0));
    }

    #[test]
    fn test_spread_tiers() {
        assert_eq!(score_from_spread(1.0), 100.0);
        assert_eq!(score_from_spread(1.5), 80.0);
        assert_eq!(score_from_spread(3.0), 60.0);
        assert_eq!(score_from_spread(3.1), 40.0);

        let records = nights(&[21, 22, 23, 23, 0]);
        assert_eq!(
            schedule_spread_hours(&records, ScheduleAnchor::Bedtime),
            Some(3.0)
        );
    }

    #[test]
    fn test_requires_five_complete_nights() {
        let records = nights(&[23, 23, 23, 23]);
        assert!(consistency_score(&records, ScheduleAnchor::Bedtime).is_none());

        let mut records = nights(&[23, 23, 23, 23, 23]);
        records[2].wake_time = None;
        assert!(consistency_score(&records, ScheduleAnchor::Midpoint).is_none());
        assert!(consistency_score(&records, ScheduleAnchor::Bedtime).is_some());
    }
}
