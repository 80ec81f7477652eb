//! Homeostatic sleep pressure model
//!
//! Pressure (an adenosine-like quantity) builds linearly while awake and
//! drains exponentially during sleep. The residual left at wake-up is
//! compared to the residual after a typical day.
//!
//! # Model
//!
//! - Wake accumulation: 1 unit/hour from the previous wake time to last
//!   night's bedtime, ×1.15 when caffeine was taken after 2pm
//! - Sleep dissipation: `P × (1 − e^(−t/4.5h))`
//! - Naps: +0.3 units per nap hour on top of the residual
//! - Baseline: 16 waking hours, 70% of which a 7.5h target night clears

use serde::{Deserialize, Serialize};

use super::clock::{ClockTime, ClockWindow};
use crate::models::SleepRecord;

const PRESSURE_RATE_WAKE: f64 = 1.0;
const PRESSURE_DECAY_TAU_HOURS: f64 = 4.5;
const CAFFEINE_MULTIPLIER: f64 = 1.15;
const NAP_PRESSURE_PER_HOUR: f64 = 0.3;
const BASELINE_WAKE_HOURS: f64 = 16.0;
const TARGET_NIGHT_DISSIPATION: f64 = 0.7;
const DEFAULT_DURATION_MINUTES: u32 = 420;

/// Pressure above which the afternoon dip widens
pub const ELEVATED_PRESSURE_PCT: f64 = 15.0;
const REPORTED_PRESSURE_CAP_PCT: f64 = 50.0;
const MAX_DIP_EXTENSION_MINUTES: f64 = 60.0;
const MAX_RECOVERY_HOURS: f64 = 24.0;

/// Sleep pressure estimate for the day after the latest night
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepPressure {
    /// Residual pressure above baseline in percent (0-50)
    pub sleep_pressure_pct: f64,

    /// Expected afternoon low-alertness window
    pub cognitive_dip_window: ClockWindow,

    /// Hours of recovery needed to clear the excess
    pub recovery_time_estimate: u8,
}

/// Residual pressure a normal day leaves behind
pub fn baseline_pressure() -> f64 {
    BASELINE_WAKE_HOURS * PRESSURE_RATE_WAKE * (1.0 - TARGET_NIGHT_DISSIPATION)
}

/// Estimate sleep pressure from the two most recent nights.
///
/// Returns `None` when fewer than two records exist or the latest night
/// has no bedtime.
pub fn compute_sleep_pressure(recent_sleep: &[SleepRecord]) -> Option<SleepPressure> {
    if recent_sleep.len() < 2 {
        return None;
    }

    let mut sorted: Vec<&SleepRecord> = recent_sleep.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    let last_night = sorted[0];
    let prev_night = sorted[1];

    let bedtime = last_night.bedtime?;

    let duration_hours =
        last_night.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES) as f64 / 60.0;
    let nap_hours = last_night.nap_duration_minutes.unwrap_or(0) as f64 / 60.0;

    let wake_hours = match prev_night.wake_time {
        Some(prev_wake) => ((bedtime - prev_wake).num_seconds() as f64 / 3600.0).max(0.0),
        None => BASELINE_WAKE_HOURS,
    };

    let mut pressure_at_bed = wake_hours * PRESSURE_RATE_WAKE;
    if last_night.caffeine_after_2pm == Some(true) {
        pressure_at_bed *= CAFFEINE_MULTIPLIER;
    }

    let dissipated = pressure_at_bed * (1.0 - (-duration_hours / PRESSURE_DECAY_TAU_HOURS).exp());
    let residual = pressure_at_bed - dissipated + nap_hours * NAP_PRESSURE_PER_HOUR;

    let baseline = baseline_pressure();
    let pressure_pct = ((residual - baseline) / baseline * 100.0).max(0.0);

    tracing::trace!(
        wake_hours,
        pressure_at_bed,
        residual,
        pressure_pct,
        "sleep pressure model"
    );

    Some(summarize(pressure_pct))
}

/// Dip window and recovery hours for a raw pressure percentage.
///
/// The reported percentage keeps one decimal (30.3, not 30) and is capped
/// at 50. Dip extension and recovery hours are derived from the unrounded
/// value and rounded to whole minutes and hours.
fn summarize(pressure_pct: f64) -> SleepPressure {
    let dip_start = ClockTime::from_hm(14, 30);
    let dip_end = ClockTime::from_hm(16, 0);

    if pressure_pct > ELEVATED_PRESSURE_PCT {
        let extend = (pressure_pct / 3.0).round().min(MAX_DIP_EXTENSION_MINUTES) as i32;
        SleepPressure {
            sleep_pressure_pct: round1(pressure_pct.min(REPORTED_PRESSURE_CAP_PCT)),
            cognitive_dip_window: ClockWindow::new(
                dip_start,
                ClockTime::from_minutes(dip_end.minutes() + extend),
            ),
            recovery_time_estimate: (4.0 + pressure_pct / 10.0).round().min(MAX_RECOVERY_HOURS)
                as u8,
        }
    } else {
        SleepPressure {
            sleep_pressure_pct: round1(pressure_pct),
            cognitive_dip_window: ClockWindow::new(dip_start, dip_end),
            recovery_time_estimate: (2.0 + pressure_pct / 15.0).round().max(0.0) as u8,
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    /// Consecutive nights ending on `end`, newest first, all with the same schedule
    fn schedule(end: NaiveDate, nights: usize, bed_hour: u32, minutes: u32) -> Vec<SleepRecord> {
        (0..nights)
            .map(|i| {
                let date = end - Duration::days(i as i64);
                let bedtime = bed(date, bed_hour);
                SleepRecord {
                    duration_minutes: Some(minutes),
                    bedtime: Some(bedtime),
                    wake_time: Some(bedtime + Duration::minutes(minutes as i64)),
                    ..SleepRecord::new(date)
                }
            })
            .collect()
    }

    fn bed(date: NaiveDate, hour: u32) -> NaiveDateTime {
        // Early-morning bedtimes belong to the following calendar day
        if hour < 12 {
            date.succ_opt().unwrap().and_hms_opt(hour, 0, 0).unwrap()
        } else {
            date.and_hms_opt(hour, 0, 0).unwrap()
        }
    }

    fn end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    #[test]
    fn test_baseline_value() {
        assert!((baseline_pressure() - 4.8).abs() < 1e-9);
    }

    #[test]
    fn test_rested_sleeper_has_no_excess_pressure() {
        let records = schedule(end(), 3, 23, 480);
        let result = compute_sleep_pressure(&records).unwrap();
        assert_eq!(result.sleep_pressure_pct, 0.0);
        assert_eq!(result.cognitive_dip_window.to_string(), "14:30-16:00");
        assert_eq!(result.recovery_time_estimate, 2);
    }

    #[test]
    fn test_short_nights_raise_pressure() {
        let records = schedule(end(), 5, 1, 300);
        let result = compute_sleep_pressure(&records).unwrap();
        assert!(result.sleep_pressure_pct > 30.0);
        assert!(result.sleep_pressure_pct <= 50.0);
        assert_eq!(result.cognitive_dip_window.to_string(), "14:30-16:10");
        assert_eq!(result.recovery_time_estimate, 7);
    }

    #[test]
    fn test_caffeine_increases_pressure() {
        let plain = schedule(end(), 2, 0, 330);
        let mut caffeinated = plain.clone();
        caffeinated[0].caffeine_after_2pm = Some(true);

        let a = compute_sleep_pressure(&plain).unwrap();
        let b = compute_sleep_pressure(&caffeinated).unwrap();
        assert!(b.sleep_pressure_pct > a.sleep_pressure_pct);
    }

    #[test]
    fn test_nap_adds_residual() {
        let plain = schedule(end(), 2, 0, 330);
        let mut napped = plain.clone();
        napped[0].nap_duration_minutes = Some(120);

        let a = compute_sleep_pressure(&plain).unwrap();
        let b = compute_sleep_pressure(&napped).unwrap();
        assert!(b.sleep_pressure_pct > a.sleep_pressure_pct);
    }

    #[test]
    fn test_extreme_pressure_is_capped() {
        let mut records = schedule(end(), 2, 23, 120);
        records[1].wake_time = records[1].bedtime.map(|b| b - Duration::hours(20));
        let result = compute_sleep_pressure(&records).unwrap();
        assert_eq!(result.sleep_pressure_pct, 50.0);
        assert!(result.recovery_time_estimate <= 24);
        assert_eq!(result.cognitive_dip_window.end.to_string(), "17:00");
    }

    #[test]
    fn test_missing_inputs_yield_none() {
        let records = schedule(end(), 1, 23, 450);
        assert!(compute_sleep_pressure(&records).is_none());

        let mut records = schedule(end(), 3, 23, 450);
        records[0].bedtime = None;
        assert!(compute_sleep_pressure(&records).is_none());
    }

    #[test]
    fn test_reported_percentage_keeps_one_decimal() {
        let elevated = summarize(30.26);
        assert_eq!(elevated.sleep_pressure_pct, 30.3);
        assert_eq!(elevated.cognitive_dip_window.to_string(), "14:30-16:10");
        assert_eq!(elevated.recovery_time_estimate, 7);

        let mild = summarize(12.34);
        assert_eq!(mild.sleep_pressure_pct, 12.3);
        assert_eq!(mild.recovery_time_estimate, 3);
    }

    #[test]
    fn test_order_independent() {
        let mut records = schedule(end(), 4, 1, 300);
        let expected = compute_sleep_pressure(&records).unwrap();
        records.reverse();
        assert_eq!(compute_sleep_pressure(&records).unwrap(), expected);
    }
}
