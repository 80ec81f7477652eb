//! Sleep architecture projection
//!
//! Estimates slow-wave (N3) and REM share, fragmentation risk and sleep
//! efficiency from duration, evening behaviour and schedule regularity.
//!
//! # Stage Norms
//!
//! Slow-wave sleep declines with age:
//! - Under 30: ~22% of the night
//! - 30-39: ~18%
//! - 40-49: ~15%
//! - 50 and over: ~12%
//!
//! REM is modeled as a flat 22% baseline.

use serde::{Deserialize, Serialize};

use super::consistency::{self, ScheduleAnchor};
use crate::models::SleepRecord;

const REM_BASELINE_PCT: f64 = 22.0;
const FRAGMENTATION_BASELINE: f64 = 20.0;
const EFFICIENCY_BASELINE: f64 = 85.0;
const DEFAULT_DURATION_MINUTES: u32 = 420;
const REM_SHIFT_ALIGNMENT_THRESHOLD: f64 = 60.0;

pub const REM_SHIFT_NOTE: &str = "REM distribution may shift later due to delayed bedtime.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepArchitecture {
    /// Slow-wave share of the night (8-28%)
    pub predicted_n3_pct: f64,

    /// REM share of the night (12-28%)
    pub predicted_rem_pct: f64,

    /// Likelihood of a broken night (0-95)
    pub fragmentation_risk: f64,

    /// Time asleep over time in bed (65-98%)
    pub predicted_efficiency: f64,

    pub rem_shift_note: Option<String>,
}

/// Age-banded slow-wave norm; 18% when age is unknown
pub fn n3_baseline(age: Option<u32>) -> f64 {
    match age {
        None => 18.0,
        Some(a) if a < 30 => 22.0,
        Some(a) if a < 40 => 18.0,
        Some(a) if a < 50 => 15.0,
        Some(_) => 12.0,
    }
}

/// Fragmentation added for irregular bedtimes over the last five nights
pub fn consistency_penalty(recent_sleep: &[SleepRecord]) -> f64 {
    match consistency::consistency_score(recent_sleep, ScheduleAnchor::Bedtime) {
        Some(score) if score < 60.0 => 20.0,
        Some(score) if score < 80.0 => 10.0,
        _ => 0.0,
    }
}

pub fn compute_sleep_architecture(
    latest_sleep: Option<&SleepRecord>,
    recent_sleep: &[SleepRecord],
    circadian_alignment_pct: f64,
    age: Option<u32>,
) -> SleepArchitecture {
    let mut n3 = n3_baseline(age);
    let mut rem = REM_BASELINE_PCT;
    let mut fragmentation = FRAGMENTATION_BASELINE;
    let mut efficiency = EFFICIENCY_BASELINE;

    if let Some(latest) = latest_sleep {
        let hours = latest.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES) as f64 / 60.0;
        if hours < 6.0 {
            n3 -= 4.0;
            rem -= 3.0;
            efficiency -= 8.0;
        } else if hours < 7.0 {
            n3 -= 2.0;
            rem -= 2.0;
            efficiency -= 4.0;
        }

        if latest.alcohol_tonight == Some(true) {
            n3 -= 2.0;
            rem -= 5.0;
            fragmentation += 25.0;
            efficiency -= 5.0;
        }

        match latest.screen_time_minutes {
            Some(screen) if screen >= 90 => {
                fragmentation += 15.0;
                efficiency -= 5.0;
            }
            Some(screen) if screen >= 60 => fragmentation += 8.0,
            _ => {}
        }
    }

    let rem_shift_note = (circadian_alignment_pct < REM_SHIFT_ALIGNMENT_THRESHOLD)
        .then(|| REM_SHIFT_NOTE.to_string());

    fragmentation += consistency_penalty(recent_sleep);

    SleepArchitecture {
        predicted_n3_pct: round1(n3).clamp(8.0, 28.0),
        predicted_rem_pct: round1(rem).clamp(12.0, 28.0),
        fragmentation_risk: fragmentation.round().min(95.0),
        predicted_efficiency: efficiency.round().clamp(65.0, 98.0),
        rem_shift_note,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
