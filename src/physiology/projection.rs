//! 72-hour performance projection under three recovery scenarios
//!
//! - **baseline**: habits continue unchanged
//! - **recovery**: full recovery nights, 40% of the baseline decline
//! - **partial**: nap or partial recovery, 70% of the baseline decline

use serde::{Deserialize, Serialize};

use super::consistency::{self, ScheduleAnchor};
use crate::models::SleepRecord;

/// Nightly sleep target used for debt accounting
pub const TARGET_SLEEP_MINUTES: u32 = 450;
const DEBT_NIGHTS: usize = 5;
pub const PROJECTION_HOURS: [u8; 7] = [0, 12, 24, 36, 48, 60, 72];
const MIN_SCORE: f64 = 20.0;
const MAX_SCORE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionPoint {
    pub hour_offset: u8,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection72h {
    pub baseline: Vec<ProjectionPoint>,
    pub recovery: Vec<ProjectionPoint>,
    pub partial: Vec<ProjectionPoint>,
    /// Suggested bedtime advance for tonight (40-60 min)
    pub bedtime_advance_minutes: u8,
    /// Score points lost per day if nothing changes
    pub decline_per_day: f64,
}

/// Minutes short of target summed over the last five nights
pub fn sleep_debt_minutes(records: &[SleepRecord]) -> u32 {
    records
        .iter()
        .take(DEBT_NIGHTS)
        .filter_map(|r| r.duration_minutes)
        .filter(|&m| m < TARGET_SLEEP_MINUTES)
        .map(|m| TARGET_SLEEP_MINUTES - m)
        .sum()
}

fn trajectory(current: f64, slope_per_day: f64, offset: f64) -> Vec<ProjectionPoint> {
    PROJECTION_HOURS
        .iter()
        .map(|&h| {
            let score = (current - (h as f64 / 24.0) * slope_per_day + offset)
                .clamp(MIN_SCORE, MAX_SCORE);
            ProjectionPoint {
                hour_offset: h,
                score: (score * 10.0).round() / 10.0,
            }
        })
        .collect()
}

pub fn compute_projection_72h(
    recent_sleep: &[SleepRecord],
    circadian_alignment_pct: f64,
    current_edge_score: f64,
) -> Projection72h {
    let debt = sleep_debt_minutes(recent_sleep) as f64;
    let variance_hours =
        consistency::schedule_spread_hours(recent_sleep, ScheduleAnchor::WakeTime).unwrap_or(0.0);
    let misalignment = 100.0 - circadian_alignment_pct;

    let debt_impact = (debt / 120.0 * 15.0).min(30.0);
    let variance_impact = (variance_hours * 5.0).min(15.0);
    let align_impact = (misalignment / 100.0 * 25.0).min(25.0);
    let decline_per_day = (debt_impact + variance_impact + align_impact) / 3.0;

    Projection72h {
        baseline: trajectory(current_edge_score, decline_per_day, 0.0),
        recovery: trajectory(current_edge_score, decline_per_day * 0.4, 5.0),
        partial: trajectory(current_edge_score, decline_per_day * 0.7, 3.0),
        bedtime_advance_minutes: (misalignment / 2.0).round().clamp(40.0, 60.0) as u8,
        decline_per_day: (decline_per_day * 100.0).round() / 100.0,
    }
}
