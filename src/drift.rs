//! Multi-day drift of the Edge Score
//!
//! The daily series is rebuilt on every evaluation by re-scoring each
//! recorded night over its own trailing window. That is quadratic in the
//! window length, which stays at 14 or fewer nights.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{CheckIn, DailyScore, SleepRecord};

pub const MIN_DRIFT_POINTS: usize = 3;
const SHORT_DRIFT_POINTS: usize = 5;
const DAY_WINDOW: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftStatus {
    Stable,
    SlightCompression,
    AccumulatingFatigue,
    EdgeErosion,
}

impl DriftStatus {
    /// Bucket a 14-day decline in percent (positive means the score fell)
    pub fn from_decline(decline_pct: f64) -> Self {
        if decline_pct >= 20.0 {
            DriftStatus::EdgeErosion
        } else if decline_pct >= 10.0 {
            DriftStatus::AccumulatingFatigue
        } else if decline_pct >= 5.0 {
            DriftStatus::SlightCompression
        } else {
            DriftStatus::Stable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DriftStatus::Stable => "stable",
            DriftStatus::SlightCompression => "slight_compression",
            DriftStatus::AccumulatingFatigue => "accumulating_fatigue",
            DriftStatus::EdgeErosion => "edge_erosion",
        }
    }
}

impl fmt::Display for DriftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftResult {
    pub status: DriftStatus,
    pub drift_pct_14d: f64,
    pub drift_pct_5d: f64,
}

/// Re-score every night in `sleep` with `score_day`.
///
/// `score_day` receives the newest-first window ending on that night and
/// the check-in filed on the same date. Days it returns `None` for are left
/// out of the series. The series comes back oldest first.
pub fn compute_daily_scores<F>(
    sleep: &[SleepRecord],
    checkins: &[CheckIn],
    mut score_day: F,
) -> Vec<DailyScore>
where
    F: FnMut(&[SleepRecord], Option<&CheckIn>) -> Option<u8>,
{
    let mut sorted = sleep.to_vec();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));

    let mut scores: Vec<DailyScore> = (0..sorted.len())
        .filter_map(|i| {
            let window_end = (i + DAY_WINDOW).min(sorted.len());
            let window = &sorted[i..window_end];
            let date = window[0].date;
            let checkin = checkins.iter().find(|c| c.date == date);
            score_day(window, checkin).map(|edge_score| DailyScore { date, edge_score })
        })
        .collect();

    scores.sort_by_key(|s| s.date);
    scores
}

fn pct_change(from: u8, to: u8) -> f64 {
    if from == 0 {
        return 0.0;
    }
    (to as f64 - from as f64) * 100.0 / from as f64
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Drift over the series; `None` with fewer than three points
pub fn compute_drift(scores: &[DailyScore]) -> Option<DriftResult> {
    if scores.len() < MIN_DRIFT_POINTS {
        return None;
    }

    let mut sorted = scores.to_vec();
    sorted.sort_by_key(|s| s.date);

    let oldest = sorted.first()?.edge_score;
    let newest = sorted.last()?.edge_score;
    let pct_14d = pct_change(oldest, newest);

    let pct_5d = if sorted.len() >= SHORT_DRIFT_POINTS {
        let last5 = &sorted[sorted.len() - SHORT_DRIFT_POINTS..];
        pct_change(last5[0].edge_score, last5[SHORT_DRIFT_POINTS - 1].edge_score)
    } else {
        0.0
    };

    Some(DriftResult {
        status: DriftStatus::from_decline(-pct_14d),
        drift_pct_14d: round1(pct_14d),
        drift_pct_5d: round1(pct_5d),
    })
}
