//! Time-of-day cognitive windows
//!
//! Four daily windows are anchored on chronotype and then compressed or
//! moved by the previous night:
//!
//! - Short sleep narrows the windows and pulls the morning peaks earlier
//!   while pushing the afternoon dip later
//! - Elevated sleep pressure and an irregular schedule narrow them further
//!
//! Narrowing happens around each window's centre and never goes below 45
//! minutes.

use serde::{Deserialize, Serialize};

use super::clock::{ClockTime, ClockWindow, MINUTES_PER_DAY};
use super::consistency::{self, ScheduleAnchor};
use super::pressure::ELEVATED_PRESSURE_PCT;
use crate::models::{Chronotype, SleepRecord};

const MIN_WINDOW_SPAN_MINUTES: i32 = 45;
const DEFAULT_DURATION_MINUTES: u32 = 480;
const DEFAULT_CONSISTENCY: f64 = 80.0;
const EMOTIONAL_SHRINK_FACTOR: f64 = 0.8;
const CREATIVE_SHRINK_FACTOR: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CognitiveWindows {
    pub deep_work: ClockWindow,
    pub emotional_regulation: ClockWindow,
    pub reaction_time_dip: ClockWindow,
    pub creative_insight: ClockWindow,
}

impl CognitiveWindows {
    /// Unadjusted windows for a chronotype
    pub fn baseline(chronotype: Chronotype) -> Self {
        match chronotype {
            Chronotype::Early => CognitiveWindows {
                deep_work: ClockWindow::from_hm((8, 0), (11, 0)),
                emotional_regulation: ClockWindow::from_hm((10, 0), (12, 0)),
                reaction_time_dip: ClockWindow::from_hm((13, 30), (14, 30)),
                creative_insight: ClockWindow::from_hm((19, 30), (21, 0)),
            },
            Chronotype::Intermediate => CognitiveWindows {
                deep_work: ClockWindow::from_hm((9, 20), (11, 40)),
                emotional_regulation: ClockWindow::from_hm((11, 0), (13, 0)),
                reaction_time_dip: ClockWindow::from_hm((14, 40), (15, 30)),
                creative_insight: ClockWindow::from_hm((20, 30), (22, 0)),
            },
            Chronotype::Late => CognitiveWindows {
                deep_work: ClockWindow::from_hm((10, 0), (12, 30)),
                emotional_regulation: ClockWindow::from_hm((12, 0), (14, 0)),
                reaction_time_dip: ClockWindow::from_hm((15, 30), (16, 30)),
                creative_insight: ClockWindow::from_hm((21, 30), (23, 0)),
            },
        }
    }
}

/// Narrow a window around its centre by `shrink_pct` percent
pub fn shrink_window(window: ClockWindow, shrink_pct: f64) -> ClockWindow {
    shrink_window_with_floor(window, shrink_pct, MIN_WINDOW_SPAN_MINUTES)
}

/// [`shrink_window`] with a caller-chosen minimum span in minutes
pub fn shrink_window_with_floor(
    window: ClockWindow,
    shrink_pct: f64,
    min_span_minutes: i32,
) -> ClockWindow {
    let start = window.start.minutes();
    let span = window.span_minutes();
    let new_span =
        ((span as f64 * (1.0 - shrink_pct / 100.0)).round() as i32).max(min_span_minutes);
    let offset = ((span - new_span) as f64 / 2.0).round() as i32;
    ClockWindow::new(
        ClockTime::from_minutes(start + offset),
        ClockTime::from_minutes(start + offset + new_span),
    )
}

/// Move a window by `minutes`, pinned inside the same day
pub fn shift_window(window: ClockWindow, minutes: i32) -> ClockWindow {
    ClockWindow::new(
        ClockTime::from_minutes((window.start.minutes() + minutes).max(0)),
        ClockTime::from_minutes((window.end.minutes() + minutes).min(MINUTES_PER_DAY - 1)),
    )
}

pub fn compute_cognitive_windows(
    latest_sleep: Option<&SleepRecord>,
    recent_sleep: &[SleepRecord],
    sleep_pressure_pct: f64,
    chronotype: Chronotype,
) -> CognitiveWindows {
    let mut windows = CognitiveWindows::baseline(chronotype);

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

    if sleep_pressure_pct > ELEVATED_PRESSURE_PCT {
        shrink_pct += (sleep_pressure_pct / 2.0).min(15.0);
    }

    let consistency = consistency::consistency_score(recent_sleep, ScheduleAnchor::Midpoint)
        .unwrap_or(DEFAULT_CONSISTENCY);
    if consistency < 60.0 {
        shrink_pct += 15.0;
    } else if consistency < 80.0 {
        shrink_pct += 8.0;
    }

    if shrink_pct > 0.0 {
        windows.deep_work = shrink_window(windows.deep_work, shrink_pct);
        windows.emotional_regulation =
            shrink_window(windows.emotional_regulation, shrink_pct * EMOTIONAL_SHRINK_FACTOR);
        windows.creative_insight =
            shrink_window(windows.creative_insight, shrink_pct * CREATIVE_SHRINK_FACTOR);
    }
    if shift_minutes > 0 {
        windows.deep_work = shift_window(windows.deep_work, -shift_minutes);
        windows.emotional_regulation = shift_window(windows.emotional_regulation, -shift_minutes);
        windows.reaction_time_dip = shift_window(windows.reaction_time_dip, shift_minutes);
        windows.creative_insight = shift_window(windows.creative_insight, -shift_minutes);
    }

    windows
}
