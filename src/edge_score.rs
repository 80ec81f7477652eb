//! Edge Score aggregation
//!
//! Combines the day's inputs into a 0-100 composite plus three qualitative
//! sub-ratings. Two strategies exist and are selected by the shape of the
//! input:
//!
//! - **Legacy**: self-reported duration, quality, regularity, evening
//!   behaviour and energy, weighted 30/25/20/15/10
//! - **Physiological**: sleep pressure, circadian alignment, modeled
//!   architecture and fragmentation/regularity, weighted equally
//!
//! Only the physiological strategy surfaces a per-component breakdown.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{CheckIn, SleepRecord};
use crate::physiology::architecture::SleepArchitecture;
use crate::physiology::consistency::{self, ScheduleAnchor};
use crate::physiology::projection::{sleep_debt_minutes, TARGET_SLEEP_MINUTES};

/// Regularity assumed when fewer than five complete nights exist
pub const DEFAULT_CONSISTENCY: f64 = 70.0;
const DEBT_FLOOR_MINUTES: u32 = 240;
const N3_REFERENCE_PCT: f64 = 25.0;
const REM_REFERENCE_PCT: f64 = 25.0;

/// Qualitative tier for a sub-rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentLabel {
    Strong,
    Moderate,
    #[serde(rename = "Slightly Reduced")]
    SlightlyReduced,
    Reduced,
}

impl ComponentLabel {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            ComponentLabel::Strong
        } else if score >= 50.0 {
            ComponentLabel::Moderate
        } else if score >= 30.0 {
            ComponentLabel::SlightlyReduced
        } else {
            ComponentLabel::Reduced
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentLabel::Strong => "Strong",
            ComponentLabel::Moderate => "Moderate",
            ComponentLabel::SlightlyReduced => "Slightly Reduced",
            ComponentLabel::Reduced => "Reduced",
        }
    }
}

impl fmt::Display for ComponentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which strategy produced a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    Legacy,
    Physiological,
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringMode::Legacy => write!(f, "legacy"),
            ScoringMode::Physiological => write!(f, "physiological"),
        }
    }
}

/// Self-reported inputs for the legacy strategy
#[derive(Debug, Clone, Copy)]
pub struct LegacyInputs<'a> {
    pub latest_sleep: Option<&'a SleepRecord>,
    pub recent_sleep: &'a [SleepRecord],
    pub checkin: Option<&'a CheckIn>,
}

/// Model outputs for the physiological strategy
#[derive(Debug, Clone, Copy)]
pub struct PhysiologicalInputs<'a> {
    pub sleep_pressure_pct: f64,
    pub circadian_alignment_pct: f64,
    pub architecture: &'a SleepArchitecture,
    /// Midpoint regularity score (40-100)
    pub consistency_score: f64,
    pub checkin: Option<&'a CheckIn>,
}

#[derive(Debug, Clone, Copy)]
pub enum ScoreInputs<'a> {
    Legacy(LegacyInputs<'a>),
    Physiological(PhysiologicalInputs<'a>),
}

/// Component scores behind a physiological composite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub sleep_pressure_score: f64,
    pub circadian_score: f64,
    pub architecture_score: f64,
    pub fragmentation_consistency_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeScoreResult {
    pub edge_score: u8,
    pub strategic_clarity: ComponentLabel,
    pub emotional_regulation: ComponentLabel,
    pub cognitive_stamina: ComponentLabel,
    pub scoring_mode: ScoringMode,
    pub breakdown: Option<ScoreBreakdown>,
}

pub fn compute_edge_score(inputs: &ScoreInputs<'_>) -> EdgeScoreResult {
    match inputs {
        ScoreInputs::Legacy(legacy) => score_legacy(legacy),
        ScoreInputs::Physiological(physio) => score_physiological(physio),
    }
}

fn composite(total: f64) -> u8 {
    total.clamp(0.0, 100.0).round() as u8
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// Legacy component scores, each 0-100

pub fn score_duration(minutes: Option<u32>) -> f64 {
    let Some(minutes) = minutes else {
        return 50.0;
    };
    let hours = minutes as f64 / 60.0;
    if (7.0..=9.0).contains(&hours) {
        100.0
    } else if (6.0..7.0).contains(&hours) {
        75.0
    } else if (5.0..6.0).contains(&hours) {
        50.0
    } else if (4.0..5.0).contains(&hours) {
        30.0
    } else if hours < 4.0 {
        15.0
    } else if hours <= 10.0 {
        85.0
    } else {
        60.0
    }
}

pub fn score_quality(rating: Option<u8>) -> f64 {
    rating.map_or(60.0, |r| (r as f64 - 1.0) / 4.0 * 100.0)
}

pub fn score_behavioral(sleep: Option<&SleepRecord>) -> f64 {
    let Some(sleep) = sleep else {
        return 70.0;
    };
    let mut score: f64 = 100.0;
    if sleep.caffeine_after_2pm == Some(true) {
        score -= 15.0;
    }
    if sleep.alcohol_tonight == Some(true) {
        score -= 20.0;
    }
    match sleep.screen_time_minutes {
        Some(s) if s >= 90 => score -= 25.0,
        Some(s) if s >= 60 => score -= 15.0,
        Some(s) if s >= 30 => score -= 5.0,
        _ => {}
    }
    if sleep.exercise_today == Some(true) {
        score += 5.0;
    }
    score.clamp(0.0, 100.0)
}

/// Energy rating (1-5) as 0-100; 60 without a check-in
pub fn score_energy(checkin: Option<&CheckIn>) -> f64 {
    checkin
        .and_then(|c| c.energy_rating)
        .map_or(60.0, |e| (e as f64 - 1.0) / 4.0 * 100.0)
}

fn score_mental_clarity(checkin: Option<&CheckIn>) -> f64 {
    checkin
        .and_then(|c| c.mental_clarity)
        .map_or(60.0, |c| (c as f64 - 1.0) / 9.0 * 100.0)
}

fn score_stress_inverted(checkin: Option<&CheckIn>) -> f64 {
    checkin
        .and_then(|c| c.stress_level)
        .map_or(70.0, |s| (10.0 - s as f64) / 9.0 * 100.0)
}

fn score_sleep_debt_inverted(records: &[SleepRecord]) -> f64 {
    let debt = sleep_debt_minutes(records);
    if debt == 0 {
        return 100.0;
    }
    let max_debt = 5.0 * (TARGET_SLEEP_MINUTES - DEBT_FLOOR_MINUTES) as f64;
    (100.0 - debt as f64 / max_debt * 100.0).max(0.0)
}

fn score_legacy(inputs: &LegacyInputs<'_>) -> EdgeScoreResult {
    let duration = score_duration(inputs.latest_sleep.and_then(|s| s.duration_minutes));
    let quality = score_quality(inputs.latest_sleep.and_then(|s| s.quality_rating));
    let consistency = consistency::consistency_score(inputs.recent_sleep, ScheduleAnchor::Midpoint)
        .unwrap_or(DEFAULT_CONSISTENCY);
    let behavioral = score_behavioral(inputs.latest_sleep);
    let energy = score_energy(inputs.checkin);

    let total =
        duration * 0.30 + quality * 0.25 + consistency * 0.20 + behavioral * 0.15 + energy * 0.10;

    let clarity = score_mental_clarity(inputs.checkin) * 0.40 + quality * 0.35 + consistency * 0.25;
    let emotional = score_stress_inverted(inputs.checkin) * 0.35 + quality * 0.35 + energy * 0.30;
    let stamina =
        duration * 0.40 + energy * 0.30 + score_sleep_debt_inverted(inputs.recent_sleep) * 0.30;

    EdgeScoreResult {
        edge_score: composite(total),
        strategic_clarity: ComponentLabel::from_score(clarity),
        emotional_regulation: ComponentLabel::from_score(emotional),
        cognitive_stamina: ComponentLabel::from_score(stamina),
        scoring_mode: ScoringMode::Legacy,
        breakdown: None,
    }
}

/// Blend of N3 and REM share against a 25% reference, plus efficiency
pub fn architecture_score(architecture: &SleepArchitecture) -> f64 {
    let n3 = (architecture.predicted_n3_pct / N3_REFERENCE_PCT * 100.0).min(100.0);
    let rem = (architecture.predicted_rem_pct / REM_REFERENCE_PCT * 100.0).min(100.0);
    n3 * 0.35 + rem * 0.35 + architecture.predicted_efficiency * 0.30
}

fn score_physiological(inputs: &PhysiologicalInputs<'_>) -> EdgeScoreResult {
    let pressure = (100.0 - 1.5 * inputs.sleep_pressure_pct).max(0.0);
    let circadian = inputs.circadian_alignment_pct.clamp(0.0, 100.0);
    let architecture = architecture_score(inputs.architecture);
    let fragmentation =
        ((100.0 - inputs.architecture.fragmentation_risk) + inputs.consistency_score) / 2.0;
    let energy = score_energy(inputs.checkin);

    let total = (pressure + circadian + architecture + fragmentation) * 0.25;

    let clarity = pressure * 0.30 + circadian * 0.30 + architecture * 0.25 + energy * 0.15;
    let emotional = architecture * 0.35 + fragmentation * 0.25 + circadian * 0.20 + energy * 0.20;
    let stamina = pressure * 0.35 + fragmentation * 0.25 + architecture * 0.20 + energy * 0.20;

    EdgeScoreResult {
        edge_score: composite(total),
        strategic_clarity: ComponentLabel::from_score(clarity),
        emotional_regulation: ComponentLabel::from_score(emotional),
        cognitive_stamina: ComponentLabel::from_score(stamina),
        scoring_mode: ScoringMode::Physiological,
        breakdown: Some(ScoreBreakdown {
            sleep_pressure_score: round1(pressure),
            circadian_score: round1(circadian),
            architecture_score: round1(architecture),
            fragmentation_consistency_score: round1(fragmentation),
        }),
    }
}
