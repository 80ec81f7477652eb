//! Prediction orchestration
//!
//! [`PredictionEngine`] reads one window of history from a
//! [`HistoryStore`] and runs every estimator over it:
//!
//! 1. Rules and risk level
//! 2. Sleep pressure and circadian alignment
//! 3. Architecture, consistency and the day's Edge Score
//! 4. Cognitive and peak windows, 72h projection and sleep age
//! 5. Drift over the re-scored daily series
//! 6. Protocol actions, insights and recommendations
//!
//! An estimator that cannot run leaves its field empty; only fewer than
//! `min_sleep_records` nights stops the evaluation, and that is reported
//! as [`Evaluation::InsufficientData`] rather than as a low score.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, instrument, warn};

use crate::drift::{self, DriftResult};
use crate::edge_score::{
    self, ComponentLabel, EdgeScoreResult, LegacyInputs, PhysiologicalInputs, ScoreBreakdown,
    ScoreInputs, ScoringMode, DEFAULT_CONSISTENCY,
};
use crate::error::Result;
use crate::models::{CheckIn, Chronotype, DailyScore, SleepRecord, UserProfile};
use crate::physiology::{
    self, CircadianAlignment, ClockTime, CognitiveWindows, PeakWindows, Projection72h,
    ScheduleAnchor, SleepAge, SleepArchitecture, SleepPressure, SLEEP_AGE_DISCLAIMER,
};
use crate::protocols::{self, ProtocolAction, Recommendations};
use crate::rules::{self, Rule};
use crate::store::HistoryStore;

/// Hours ahead a non-low risk applies to
pub const RISK_HORIZON_HOURS: u8 = 72;

/// How the composite is scored when a physiological estimator is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringPolicy {
    /// Score the day with the legacy self-report strategy
    #[default]
    FallbackToLegacy,
    /// Keep the physiological strategy with neutral stand-ins
    DefaultPhysiological,
}

impl fmt::Display for ScoringPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringPolicy::FallbackToLegacy => write!(f, "fallback_to_legacy"),
            ScoringPolicy::DefaultPhysiological => write!(f, "default_physiological"),
        }
    }
}

impl std::str::FromStr for ScoringPolicy {
    type Err = crate::error::EdgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fallback_to_legacy" | "legacy" => Ok(ScoringPolicy::FallbackToLegacy),
            "default_physiological" | "physiological" => Ok(ScoringPolicy::DefaultPhysiological),
            _ => Err(crate::error::EdgeError::Configuration(format!(
                "Unknown scoring policy: {}",
                s
            ))),
        }
    }
}

/// Model tuning knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Nights and check-ins read per evaluation
    pub window_days: usize,

    /// Nights required before anything is scored
    pub min_sleep_records: usize,

    pub scoring_policy: ScoringPolicy,

    /// Alignment assumed when circadian alignment cannot be estimated
    pub default_alignment_pct: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            window_days: 14,
            min_sleep_records: 3,
            scoring_policy: ScoringPolicy::default(),
            default_alignment_pct: 70.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Elevated,
    High,
}

impl RiskLevel {
    /// Chronic short sleep or two rules make risk high, one rule elevated
    pub fn from_rules(rules: &[Rule]) -> Self {
        if rules.contains(&Rule::ChronicShortSleep) || rules.len() >= 2 {
            RiskLevel::High
        } else if rules.len() == 1 {
            RiskLevel::Elevated
        } else {
            RiskLevel::Low
        }
    }

    pub fn horizon_hours(&self) -> Option<u8> {
        match self {
            RiskLevel::Low => None,
            _ => Some(RISK_HORIZON_HOURS),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RiskLevel::Low => "No sustained sleep risk detected",
            RiskLevel::Elevated => "One warning sign in recent nights",
            RiskLevel::High => "Multiple or chronic warning signs in recent nights",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Elevated => write!(f, "elevated"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// Estimator output that was unavailable when scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultedInput {
    SleepPressure,
    CircadianAlignment,
}

impl fmt::Display for DefaultedInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultedInput::SleepPressure => write!(f, "sleep_pressure"),
            DefaultedInput::CircadianAlignment => write!(f, "circadian_alignment"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub user_id: String,
    pub date: NaiveDate,
    pub timezone: String,
    pub chronotype: Chronotype,

    pub risk_level: RiskLevel,
    pub risk_horizon_hours: Option<u8>,
    pub triggered_rules: Vec<Rule>,
    pub protocol_actions: Vec<ProtocolAction>,

    pub edge_score: u8,
    pub strategic_clarity: ComponentLabel,
    pub emotional_regulation: ComponentLabel,
    pub cognitive_stamina: ComponentLabel,
    pub scoring_mode: ScoringMode,
    /// Under the legacy fallback these were bypassed, otherwise replaced
    /// by neutral values
    pub defaulted_inputs: Vec<DefaultedInput>,
    pub score_breakdown: Option<ScoreBreakdown>,

    pub sleep_pressure: Option<SleepPressure>,
    pub circadian: Option<CircadianAlignment>,
    pub sleep_architecture: SleepArchitecture,
    pub cognitive_windows: CognitiveWindows,
    pub peak_windows: PeakWindows,
    pub projection_72h: Option<Projection72h>,
    pub sleep_age: Option<SleepAge>,
    pub sleep_age_disclaimer: Option<String>,

    pub drift: Option<DriftResult>,
    pub daily_scores: Vec<DailyScore>,

    pub insights: Vec<String>,
    pub recommendations: Recommendations,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Evaluation {
    Complete(Box<PredictionResult>),
    InsufficientData { sleep_records: usize },
}

impl Evaluation {
    pub fn result(&self) -> Option<&PredictionResult> {
        match self {
            Evaluation::Complete(result) => Some(result),
            Evaluation::InsufficientData { .. } => None,
        }
    }

    pub fn into_result(self) -> Option<PredictionResult> {
        match self {
            Evaluation::Complete(result) => Some(*result),
            Evaluation::InsufficientData { .. } => None,
        }
    }
}

/// Which estimators produced a value for one day's window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InputCoverage {
    pressure: bool,
    circadian: bool,
    consistency: bool,
}

/// Every model output for one day's window
struct DayModel {
    pressure: Option<SleepPressure>,
    circadian: Option<CircadianAlignment>,
    architecture: SleepArchitecture,
    consistency: f64,
    score: EdgeScoreResult,
    defaulted: Vec<DefaultedInput>,
    coverage: InputCoverage,
}

pub struct PredictionEngine<S> {
    store: S,
    config: ModelConfig,
}

impl<S: HistoryStore> PredictionEngine<S> {
    pub fn new(store: S) -> Self {
        PredictionEngine {
            store,
            config: ModelConfig::default(),
        }
    }

    pub fn with_config(store: S, config: ModelConfig) -> Self {
        PredictionEngine { store, config }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Evaluate `date` using the habitual bedtime for circadian alignment
    pub fn evaluate(&self, user: &str, date: NaiveDate) -> Result<Evaluation> {
        self.evaluate_with_plan(user, date, None)
    }

    /// Evaluate `date`, comparing `planned_bedtime` (if any) against the
    /// biological readiness time instead of the habitual bedtime
    #[instrument(skip(self), fields(policy = %self.config.scoring_policy))]
    pub fn evaluate_with_plan(
        &self,
        user: &str,
        date: NaiveDate,
        planned_bedtime: Option<ClockTime>,
    ) -> Result<Evaluation> {
        let sleep = self
            .store
            .fetch_sleep_history(user, date, self.config.window_days)?;
        if sleep.len() < self.config.min_sleep_records {
            debug!(records = sleep.len(), "not enough nights to evaluate");
            return Ok(Evaluation::InsufficientData {
                sleep_records: sleep.len(),
            });
        }

        let checkins = self
            .store
            .fetch_checkins(user, date, self.config.window_days)?;
        let profile = self.store.fetch_profile(user)?.unwrap_or_default();
        let today_checkin = checkins.iter().find(|c| c.date == date);

        let triggered_rules = rules::evaluate_rules(&sleep, &checkins, date);
        let risk_level = RiskLevel::from_rules(&triggered_rules);
        debug!(rules = ?triggered_rules, risk = %risk_level, "rules evaluated");

        let day = self.model_day(&sleep, today_checkin, &profile, planned_bedtime);
        if !day.defaulted.is_empty() {
            warn!(
                missing = ?day.defaulted,
                mode = %day.score.scoring_mode,
                "physiological inputs unavailable, scoring degraded"
            );
        }

        let pressure_pct = day
            .pressure
            .as_ref()
            .map_or(0.0, |p| p.sleep_pressure_pct);
        let cognitive_windows = physiology::compute_cognitive_windows(
            sleep.first(),
            &sleep,
            pressure_pct,
            profile.chronotype,
        );
        let peak_windows =
            physiology::compute_peak_windows(sleep.first(), &sleep, &checkins, profile.chronotype);

        let projection_72h = day.circadian.as_ref().map(|c| {
            physiology::compute_projection_72h(
                &sleep,
                c.circadian_alignment_pct,
                day.score.edge_score as f64,
            )
        });

        let sleep_age =
            physiology::compute_sleep_age(&day.architecture, profile.age, day.consistency);
        debug!(
            edge_score = day.score.edge_score,
            sleep_age = ?sleep_age.as_ref().map(|a| a.cognitive_sleep_age),
            "day scored"
        );

        // Only days scored from the same inputs as today enter the series
        let daily_scores = drift::compute_daily_scores(&sleep, &checkins, |window, checkin| {
            let past = self.model_day(window, checkin, &profile, None);
            (past.coverage == day.coverage).then_some(past.score.edge_score)
        });
        let drift = drift::compute_drift(&daily_scores);
        debug!(drift = ?drift.as_ref().map(|d| d.status), "drift computed");

        let result = PredictionResult {
            user_id: user.to_string(),
            date,
            timezone: profile.timezone.clone(),
            chronotype: profile.chronotype,
            risk_level,
            risk_horizon_hours: risk_level.horizon_hours(),
            protocol_actions: protocols::protocol_actions(&triggered_rules, risk_level),
            insights: protocols::predictive_insights(&triggered_rules, &sleep),
            recommendations: protocols::recommendations(&sleep, date),
            triggered_rules,
            edge_score: day.score.edge_score,
            strategic_clarity: day.score.strategic_clarity,
            emotional_regulation: day.score.emotional_regulation,
            cognitive_stamina: day.score.cognitive_stamina,
            scoring_mode: day.score.scoring_mode,
            defaulted_inputs: day.defaulted,
            score_breakdown: day.score.breakdown,
            sleep_pressure: day.pressure,
            circadian: day.circadian,
            sleep_architecture: day.architecture,
            cognitive_windows,
            peak_windows,
            projection_72h,
            sleep_age_disclaimer: sleep_age.as_ref().map(|_| SLEEP_AGE_DISCLAIMER.to_string()),
            sleep_age,
            drift,
            daily_scores,
        };

        Ok(Evaluation::Complete(Box::new(result)))
    }

    /// Run the scoring estimators over one newest-first window
    fn model_day(
        &self,
        window: &[SleepRecord],
        checkin: Option<&CheckIn>,
        profile: &UserProfile,
        planned_bedtime: Option<ClockTime>,
    ) -> DayModel {
        let pressure = physiology::compute_sleep_pressure(window);
        let circadian =
            physiology::compute_circadian_alignment(window, planned_bedtime, profile.chronotype);

        let alignment_pct = circadian
            .as_ref()
            .map_or(self.config.default_alignment_pct, |c| c.circadian_alignment_pct);
        let architecture =
            physiology::compute_sleep_architecture(window.first(), window, alignment_pct, profile.age);
        let measured_consistency = physiology::consistency_score(window, ScheduleAnchor::Midpoint);
        let coverage = InputCoverage {
            pressure: pressure.is_some(),
            circadian: circadian.is_some(),
            consistency: measured_consistency.is_some(),
        };
        let consistency = measured_consistency.unwrap_or(DEFAULT_CONSISTENCY);

        let mut defaulted = Vec::new();
        if pressure.is_none() {
            defaulted.push(DefaultedInput::SleepPressure);
        }
        if circadian.is_none() {
            defaulted.push(DefaultedInput::CircadianAlignment);
        }

        let inputs = if defaulted.is_empty()
            || self.config.scoring_policy == ScoringPolicy::DefaultPhysiological
        {
            ScoreInputs::Physiological(PhysiologicalInputs {
                sleep_pressure_pct: pressure.as_ref().map_or(0.0, |p| p.sleep_pressure_pct),
                circadian_alignment_pct: alignment_pct,
                architecture: &architecture,
                consistency_score: consistency,
                checkin,
            })
        } else {
            ScoreInputs::Legacy(LegacyInputs {
                latest_sleep: window.first(),
                recent_sleep: window,
                checkin,
            })
        };
        let score = edge_score::compute_edge_score(&inputs);

        DayModel {
            pressure,
            circadian,
            architecture,
            consistency,
            score,
            defaulted,
            coverage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drift::DriftStatus;
    use crate::physiology::AlignmentLevel;
    use crate::store::InMemoryStore;
    use chrono::Duration;

    const USER: &str = "user-1";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 10).unwrap()
    }

    fn night(days_ago: i64, minutes: u32) -> SleepRecord {
        let date = today() - Duration::days(days_ago);
        let bedtime = (date - Duration::days(1)).and_hms_opt(23, 0, 0).unwrap();
        SleepRecord {
            duration_minutes: Some(minutes),
            quality_rating: Some(4),
            bedtime: Some(bedtime),
            wake_time: Some(bedtime + Duration::minutes(minutes as i64)),
            ..SleepRecord::new(date)
        }
    }

    fn engine(records: Vec<SleepRecord>) -> PredictionEngine<InMemoryStore> {
        PredictionEngine::new(InMemoryStore::new().with_sleep(USER, records))
    }

    #[test]
    fn test_risk_levels() {
        assert_eq!(RiskLevel::from_rules(&[]), RiskLevel::Low);
        assert_eq!(RiskLevel::from_rules(&[Rule::ClarityDrop]), RiskLevel::Elevated);
        assert_eq!(RiskLevel::from_rules(&[Rule::ChronicShortSleep]), RiskLevel::High);
        assert_eq!(
            RiskLevel::from_rules(&[Rule::ClarityDrop, Rule::LowQuality3Nights]),
            RiskLevel::High
        );
        assert_eq!(RiskLevel::Low.horizon_hours(), None);
        assert_eq!(RiskLevel::Elevated.horizon_hours(), Some(72));
    }

    #[test]
    fn test_two_nights_is_insufficient() {
        let engine = engine(vec![night(0, 480), night(1, 480)]);
        let evaluation = engine.evaluate(USER, today()).unwrap();
        assert_eq!(evaluation, Evaluation::InsufficientData { sleep_records: 2 });
        assert!(evaluation.result().is_none());
    }

    #[test]
    fn test_three_nights_scores_physiologically() {
        let engine = engine((0..3).map(|d| night(d, 480)).collect());
        let result = engine.evaluate(USER, today()).unwrap().into_result().unwrap();

        assert_eq!(result.scoring_mode, ScoringMode::Physiological);
        assert!(result.defaulted_inputs.is_empty());
        assert!(result.score_breakdown.is_some());
        assert!(result.projection_72h.is_some());
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert_eq!(result.risk_horizon_hours, None);
        // No age in the default profile
        assert!(result.sleep_age.is_none());
        assert!(result.sleep_age_disclaimer.is_none());
        // Earlier days lack circadian input, today lacks measured consistency
        assert_eq!(result.daily_scores.len(), 1);
        assert!(result.drift.is_none());
        assert_eq!(result.chronotype, Chronotype::Intermediate);
        assert_eq!(result.timezone, "UTC");
    }

    #[test]
    fn test_missing_bedtimes_fall_back_to_legacy() {
        let records: Vec<SleepRecord> = (0..4)
            .map(|d| SleepRecord {
                bedtime: None,
                wake_time: None,
                ..night(d, 480)
            })
            .collect();
        let result = engine(records)
            .evaluate(USER, today())
            .unwrap()
            .into_result()
            .unwrap();

        assert_eq!(result.scoring_mode, ScoringMode::Legacy);
        assert_eq!(
            result.defaulted_inputs,
            vec![DefaultedInput::SleepPressure, DefaultedInput::CircadianAlignment]
        );
        assert!(result.score_breakdown.is_none());
        assert!(result.circadian.is_none());
        assert!(result.projection_72h.is_none());
    }

    #[test]
    fn test_default_physiological_policy_fills_inputs() {
        let records: Vec<SleepRecord> = (0..4)
            .map(|d| SleepRecord {
                bedtime: None,
                wake_time: None,
                ..night(d, 480)
            })
            .collect();
        let config = ModelConfig {
            scoring_policy: ScoringPolicy::DefaultPhysiological,
            ..ModelConfig::default()
        };
        let engine =
            PredictionEngine::with_config(InMemoryStore::new().with_sleep(USER, records), config);
        let result = engine.evaluate(USER, today()).unwrap().into_result().unwrap();

        assert_eq!(result.scoring_mode, ScoringMode::Physiological);
        assert_eq!(result.defaulted_inputs.len(), 2);
        let breakdown = result.score_breakdown.unwrap();
        assert_eq!(breakdown.circadian_score, 70.0);
        assert_eq!(breakdown.sleep_pressure_score, 100.0);
    }

    #[test]
    fn test_planned_bedtime_changes_alignment() {
        let engine = engine((0..5).map(|d| night(d, 480)).collect());
        let habitual = engine.evaluate(USER, today()).unwrap().into_result().unwrap();
        let planned = engine
            .evaluate_with_plan(USER, today(), Some(ClockTime::from_hm(21, 45)))
            .unwrap()
            .into_result()
            .unwrap();

        let habitual = habitual.circadian.unwrap();
        let planned = planned.circadian.unwrap();
        assert_eq!(habitual.circadian_alignment_pct, 0.0);
        assert_eq!(planned.circadian_alignment_pct, 100.0);
        assert_eq!(planned.interpretation, AlignmentLevel::High);
    }

    #[test]
    fn test_future_records_are_ignored() {
        let mut records: Vec<SleepRecord> = (0..3).map(|d| night(d, 480)).collect();
        records.push(night(-1, 200));
        let result = engine(records)
            .evaluate(USER, today())
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(result.daily_scores.len(), 1);
        assert_eq!(result.daily_scores.last().unwrap().date, today());
    }

    #[test]
    fn test_steady_schedule_does_not_drift() {
        let engine = engine((0..14).map(|d| night(d, 480)).collect());
        let result = engine.evaluate(USER, today()).unwrap().into_result().unwrap();

        // Windows of five or more nights carry every input
        assert_eq!(result.daily_scores.len(), 10);
        assert!(result
            .daily_scores
            .iter()
            .all(|s| s.edge_score == result.edge_score));
        let drift = result.drift.unwrap();
        assert_eq!(drift.status, DriftStatus::Stable);
        assert_eq!(drift.drift_pct_14d, 0.0);
    }

    #[test]
    fn test_legacy_days_stay_out_of_physiological_series() {
        let mut records: Vec<SleepRecord> = (0..8).map(|d| night(d, 480)).collect();
        for record in records.iter_mut().skip(5) {
            record.bedtime = None;
            record.wake_time = None;
        }
        let result = engine(records)
            .evaluate(USER, today())
            .unwrap()
            .into_result()
            .unwrap();

        assert_eq!(result.scoring_mode, ScoringMode::Physiological);
        // Only today's window holds five timed nights
        assert_eq!(result.daily_scores.len(), 1);
        assert!(result.drift.is_none());
    }

    #[test]
    fn test_evaluation_serializes_with_status() {
        let evaluation = Evaluation::InsufficientData { sleep_records: 1 };
        let json = serde_json::to_value(&evaluation).unwrap();
        assert_eq!(json["status"], "insufficient_data");
        assert_eq!(json["sleep_records"], 1);
    }
}
