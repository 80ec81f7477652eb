//! "What if" projections for a single evening.
//!
//! Four preset scenarios carry fixed assessments. A custom scenario is
//! assembled from individual factors; each factor contributes one
//! statement and names the parts of the night it speaks to.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::clock::ClockTime;
use crate::error::{EdgeError, Result};

/// Screen time below this is not worth a statement
const SCREEN_MINUTES_THRESHOLD: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    LateDinner,
    TwoDrinks,
    RedEyeFlight,
    Screen90BeforeBed,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::LateDinner => "late_dinner",
            Preset::TwoDrinks => "two_drinks",
            Preset::RedEyeFlight => "red_eye_flight",
            Preset::Screen90BeforeBed => "screen_90_before_bed",
        }
    }

    fn outcome(&self) -> SimulationOutcome {
        let (rem, latency, windows, summary) = match self {
            Preset::LateDinner => (
                "Late dinner is associated with reduced REM consolidation in the second half of the night.",
                "Sleep latency may increase by approximately 15-25 minutes.",
                "Your deep work window may shift later by 20-30 minutes tomorrow.",
                "Late dinner is associated with delayed digestion and may impact sleep architecture. Consider eating at least 2-3 hours before bed.",
            ),
            Preset::TwoDrinks => (
                "Alcohol consumption is associated with reduced REM consolidation in the second half of the night.",
                "Initial sleep latency may decrease, but sleep fragmentation may increase in the second half of the night.",
                "Cognitive recovery may extend into the following day.",
                "Alcohol consumption at night is associated with REM suppression and fragmented sleep. Cognitive recovery may extend into the following day.",
            ),
            Preset::RedEyeFlight => (
                "Circadian disruption from travel is associated with altered REM timing and reduced consolidation.",
                "Sleep latency may be variable; jet lag may extend recovery by 1-2 days per time zone crossed.",
                "Cognitive windows may shift according to destination time zone over 2-4 days.",
                "Red-eye flights are associated with significant circadian misalignment. Recovery may take several days depending on time zones crossed.",
            ),
            Preset::Screen90BeforeBed => (
                "Blue light exposure before bed is associated with delayed melatonin onset and may shift REM later.",
                "Sleep latency may increase by approximately 20-40 minutes.",
                "Your morning cognitive peak may shift later by 30-45 minutes.",
                "Screen use 90 minutes before bed is associated with delayed sleep onset and shifted circadian timing. Consider a wind-down routine without screens.",
            ),
        };
        SimulationOutcome {
            rem_suppression_estimate: rem.to_string(),
            sleep_latency_change: latency.to_string(),
            cognitive_window_shift: windows.to_string(),
            summary: summary.to_string(),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Preset {
    type Err = EdgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "late_dinner" => Ok(Preset::LateDinner),
            "two_drinks" => Ok(Preset::TwoDrinks),
            "red_eye_flight" => Ok(Preset::RedEyeFlight),
            "screen_90_before_bed" => Ok(Preset::Screen90BeforeBed),
            _ => Err(EdgeError::Validation(format!("Unknown scenario: {}", s))),
        }
    }
}

/// Factors of a custom evening; unset factors are ignored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFactors {
    pub alcohol_at: Option<ClockTime>,
    /// Positive is later
    pub bedtime_shift_minutes: Option<i32>,
    pub nap_minutes: Option<u32>,
    pub screen_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scenario", rename_all = "snake_case")]
pub enum Scenario {
    Preset { preset: Preset },
    Custom(CustomFactors),
}

impl Scenario {
    /// `custom` takes `factors`; any other name must be a preset
    pub fn from_name(name: &str, factors: CustomFactors) -> Result<Self> {
        if name.eq_ignore_ascii_case("custom") {
            Ok(Scenario::Custom(factors))
        } else {
            Ok(Scenario::Preset {
                preset: name.parse()?,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub rem_suppression_estimate: String,
    pub sleep_latency_change: String,
    pub cognitive_window_shift: String,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Aspect {
    Rem,
    Latency,
    Windows,
}

struct Statement {
    text: String,
    aspect: Aspect,
}

fn custom_statements(factors: &CustomFactors) -> Vec<Statement> {
    let mut statements = Vec::new();

    if let Some(at) = factors.alcohol_at {
        statements.push(Statement {
            text: format!(
                "Alcohol consumption at {} is associated with reduced REM consolidation in the second half of the night.",
                at
            ),
            aspect: Aspect::Rem,
        });
    }
    if let Some(shift) = factors.bedtime_shift_minutes.filter(|&m| m != 0) {
        let direction = if shift > 0 { "later" } else { "earlier" };
        statements.push(Statement {
            text: format!(
                "A bedtime shift of {} minutes {} may shift your cognitive windows accordingly.",
                shift.unsigned_abs(),
                direction
            ),
            aspect: Aspect::Windows,
        });
    }
    if let Some(nap) = factors.nap_minutes.filter(|&m| m > 0) {
        statements.push(Statement {
            text: format!(
                "A {}-minute nap may partially offset sleep pressure; avoid napping after 3 PM to protect nighttime sleep.",
                nap
            ),
            aspect: Aspect::Latency,
        });
    }
    if let Some(screen) = factors
        .screen_minutes
        .filter(|&m| m >= SCREEN_MINUTES_THRESHOLD)
    {
        statements.push(Statement {
            text: format!(
                "{} minutes of screen use before bed is associated with increased sleep latency and delayed melatonin onset.",
                screen
            ),
            aspect: Aspect::Latency,
        });
    }

    statements
}

pub fn run_simulation(scenario: &Scenario) -> SimulationOutcome {
    let factors = match scenario {
        Scenario::Preset { preset } => return preset.outcome(),
        Scenario::Custom(factors) => factors,
    };

    let statements = custom_statements(factors);
    let first = |aspect: Aspect, fallback: &str| {
        statements
            .iter()
            .find(|s| s.aspect == aspect)
            .map_or_else(|| fallback.to_string(), |s| s.text.clone())
    };

    let summary = if statements.is_empty() {
        "Select factors to see projected impact.".to_string()
    } else {
        statements
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    };

    SimulationOutcome {
        rem_suppression_estimate: first(
            Aspect::Rem,
            "Custom scenario impact depends on the combination of factors.",
        ),
        sleep_latency_change: first(
            Aspect::Latency,
            "Sleep architecture may be affected by the selected factors.",
        ),
        cognitive_window_shift: first(
            Aspect::Windows,
            "Cognitive windows may shift based on the combined inputs.",
        ),
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_parse() {
        assert_eq!("late_dinner".parse::<Preset>().unwrap(), Preset::LateDinner);
        assert_eq!("Two-Drinks".parse::<Preset>().unwrap(), Preset::TwoDrinks);
        assert_eq!(
            "screen_90_before_bed".parse::<Preset>().unwrap(),
            Preset::Screen90BeforeBed
        );
        assert!(matches!("custom".parse::<Preset>(), Err(EdgeError::Validation(_))));
    }

    #[test]
    fn test_scenario_from_name() {
        let factors = CustomFactors {
            nap_minutes: Some(20),
            ..CustomFactors::default()
        };
        assert_eq!(
            Scenario::from_name("Custom", factors.clone()).unwrap(),
            Scenario::Custom(factors.clone())
        );
        assert_eq!(
            Scenario::from_name("late-dinner", factors.clone()).unwrap(),
            Scenario::Preset {
                preset: Preset::LateDinner
            }
        );
        assert!(Scenario::from_name("jet_ski", factors).is_err());
    }

    #[test]
    fn test_preset_outcome() {
        let outcome = run_simulation(&Scenario::Preset {
            preset: Preset::RedEyeFlight,
        });
        assert!(outcome.rem_suppression_estimate.starts_with("Circadian disruption"));
        assert!(outcome.summary.contains("time zones crossed"));
    }

    #[test]
    fn test_empty_custom_scenario() {
        let outcome = run_simulation(&Scenario::Custom(CustomFactors::default()));
        assert_eq!(outcome.summary, "Select factors to see projected impact.");
        assert!(outcome.rem_suppression_estimate.starts_with("Custom scenario"));
    }

    #[test]
    fn test_custom_factors_fill_their_aspects() {
        let factors = CustomFactors {
            alcohol_at: Some(ClockTime::from_hm(21, 30)),
            bedtime_shift_minutes: Some(-45),
            nap_minutes: Some(20),
            screen_minutes: Some(90),
        };
        let outcome = run_simulation(&Scenario::Custom(factors));

        assert!(outcome.rem_suppression_estimate.contains("at 21:30"));
        assert!(outcome.cognitive_window_shift.contains("45 minutes earlier"));
        // The nap statement comes before the screen statement
        assert!(outcome.sleep_latency_change.starts_with("A 20-minute nap"));
        assert!(outcome.summary.contains("90 minutes of screen use"));
        assert_eq!(outcome.summary.matches(". ").count(), 3);
    }

    #[test]
    fn test_small_factors_are_ignored() {
        let factors = CustomFactors {
            bedtime_shift_minutes: Some(0),
            nap_minutes: Some(0),
            screen_minutes: Some(45),
            ..CustomFactors::default()
        };
        let outcome = run_simulation(&Scenario::Custom(factors));
        assert_eq!(outcome.summary, "Select factors to see projected impact.");
    }

    #[test]
    fn test_scenario_serializes_tagged() {
        let json = serde_json::to_value(Scenario::Preset {
            preset: Preset::TwoDrinks,
        })
        .unwrap();
        assert_eq!(json["scenario"], "preset");
        assert_eq!(json["preset"], "two_drinks");
    }
}
