//! Cognitive sleep age
//!
//! Expresses modeled architecture deficits as years added to the
//! chronological age. The added years come from the single largest
//! contributor, never their sum, and are capped at 15.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::architecture::{n3_baseline, SleepArchitecture};

pub const SLEEP_AGE_DISCLAIMER: &str =
    "This estimate reflects modeled sleep architecture patterns and is not a clinical assessment.";

const MAX_ADDED_YEARS: i64 = 15;
const EFFICIENCY_NORM: f64 = 90.0;
const FRAGMENTATION_NORM: f64 = 25.0;

// Full-scale range of each deficit, used to compare contributors with
// different units when naming the driver.
const N3_RANGE: f64 = 14.0; // norm 22 down to the 8% floor
const EFFICIENCY_RANGE: f64 = 25.0; // 90 down to the 65% floor
const FRAGMENTATION_RANGE: f64 = 70.0; // 25 up to the 95 ceiling
const VARIABILITY_RANGE: f64 = 12.0; // consistency 40 -> (100 - 40) / 5

/// What pushes the sleep age above chronological age
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepAgeDriver {
    BaselineAlignment,
    SlowWaveDeficit,
    LowEfficiency,
    Fragmentation,
    ScheduleVariability,
}

impl SleepAgeDriver {
    pub fn label(&self) -> &'static str {
        match self {
            SleepAgeDriver::BaselineAlignment => "baseline alignment",
            SleepAgeDriver::SlowWaveDeficit => "reduced slow-wave sleep preservation",
            SleepAgeDriver::LowEfficiency => "lower sleep efficiency",
            SleepAgeDriver::Fragmentation => "elevated fragmentation risk",
            SleepAgeDriver::ScheduleVariability => "sleep schedule variability",
        }
    }
}

impl fmt::Display for SleepAgeDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepAge {
    pub cognitive_sleep_age: u32,
    pub sleep_age_driver: SleepAgeDriver,
    pub chronological_age: u32,
}

struct Contributor {
    driver: SleepAgeDriver,
    added_years: i64,
    severity: f64,
}

/// Sleep age for a known chronological age; `None` without one
pub fn compute_sleep_age(
    architecture: &SleepArchitecture,
    age: Option<u32>,
    consistency_score: f64,
) -> Option<SleepAge> {
    let age = age?;

    let n3_deficit = n3_baseline(Some(age)) - architecture.predicted_n3_pct;
    let efficiency_deficit = EFFICIENCY_NORM - architecture.predicted_efficiency;
    let fragmentation_excess = (architecture.fragmentation_risk - FRAGMENTATION_NORM).max(0.0);
    let variability_penalty = ((100.0 - consistency_score) / 5.0).max(0.0);

    let mut contributors = Vec::with_capacity(4);
    if n3_deficit > 3.0 {
        contributors.push(Contributor {
            driver: SleepAgeDriver::SlowWaveDeficit,
            added_years: (n3_deficit * 1.5).round() as i64,
            severity: n3_deficit / N3_RANGE,
        });
    }
    if efficiency_deficit > 5.0 {
        contributors.push(Contributor {
            driver: SleepAgeDriver::LowEfficiency,
            added_years: (efficiency_deficit * 0.4).round() as i64,
            severity: efficiency_deficit / EFFICIENCY_RANGE,
        });
    }
    if fragmentation_excess > 15.0 {
        contributors.push(Contributor {
            driver: SleepAgeDriver::Fragmentation,
            added_years: (fragmentation_excess * 0.3).round() as i64,
            severity: fragmentation_excess / FRAGMENTATION_RANGE,
        });
    }
    if variability_penalty > 2.0 {
        contributors.push(Contributor {
            driver: SleepAgeDriver::ScheduleVariability,
            added_years: variability_penalty.round() as i64,
            severity: variability_penalty / VARIABILITY_RANGE,
        });
    }

    let added_years = contributors
        .iter()
        .map(|c| c.added_years)
        .max()
        .unwrap_or(0)
        .clamp(0, MAX_ADDED_YEARS);

    let driver = contributors
        .iter()
        .filter(|c| c.added_years > 0)
        .max_by(|a, b| a.severity.total_cmp(&b.severity))
        .map(|c| c.driver)
        .unwrap_or(SleepAgeDriver::BaselineAlignment);

    Some(SleepAge {
        cognitive_sleep_age: age + added_years as u32,
        sleep_age_driver: driver,
        chronological_age: age,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn architecture(n3: f64, efficiency: f64, fragmentation: f64) -> SleepArchitecture {
        SleepArchitecture {
            predicted_n3_pct: n3,
            predicted_rem_pct: 22.0,
            fragmentation_risk: fragmentation,
            predicted_efficiency: efficiency,
            rem_shift_note: None,
        }
    }

    #[test]
    fn test_requires_age() {
        assert!(compute_sleep_age(&architecture(18.0, 85.0, 20.0), None, 100.0).is_none());
    }

    #[test]
    fn test_healthy_night_matches_age() {
        let result = compute_sleep_age(&architecture(22.0, 90.0, 20.0), Some(28), 100.0).unwrap();
        assert_eq!(result.cognitive_sleep_age, 28);
        assert_eq!(result.sleep_age_driver, SleepAgeDriver::BaselineAlignment);
        assert_eq!(result.chronological_age, 28);
    }

    #[test]
    fn test_slow_wave_deficit_drives_age() {
        // Norm 22 at 25, predicted 12 -> deficit 10 -> +15 years
        let result = compute_sleep_age(&architecture(12.0, 88.0, 20.0), Some(25), 100.0).unwrap();
        assert_eq!(result.cognitive_sleep_age, 40);
        assert_eq!(result.sleep_age_driver, SleepAgeDriver::SlowWaveDeficit);
    }

    #[test]
    fn test_largest_addend_not_sum() {
        // Efficiency 70 -> +8, fragmentation 60 -> +11 (35 excess), variability 60 -> +8
        let result = compute_sleep_age(&architecture(15.0, 70.0, 60.0), Some(45), 60.0).unwrap();
        assert_eq!(result.cognitive_sleep_age, 45 + 11);
    }

    #[test]
    fn test_driver_uses_normalized_severity() {
        // Fragmentation adds more years (+6 vs +4) but efficiency is
        // closer to its floor (0.44 vs 0.29 of range)
        let result = compute_sleep_age(&architecture(15.0, 79.0, 45.0), Some(45), 100.0).unwrap();
        assert_eq!(result.cognitive_sleep_age, 51);
        assert_eq!(result.sleep_age_driver, SleepAgeDriver::LowEfficiency);
    }

    #[test]
    fn test_added_years_capped() {
        let result = compute_sleep_age(&architecture(8.0, 65.0, 95.0), Some(29), 40.0).unwrap();
        assert!(result.cognitive_sleep_age <= 29 + 15);
        assert!(result.cognitive_sleep_age >= 29);
    }

    #[test]
    fn test_driver_labels() {
        assert_eq!(SleepAgeDriver::Fragmentation.to_string(), "elevated fragmentation risk");
        assert_eq!(
            serde_json::to_string(&SleepAgeDriver::ScheduleVariability).unwrap(),
            "\"schedule_variability\""
        );
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_sleep_age_bounds(
            age in 18u32..90u32,
            n3 in 8.0f64..28.0,
            efficiency in 65.0f64..98.0,
            fragmentation in 0.0f64..95.0,
            consistency in prop::sample::select(vec![40.0, 60.0, 80.0, 100.0])
        ) {
            let result = compute_sleep_age(
                &architecture(n3, efficiency, fragmentation),
                Some(age),
                consistency,
            ).unwrap();
            prop_assert!(result.cognitive_sleep_age >= age);
            prop_assert!(result.cognitive_sleep_age <= age + 15);
        }

        #[test]
        fn test_sleep_age_monotonic(
            age in 18u32..90u32,
            n3 in 8.0f64..28.0,
            efficiency in 65.0f64..98.0,
            fragmentation in 0.0f64..95.0,
            bump in 0.0f64..30.0
        ) {
            let base = compute_sleep_age(&architecture(n3, efficiency, fragmentation), Some(age), 80.0)
                .unwrap();

            // More fragmentation never makes the sleep age younger
            let fragmented = compute_sleep_age(
                &architecture(n3, efficiency, (fragmentation + bump).min(95.0)),
                Some(age),
                80.0,
            ).unwrap();
            prop_assert!(fragmented.cognitive_sleep_age >= base.cognitive_sleep_age);

            // Better efficiency never makes it older
            let efficient = compute_sleep_age(
                &architecture(n3, (efficiency + bump).min(98.0), fragmentation),
                Some(age),
                80.0,
            ).unwrap();
            prop_assert!(efficient.cognitive_sleep_age <= base.cognitive_sleep_age);
        }
    }
}
