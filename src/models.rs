use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EdgeError, Result};

/// Circadian phase preference of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chronotype {
    Early,
    #[default]
    Intermediate,
    Late,
}

impl Chronotype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Chronotype::Early => "early",
            Chronotype::Intermediate => "intermediate",
            Chronotype::Late => "late",
        }
    }
}

impl fmt::Display for Chronotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Chronotype {
    type Err = EdgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "early" => Ok(Chronotype::Early),
            "intermediate" => Ok(Chronotype::Intermediate),
            "late" => Ok(Chronotype::Late),
            _ => Err(EdgeError::Validation(format!("Unknown chronotype: {}", s))),
        }
    }
}

/// One night of self-reported sleep
///
/// `date` identifies the night; `bedtime` and `wake_time` are wall-clock
/// timestamps in the user's own timezone.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SleepRecord {
    /// Calendar date the record is filed under
    pub date: NaiveDate,

    /// Total sleep in minutes
    pub duration_minutes: Option<u32>,

    /// Subjective quality (1-5)
    pub quality_rating: Option<u8>,

    /// Time the user went to bed
    pub bedtime: Option<NaiveDateTime>,

    /// Time the user woke up
    pub wake_time: Option<NaiveDateTime>,

    /// Caffeine consumed after 2pm
    pub caffeine_after_2pm: Option<bool>,

    /// Alcohol consumed before bed
    pub alcohol_tonight: Option<bool>,

    /// Exercised during the day
    pub exercise_today: Option<bool>,

    /// Screen exposure before bed in minutes
    pub screen_time_minutes: Option<u32>,

    /// Daytime nap duration in minutes
    pub nap_duration_minutes: Option<u32>,
}

impl SleepRecord {
    /// Empty record for a date; every measurement unset
    pub fn new(date: NaiveDate) -> Self {
        SleepRecord {
            date,
            ..Default::default()
        }
    }

    pub fn duration_hours(&self) -> Option<f64> {
        self.duration_minutes.map(|m| m as f64 / 60.0)
    }

    /// Midpoint between bedtime and wake time, when both are known
    pub fn midpoint(&self) -> Option<NaiveDateTime> {
        match (self.bedtime, self.wake_time) {
            (Some(bed), Some(wake)) => Some(bed + (wake - bed) / 2),
            _ => None,
        }
    }

    /// Range checks applied before a record is accepted into storage
    pub fn validate(&self) -> Result<()> {
        if let Some(minutes) = self.duration_minutes {
            if minutes > 24 * 60 {
                return Err(EdgeError::Validation(format!(
                    "Sleep duration {} min exceeds 24 hours",
                    minutes
                )));
            }
        }
        if let Some(q) = self.quality_rating {
            if !(1..=5).contains(&q) {
                return Err(EdgeError::Validation(format!(
                    "Quality rating {} outside 1-5",
                    q
                )));
            }
        }
        if let (Some(bed), Some(wake)) = (self.bedtime, self.wake_time) {
            if wake <= bed {
                return Err(EdgeError::Validation(
                    "Wake time must be after bedtime".to_string(),
                ));
            }
        }
        if let Some(screen) = self.screen_time_minutes {
            if screen > 24 * 60 {
                return Err(EdgeError::Validation(format!(
                    "Screen time {} min exceeds 24 hours",
                    screen
                )));
            }
        }
        if let Some(nap) = self.nap_duration_minutes {
            if nap > 12 * 60 {
                return Err(EdgeError::Validation(format!(
                    "Nap duration {} min exceeds 12 hours",
                    nap
                )));
            }
        }
        Ok(())
    }
}

/// Daily subjective check-in
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CheckIn {
    pub date: NaiveDate,

    /// Perceived sleep quality (1-10)
    pub sleep_quality: Option<u8>,

    /// Mental clarity (1-10)
    pub mental_clarity: Option<u8>,

    /// Energy (1-5)
    pub energy_rating: Option<u8>,

    /// Stress (1-10)
    pub stress_level: Option<u8>,
}

impl CheckIn {
    pub fn new(date: NaiveDate) -> Self {
        CheckIn {
            date,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("sleep_quality", self.sleep_quality, 10),
            ("mental_clarity", self.mental_clarity, 10),
            ("energy_rating", self.energy_rating, 5),
            ("stress_level", self.stress_level, 10),
        ];
        for (field, value, max) in checks {
            if let Some(v) = value {
                if v < 1 || v > max {
                    return Err(EdgeError::Validation(format!(
                        "{} {} outside 1-{}",
                        field, v, max
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Per-user settings consumed by the estimators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// IANA timezone name
    pub timezone: String,
    pub chronotype: Chronotype,
    /// Chronological age in years
    pub age: Option<u32>,
}

impl Default for UserProfile {
    fn default() -> Self {
        UserProfile {
            timezone: "UTC".to_string(),
            chronotype: Chronotype::Intermediate,
            age: None,
        }
    }
}

/// Composite score reconstructed for one day of the window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyScore {
    pub date: NaiveDate,
    pub edge_score: u8,
}
