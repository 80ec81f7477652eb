//! Sleep plan ahead of a high-stakes event

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EdgeError, Result};
use crate::physiology::projection::TARGET_SLEEP_MINUTES;
use crate::physiology::ClockTime;

/// Targets at or above this need the longer sleep goal
pub const HIGH_TARGET_SCORE: u8 = 85;
const HIGH_TARGET_SLEEP_MINUTES: u32 = 465;
/// Nights the sleep target applies to before the event
const PREPARATION_NIGHTS: u32 = 2;
const ASSUMED_WAKE: (u32, u32) = (7, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    BoardMeeting,
    Fundraise,
    EarningsCall,
    ProductLaunch,
    CourtCase,
    Conference,
    Custom,
}

impl EventType {
    pub fn label(&self) -> &'static str {
        match self {
            EventType::BoardMeeting => "Board meeting",
            EventType::Fundraise => "Fundraise",
            EventType::EarningsCall => "Earnings call",
            EventType::ProductLaunch => "Product launch",
            EventType::CourtCase => "Court case",
            EventType::Conference => "Conference",
            EventType::Custom => "Custom",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for EventType {
    type Err = EdgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "board_meeting" => Ok(EventType::BoardMeeting),
            "fundraise" => Ok(EventType::Fundraise),
            "earnings_call" => Ok(EventType::EarningsCall),
            "product_launch" => Ok(EventType::ProductLaunch),
            "court_case" => Ok(EventType::CourtCase),
            "conference" => Ok(EventType::Conference),
            "custom" => Ok(EventType::Custom),
            _ => Err(EdgeError::Validation(format!("Unknown event type: {}", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPlan {
    pub sleep_target_minutes: u32,
    pub optimal_bedtime: ClockTime,
    /// Nights left before the event that the sleep target covers
    pub preparation_nights: u32,
    /// Extra buffer days after travel in the 48h before the event
    pub recovery_days: u8,
}

/// Plan the nights before an event to reach `target_edge_score`
pub fn compute_event_plan(
    target_edge_score: u8,
    days_until_event: u32,
    has_upcoming_travel: bool,
) -> EventPlan {
    let sleep_target_minutes = if target_edge_score >= HIGH_TARGET_SCORE {
        HIGH_TARGET_SLEEP_MINUTES
    } else {
        TARGET_SLEEP_MINUTES
    };

    // Standard night before a fixed wake-up
    let wake = ClockTime::from_hm(ASSUMED_WAKE.0, ASSUMED_WAKE.1);
    let optimal_bedtime = ClockTime::from_minutes(wake.minutes() - TARGET_SLEEP_MINUTES as i32);

    EventPlan {
        sleep_target_minutes,
        optimal_bedtime,
        preparation_nights: days_until_event.min(PREPARATION_NIGHTS),
        recovery_days: u8::from(has_upcoming_travel),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_target_needs_longer_sleep() {
        let plan = compute_event_plan(90, 5, false);
        assert_eq!(plan.sleep_target_minutes, 465);
        assert_eq!(plan.optimal_bedtime, ClockTime::from_hm(23, 30));
        assert_eq!(plan.preparation_nights, 2);
        assert_eq!(plan.recovery_days, 0);

        assert_eq!(compute_event_plan(85, 5, false).sleep_target_minutes, 465);
        assert_eq!(compute_event_plan(84, 5, false).sleep_target_minutes, 450);
    }

    #[test]
    fn test_travel_adds_recovery_day() {
        let plan = compute_event_plan(80, 1, true);
        assert_eq!(plan.recovery_days, 1);
        assert_eq!(plan.preparation_nights, 1);
        assert_eq!(compute_event_plan(80, 0, false).preparation_nights, 0);
    }

    #[test]
    fn test_event_types_parse() {
        assert_eq!("board-meeting".parse::<EventType>().unwrap(), EventType::BoardMeeting);
        assert_eq!("court_case".parse::<EventType>().unwrap().label(), "Court case");
        assert!("wedding".parse::<EventType>().is_err());
    }

    #[test]
    fn test_plan_serializes_bedtime_as_clock() {
        let json = serde_json::to_value(compute_event_plan(70, 3, false)).unwrap();
        assert_eq!(json["optimal_bedtime"], "23:30");
    }
}
