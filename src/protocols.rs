//! Actionable guidance attached to a prediction
//!
//! Protocol actions map triggered rules to short instructions, insights
//! summarize the near-term outlook and recommendations give a bedtime,
//! an optional nap and a wind-down tip.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::SleepRecord;
use crate::physiology::clock::ClockTime;
use crate::physiology::projection::sleep_debt_minutes;
use crate::prediction::RiskLevel;
use crate::rules::Rule;

const MAX_ACTIONS: usize = 3;
const MAX_INSIGHTS: usize = 2;
const INSIGHT_DEBT_MINUTES: u32 = 120;
const NAP_DEBT_MINUTES: u32 = 60;
const RECENT_SHORT_MINUTES: u32 = 420;
const SLEEP_OPPORTUNITY_MINUTES: i64 = 7 * 60 + 30;

pub const NAP_SUGGESTION: &str = "20-min nap before 3pm";

pub const WIND_DOWN_TIPS: [&str; 5] = [
    "Reduce screens 1h before bed",
    "Try 4-7-8 breathing before sleep",
    "Dim lights 30min before bed",
    "Avoid caffeine after 2 PM",
    "Keep bedroom cool (65–68°F)",
];

const SEVEN_HOURS_INSIGHT: &str = "Aim for 7+ hours tonight to recover.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolAction {
    /// Rule name, suffixed with `_secondary` for follow-up actions
    #[serde(rename = "type")]
    pub action_type: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendations {
    pub optimal_bedtime: Option<ClockTime>,
    pub nap_suggestion: Option<String>,
    pub wind_down_tip: String,
}

/// Primary and secondary instruction for a rule
fn protocol_for(rule: Rule) -> (&'static str, &'static str) {
    match rule {
        Rule::ShortSleep3Nights => (
            "Protect sleep tonight — aim for 7+ hours",
            "Block 9–11 AM for deep work",
        ),
        Rule::ChronicShortSleep => (
            "Recovery: prioritize sleep for 2–3 nights",
            "Reduce meeting load; defer non-urgent decisions",
        ),
        Rule::SleepMidpointShift => (
            "Stabilize bedtime and wake time",
            "Avoid caffeine after 2 PM",
        ),
        Rule::LowQuality3Nights => (
            "Wind-down: reduce screens 1h before bed",
            "Consider earlier bedtime",
        ),
        Rule::ClarityDrop => ("Light cognitive load today", "Protect tonight's sleep"),
    }
}

fn push_action(actions: &mut Vec<ProtocolAction>, action_type: String, text: &str) {
    if actions.len() < MAX_ACTIONS && !actions.iter().any(|a| a.text == text) {
        actions.push(ProtocolAction {
            action_type,
            text: text.to_string(),
        });
    }
}

/// Up to three de-duplicated actions; high risk adds secondary actions
pub fn protocol_actions(rules: &[Rule], risk: RiskLevel) -> Vec<ProtocolAction> {
    let mut actions: Vec<ProtocolAction> = Vec::with_capacity(MAX_ACTIONS);

    for rule in rules {
        let (primary, _) = protocol_for(*rule);
        push_action(&mut actions, rule.as_str().to_string(), primary);
    }

    if risk == RiskLevel::High {
        for rule in rules {
            let (_, secondary) = protocol_for(*rule);
            push_action(&mut actions, format!("{}_secondary", rule), secondary);
        }
    }

    actions
}

pub fn predictive_insights(rules: &[Rule], sleep: &[SleepRecord]) -> Vec<String> {
    let mut insights: Vec<&str> = Vec::new();

    if rules.contains(&Rule::ShortSleep3Nights) {
        insights.push(SEVEN_HOURS_INSIGHT);
    }
    if rules.contains(&Rule::ChronicShortSleep) {
        insights.push("Prioritize sleep for 2–3 nights to restore cognitive capacity.");
    }
    if rules.contains(&Rule::SleepMidpointShift) {
        insights.push("Stabilize bedtime tonight for better focus tomorrow.");
    }

    if sleep_debt_minutes(sleep) > INSIGHT_DEBT_MINUTES {
        insights.push("Sleep debt building – consider a wind-down routine tonight.");
    }

    let short_recent = sleep
        .iter()
        .take(3)
        .filter(|r| r.duration_minutes.is_some_and(|m| m < RECENT_SHORT_MINUTES))
        .count();
    if short_recent >= 2 && !insights.contains(&SEVEN_HOURS_INSIGHT) {
        insights.push("Based on last 3 nights, your cognitive performance may dip tomorrow.");
    }

    insights
        .into_iter()
        .take(MAX_INSIGHTS)
        .map(str::to_string)
        .collect()
}

/// Tip of the day, stable for a given date
pub fn wind_down_tip(date: NaiveDate) -> &'static str {
    WIND_DOWN_TIPS[date.ordinal0() as usize % WIND_DOWN_TIPS.len()]
}

pub fn recommendations(sleep: &[SleepRecord], date: NaiveDate) -> Recommendations {
    let optimal_bedtime = sleep
        .first()
        .and_then(|r| r.wake_time)
        .map(|wake| ClockTime::from((wake - Duration::minutes(SLEEP_OPPORTUNITY_MINUTES)).time()));

    let nap_suggestion =
        (sleep_debt_minutes(sleep) > NAP_DEBT_MINUTES).then(|| NAP_SUGGESTION.to_string());

    Recommendations {
        optimal_bedtime,
        nap_suggestion,
        wind_down_tip: wind_down_tip(date).to_string(),
    }
}
