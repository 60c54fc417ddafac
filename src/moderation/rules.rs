//! Detection rules
//!
//! Each rule inspects the extracted signals and either stays quiet or reports
//! a score with human-readable reasons. Scores are additive within a rule and
//! across rules; the aggregate drives severity and the recommended action.
//!
//! Thresholds are deliberately blunt. The goal is catching the egregious
//! cases cheaply on the write path, not competing with a trained classifier.

use super::activity::ActivitySignals;
use super::policy;
use super::text_signals::TextSignals;
use super::ContentType;
use crate::orm::moderation_signals::Severity;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Minimum accumulated score before the spam rule reports
const SPAM_TRIGGER: i32 = 3;
/// Minimum accumulated score before the link rule reports
const SUSPICIOUS_LINK_TRIGGER: i32 = 4;
/// Minimum accumulated score before the flood rule reports
const FLOOD_TRIGGER: i32 = 4;
/// Minimum accumulated score before the mass creation rule reports
const MASS_CREATION_TRIGGER: i32 = 4;

/// Same-surface flood thresholds per window
const FLOOD_BASE_10M: u64 = 4;
const FLOOD_BASE_60M: u64 = 8;
/// Interactions are cheap to produce, so their bar is higher
const FLOOD_INTERACTION_10M: u64 = 8;
const FLOOD_INTERACTION_60M: u64 = 20;

/// Portfolio-wide creation thresholds (primary surfaces only)
const MASS_CREATION_10M: u64 = 3;
const MASS_CREATION_10M_HEAVY: u64 = 6;
const MASS_CREATION_60M: u64 = 6;
const MASS_CREATION_60M_HEAVY: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Spam,
    SuspiciousLink,
    Flood,
    MassCreation,
}

impl RuleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleKind::Spam => "spam",
            RuleKind::SuspiciousLink => "suspicious_link",
            RuleKind::Flood => "flood",
            RuleKind::MassCreation => "mass_creation",
        }
    }

    /// Tolerant name lookup for config values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "spam" => Some(RuleKind::Spam),
            "suspicious_link" => Some(RuleKind::SuspiciousLink),
            "flood" => Some(RuleKind::Flood),
            "mass_creation" => Some(RuleKind::MassCreation),
            _ => None,
        }
    }
}

/// One rule's finding for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredRule {
    pub rule: RuleKind,
    pub score: i32,
    /// Severity of this rule's score alone, for queue display
    pub severity: Severity,
    /// Human-readable reasons, "; " separated
    pub description: String,
    /// The measurements the rule fired on
    pub metadata: serde_json::Value,
}

/// Run every rule and keep the ones that fired, in fixed rule order.
pub fn evaluate_rules(
    content_type: ContentType,
    text: &TextSignals,
    activity: &ActivitySignals,
) -> Vec<TriggeredRule> {
    let mut triggered = Vec::new();
    if let Some(rule) = spam_rule(text) {
        triggered.push(rule);
    }
    if let Some(rule) = suspicious_link_rule(text) {
        triggered.push(rule);
    }
    if let Some(rule) = flood_rule(content_type, activity) {
        triggered.push(rule);
    }
    if let Some(rule) = mass_creation_rule(content_type, activity) {
        triggered.push(rule);
    }
    triggered
}

fn finding(
    rule: RuleKind,
    score: i32,
    reasons: Vec<String>,
    metadata: serde_json::Value,
) -> TriggeredRule {
    TriggeredRule {
        rule,
        score,
        severity: policy::to_severity(score),
        description: reasons.join("; "),
        metadata,
    }
}

/// Repetitive or template-like text
fn spam_rule(text: &TextSignals) -> Option<TriggeredRule> {
    let mut score = 0;
    let mut reasons = Vec::new();

    // One token dominating the text
    if text.repeated_token_count >= 8 {
        score += 4;
        reasons.push(format!(
            "Top token repeated {} times",
            text.repeated_token_count
        ));
    } else if text.repeated_token_count >= 4 {
        score += 2;
        reasons.push(format!(
            "Top token repeated {} times",
            text.repeated_token_count
        ));
    }

    // Copy-pasted lines
    if text.duplicate_line_count >= 5 {
        score += 3;
        reasons.push(format!("{} duplicated lines", text.duplicate_line_count));
    } else if text.duplicate_line_count >= 2 {
        score += 2;
        reasons.push(format!("{} duplicated lines", text.duplicate_line_count));
    }

    // Low vocabulary across a non-trivial amount of text
    if text.token_count >= 20 && text.unique_token_ratio <= 0.35 {
        score += 3;
        reasons.push(format!(
            "Low lexical diversity: {:.4}",
            text.unique_token_ratio
        ));
    }

    // The same link pasted over and over
    if text.duplicate_url_count >= 3 {
        score += 3;
        reasons.push(format!("{} duplicated links", text.duplicate_url_count));
    } else if text.duplicate_url_count >= 1 {
        score += 2;
        reasons.push(format!("{} duplicated links", text.duplicate_url_count));
    }

    // Link-heavy and repetitive at the same time
    if text.url_count >= 3 && text.unique_token_ratio <= 0.45 {
        score += 2;
        reasons.push(format!("{} links in repetitive text", text.url_count));
    }

    if score < SPAM_TRIGGER {
        return None;
    }
    Some(finding(
        RuleKind::Spam,
        score,
        reasons,
        json!({
            "repeated_token_count": text.repeated_token_count,
            "duplicate_line_count": text.duplicate_line_count,
            "token_count": text.token_count,
            "unique_token_ratio": text.unique_token_ratio,
            "duplicate_url_count": text.duplicate_url_count,
            "url_count": text.url_count,
        }),
    ))
}

/// Links through shorteners or redirectors, or sheer link volume
fn suspicious_link_rule(text: &TextSignals) -> Option<TriggeredRule> {
    let mut score = 0;
    let mut reasons = Vec::new();

    if text.suspicious_url_count >= 1 {
        // First shortened link carries the weight, additional ones cap out
        score += 6 + (text.suspicious_url_count as i32 - 1).min(4);
        reasons.push(format!(
            "{} shortened or redirect links",
            text.suspicious_url_count
        ));
    }

    if text.url_count >= 4 {
        score += 2;
        reasons.push(format!("{} links in one text", text.url_count));
    }

    if score < SUSPICIOUS_LINK_TRIGGER {
        return None;
    }
    Some(finding(
        RuleKind::SuspiciousLink,
        score,
        reasons,
        json!({
            "suspicious_url_count": text.suspicious_url_count,
            "url_count": text.url_count,
        }),
    ))
}

/// Same author flooding one surface
fn flood_rule(content_type: ContentType, activity: &ActivitySignals) -> Option<TriggeredRule> {
    let (threshold_10m, threshold_60m) = if content_type.is_interaction() {
        (FLOOD_INTERACTION_10M, FLOOD_INTERACTION_60M)
    } else {
        (FLOOD_BASE_10M, FLOOD_BASE_60M)
    };

    let mut score = 0;
    let mut reasons = Vec::new();

    if activity.same_surface_last_10m >= threshold_10m * 2 {
        score += 6;
        reasons.push(format!(
            "{} {}s in 10 minutes",
            activity.same_surface_last_10m, content_type
        ));
    } else if activity.same_surface_last_10m >= threshold_10m {
        score += 4;
        reasons.push(format!(
            "{} {}s in 10 minutes",
            activity.same_surface_last_10m, content_type
        ));
    }

    if activity.same_surface_last_60m >= threshold_60m * 2 {
        score += 6;
        reasons.push(format!(
            "{} {}s in 60 minutes",
            activity.same_surface_last_60m, content_type
        ));
    } else if activity.same_surface_last_60m >= threshold_60m {
        score += 4;
        reasons.push(format!(
            "{} {}s in 60 minutes",
            activity.same_surface_last_60m, content_type
        ));
    }

    if score < FLOOD_TRIGGER {
        return None;
    }
    Some(finding(
        RuleKind::Flood,
        score,
        reasons,
        json!({
            "same_surface_last_10m": activity.same_surface_last_10m,
            "same_surface_last_60m": activity.same_surface_last_60m,
            "threshold_10m": threshold_10m,
            "threshold_60m": threshold_60m,
        }),
    ))
}

/// Same author churning out primary content across surfaces.
/// Interactions never trigger this rule; their volume lives in flood.
fn mass_creation_rule(
    content_type: ContentType,
    activity: &ActivitySignals,
) -> Option<TriggeredRule> {
    if content_type.is_interaction() {
        return None;
    }

    let mut score = 0;
    let mut reasons = Vec::new();

    if activity.portfolio_last_10m >= MASS_CREATION_10M_HEAVY {
        score += 6;
        reasons.push(format!(
            "{} creations across surfaces in 10 minutes",
            activity.portfolio_last_10m
        ));
    } else if activity.portfolio_last_10m >= MASS_CREATION_10M {
        score += 4;
        reasons.push(format!(
            "{} creations across surfaces in 10 minutes",
            activity.portfolio_last_10m
        ));
    }

    if activity.portfolio_last_60m >= MASS_CREATION_60M_HEAVY {
        score += 6;
        reasons.push(format!(
            "{} creations across surfaces in 60 minutes",
            activity.portfolio_last_60m
        ));
    } else if activity.portfolio_last_60m >= MASS_CREATION_60M {
        score += 4;
        reasons.push(format!(
            "{} creations across surfaces in 60 minutes",
            activity.portfolio_last_60m
        ));
    }

    if score < MASS_CREATION_TRIGGER {
        return None;
    }
    Some(finding(
        RuleKind::MassCreation,
        score,
        reasons,
        json!({
            "portfolio_last_10m": activity.portfolio_last_10m,
            "portfolio_last_60m": activity.portfolio_last_60m,
        }),
    ))
}
