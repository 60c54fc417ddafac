//! Severity tiers, recommended actions, and auto-hide eligibility
//!
//! `decide_automation` is pure: it looks at one evaluation's findings plus the
//! configured policy and produces the automation state that gets persisted.
//! Actually executing an eligible decision is [`super::automation`]'s job.

use super::rules::{RuleKind, TriggeredRule};
use super::PublishState;
use crate::config::AutoHidePolicy;
use crate::orm::moderation_signals::{RecommendedAction, Severity};
use crate::orm::ModerationStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Map an aggregate score to its severity tier.
pub fn to_severity(score: i32) -> Severity {
    if score >= 12 {
        Severity::Critical
    } else if score >= 8 {
        Severity::High
    } else if score >= 4 {
        Severity::Medium
    } else if score >= 1 {
        Severity::Low
    } else {
        Severity::None
    }
}

/// What a moderator should do about the finding.
///
/// High severity maps to hide only when a high-confidence rule fired; a pure
/// flood finding is too often a humans-being-busy false positive, so it gets
/// restrict instead.
pub fn recommend_action(severity: Severity, rules: &[TriggeredRule]) -> RecommendedAction {
    match severity {
        Severity::Critical => RecommendedAction::Hide,
        Severity::High => {
            let confident = rules.iter().any(|r| {
                matches!(
                    r.rule,
                    RuleKind::Spam | RuleKind::SuspiciousLink | RuleKind::MassCreation
                )
            });
            if confident {
                RecommendedAction::Hide
            } else {
                RecommendedAction::Restrict
            }
        }
        Severity::Medium | Severity::Low => RecommendedAction::Review,
        Severity::None => RecommendedAction::None,
    }
}

/// Why the automation did not (or will not) act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockedReason {
    /// Nothing triggered, nothing to act on
    NoTriggeredRules,
    /// The finding recommends something weaker than hide
    RecommendedActionNotHide,
    /// Kill switch is off
    AutoHideDisabled,
    /// A moderator already hid or restricted this content
    AlreadyModerated,
    /// Drafts and archived content have no audience to protect
    ContentNotPublic,
    SeverityBelowThreshold,
    /// None of the triggered rules is in the configured allow-list
    RuleNotAllowed,
    /// No service account configured to act as
    AutoHideActorMissing,
    /// The hide call itself failed
    AutomationError,
}

impl BlockedReason {
    pub fn as_str(self) -> &'static str {
        match self {
            BlockedReason::NoTriggeredRules => "no_triggered_rules",
            BlockedReason::RecommendedActionNotHide => "recommended_action_not_hide",
            BlockedReason::AutoHideDisabled => "auto_hide_disabled",
            BlockedReason::AlreadyModerated => "already_moderated",
            BlockedReason::ContentNotPublic => "content_not_public",
            BlockedReason::SeverityBelowThreshold => "severity_below_threshold",
            BlockedReason::RuleNotAllowed => "rule_not_allowed",
            BlockedReason::AutoHideActorMissing => "auto_hide_actor_missing",
            BlockedReason::AutomationError => "automation_error",
        }
    }
}

/// Did the automation run, and how did it go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationOutcome {
    Success,
    Error,
}

/// Decision and execution record for one evaluation, stored as JSON on the
/// signal row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationState {
    /// Value of the kill switch at evaluation time
    pub enabled: bool,
    /// Whether the policy allows acting on this finding
    pub eligible: bool,
    pub blocked_reason: Option<BlockedReason>,
    /// An execution was started (stays true even on failure)
    pub attempted: bool,
    /// The hide went through
    pub executed: bool,
    /// The action that was executed, when one was
    pub action: Option<RecommendedAction>,
    pub last_outcome: Option<AutomationOutcome>,
    pub last_error: Option<String>,
    pub last_attempt_at: Option<NaiveDateTime>,
}

impl AutomationState {
    /// Decision skeleton: not eligible until the checks say otherwise.
    pub fn pending(enabled: bool) -> Self {
        Self {
            enabled,
            eligible: false,
            blocked_reason: None,
            attempted: false,
            executed: false,
            action: None,
            last_outcome: None,
            last_error: None,
            last_attempt_at: None,
        }
    }

    /// State written when an evaluation found nothing.
    pub fn no_rules(enabled: bool) -> Self {
        Self {
            blocked_reason: Some(BlockedReason::NoTriggeredRules),
            ..Self::pending(enabled)
        }
    }
}

/// Run the eligibility checks in order and report the first blocker.
///
/// The checks run even with the kill switch off so the stored state shows
/// what would have happened; the disabled reason then takes precedence.
pub fn decide_automation(
    policy: &AutoHidePolicy,
    severity: Severity,
    recommended_action: RecommendedAction,
    rules: &[TriggeredRule],
    moderation_status: ModerationStatus,
    publish_state: PublishState,
) -> AutomationState {
    let blocked = if recommended_action != RecommendedAction::Hide {
        if rules.is_empty() {
            Some(BlockedReason::NoTriggeredRules)
        } else {
            Some(BlockedReason::RecommendedActionNotHide)
        }
    } else if moderation_status != ModerationStatus::Visible {
        Some(BlockedReason::AlreadyModerated)
    } else if !publish_state.is_public() {
        Some(BlockedReason::ContentNotPublic)
    } else if severity < policy.min_severity {
        Some(BlockedReason::SeverityBelowThreshold)
    } else if !rules.iter().any(|r| policy.rules.contains(&r.rule)) {
        Some(BlockedReason::RuleNotAllowed)
    } else if policy.actor_id.is_none() {
        Some(BlockedReason::AutoHideActorMissing)
    } else {
        None
    };

    let mut state = AutomationState::pending(policy.enabled);
    if policy.enabled {
        state.eligible = blocked.is_none();
        state.blocked_reason = blocked;
    } else {
        state.blocked_reason = Some(BlockedReason::AutoHideDisabled);
    }
    state
}
