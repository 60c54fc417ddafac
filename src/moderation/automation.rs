//! Auto-hide execution
//!
//! Takes an eligible automation decision, performs the hide through the
//! [`ModerationActions`] collaborator, and writes the audit trail. Failures
//! are contained: a failed hide becomes part of the stored automation state,
//! never an evaluation error.

use super::policy::{AutomationOutcome, AutomationState, BlockedReason};
use super::rules::TriggeredRule;
use super::{AuditEntry, AuditSink, ModerationActions, ModerationTarget};
use crate::config::AutoHidePolicy;
use crate::orm::moderation_signals::Severity;
use chrono::NaiveDateTime;
use serde_json::json;

/// Audit action name for automated hides
pub const AUDIT_ACTION_AUTO_HIDE: &str = "content.auto_hide";

/// Note attached to the hide for the moderation queue
const AUTO_HIDE_NOTE: &str = "Hidden automatically pending review.";

/// Execute the hide for an eligible decision and fold the outcome back into
/// the automation state. Non-eligible states pass through untouched.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn run_auto_hide(
    actions: &dyn ModerationActions,
    audit: &dyn AuditSink,
    policy: &AutoHidePolicy,
    target: &ModerationTarget,
    severity: Severity,
    score: i32,
    rules: &[TriggeredRule],
    mut automation: AutomationState,
    now: NaiveDateTime,
) -> AutomationState {
    if !automation.eligible {
        return automation;
    }
    // Eligibility requires a configured actor
    let actor_id = match policy.actor_id {
        Some(id) => id,
        None => return automation,
    };

    let rule_names: Vec<&str> = rules.iter().map(|rule| rule.rule.as_str()).collect();
    let reason = format!(
        "Automated hide: severity {}, score {}, rules [{}]",
        severity.as_str(),
        score,
        rule_names.join(", ")
    );
    let metadata = json!({
        "severity": severity,
        "score": score,
        "rules": rule_names,
        "source": "moderation_engine",
    });

    automation.attempted = true;
    automation.last_attempt_at = Some(now);

    match actions
        .hide(actor_id, target, &reason, Some(AUTO_HIDE_NOTE), metadata.clone())
        .await
    {
        Ok(outcome) => {
            automation.executed = true;
            automation.action = Some(crate::orm::moderation_signals::RecommendedAction::Hide);
            automation.last_outcome = Some(AutomationOutcome::Success);
            automation.last_error = None;
            log::info!(
                "auto-hid {} (previous status {}, changed: {})",
                target,
                outcome.previous.as_str(),
                outcome.changed
            );

            let mut audit_metadata = metadata;
            audit_metadata["previous_status"] = json!(outcome.previous.as_str());
            audit_metadata["status_changed"] = json!(outcome.changed);
            write_audit(
                audit,
                audit_entry(actor_id, target, &reason, "success", audit_metadata),
            )
            .await;
        }
        Err(err) => {
            let message = err.to_string();
            automation.executed = false;
            automation.blocked_reason = Some(BlockedReason::AutomationError);
            automation.last_outcome = Some(AutomationOutcome::Error);
            automation.last_error = Some(message.clone());
            log::error!("auto-hide failed for {}: {}", target, message);

            let mut audit_metadata = metadata;
            audit_metadata["error"] = json!(message);
            write_audit(
                audit,
                audit_entry(actor_id, target, &reason, "error", audit_metadata),
            )
            .await;
        }
    }

    automation
}

fn audit_entry(
    actor_id: i32,
    target: &ModerationTarget,
    reason: &str,
    outcome: &str,
    metadata: serde_json::Value,
) -> AuditEntry {
    AuditEntry {
        actor_id: Some(actor_id),
        actor_role: "system".to_string(),
        action: AUDIT_ACTION_AUTO_HIDE.to_string(),
        scope: "moderation".to_string(),
        resource_type: target.content_type.as_str().to_string(),
        resource_id: Some(target.content_id),
        reason: Some(reason.to_string()),
        method: None,
        path: None,
        status_code: None,
        outcome: outcome.to_string(),
        metadata: Some(metadata),
    }
}

/// The audit trail is best effort here: losing one audit row is better than
/// failing an evaluation whose moderation effect already happened.
async fn write_audit(audit: &dyn AuditSink, entry: AuditEntry) {
    if let Err(err) = audit.record(entry).await {
        log::warn!("audit write failed for automated moderation: {}", err);
    }
}
