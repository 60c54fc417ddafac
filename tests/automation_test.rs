//! Auto-hide automation integration tests
//!
//! Full pipeline with the automation enabled: policy gates, hide execution
//! through the actions backend, audit trail, and failure containment.

mod common;

use chrono::{Duration, Utc};
use common::fixtures::{
    auto_hide_config, harness, interaction_content, published_content, single_shortener_text,
    spam_wall, target,
};
use modwatch::config::ModerationConfig;
use modwatch::moderation::automation::AUDIT_ACTION_AUTO_HIDE;
use modwatch::moderation::{AutomationOutcome, BlockedReason, ContentType, RuleKind};
use modwatch::orm::moderation_signals::{
    RecommendedAction, Severity, SignalStatus, TriggerSource,
};
use modwatch::orm::ModerationStatus;

#[tokio::test]
async fn test_critical_spam_is_auto_hidden() {
    let h = harness(auto_hide_config());
    let t = target(ContentType::Article, 1);
    h.content.insert_content(t, published_content(7, &spam_wall()));

    let evaluation = h
        .engine
        .evaluate(ContentType::Article, 1, TriggerSource::Publish)
        .await
        .expect("Evaluation should succeed");

    let automation = &evaluation.automation;
    assert!(automation.eligible);
    assert!(automation.attempted);
    assert!(automation.executed, "Critical spam must be hidden");
    assert_eq!(automation.action, Some(RecommendedAction::Hide));
    assert_eq!(automation.last_outcome, Some(AutomationOutcome::Success));
    assert!(automation.last_error.is_none());
    assert!(automation.last_attempt_at.is_some());

    // The hide went through the actions backend as the service account
    let calls = h.actions.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].actor_user_id, 99);
    assert_eq!(calls[0].target, t);
    assert_eq!(
        calls[0].reason,
        "Automated hide: severity critical, score 24, rules [spam, suspicious_link]"
    );
    assert_eq!(
        calls[0].note.as_deref(),
        Some("Hidden automatically pending review.")
    );
    assert_eq!(
        h.content.moderation_status(&t),
        Some(ModerationStatus::Hidden)
    );

    // Audit trail
    let entries = h.audit.entries();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.action, AUDIT_ACTION_AUTO_HIDE);
    assert_eq!(entry.outcome, "success");
    assert_eq!(entry.actor_id, Some(99));
    assert_eq!(entry.actor_role, "system");
    assert_eq!(entry.scope, "moderation");
    assert_eq!(entry.resource_type, "article");
    assert_eq!(entry.resource_id, Some(1));
    let metadata = entry.metadata.as_ref().expect("Audit metadata present");
    assert_eq!(metadata["severity"], "critical");
    assert_eq!(metadata["score"], 24);
    assert_eq!(metadata["previous_status"], "visible");
    assert_eq!(metadata["status_changed"], true);

    // The stored row carries the execution record
    let record = evaluation.record.expect("Signal row present");
    assert_eq!(record.automation["executed"], true);
    assert_eq!(record.automation["last_outcome"], "success");
}

#[tokio::test]
async fn test_article_velocity_is_auto_hidden() {
    let h = harness(auto_hide_config());
    let t = target(ContentType::Article, 30);
    let now = Utc::now().naive_utc();

    // Innocuous text; the finding comes purely from creation velocity
    h.content.insert_content(
        t,
        published_content(
            7,
            "Notes from the workshop: we compared three finishing techniques \
             on oak, walnut, and maple.",
        ),
    );
    // Six articles and two videos inside ten minutes
    for i in 1..=6 {
        h.content
            .record_creation(ContentType::Article, 7, now - Duration::minutes(i));
    }
    h.content
        .record_creation(ContentType::Video, 7, now - Duration::minutes(2));
    h.content
        .record_creation(ContentType::Video, 7, now - Duration::minutes(4));

    let evaluation = h
        .engine
        .evaluate(ContentType::Article, 30, TriggerSource::Publish)
        .await
        .expect("Evaluation should succeed");

    // Flood 4 (6 articles vs threshold 4) + mass_creation 10 (8 vs 6 and 6)
    assert_eq!(evaluation.score, 14);
    assert_eq!(evaluation.severity, Severity::Critical);
    assert_eq!(evaluation.triggered_rules.len(), 2);
    assert_eq!(evaluation.triggered_rules[0].rule, RuleKind::Flood);
    assert_eq!(evaluation.triggered_rules[1].rule, RuleKind::MassCreation);
    assert_eq!(evaluation.activity_signals.same_surface_last_10m, 6);
    assert_eq!(evaluation.activity_signals.portfolio_last_10m, 8);

    // mass_creation is in the allow-list, so the hide goes through
    assert!(evaluation.automation.executed);
    let calls = h.actions.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].reason,
        "Automated hide: severity critical, score 14, rules [flood, mass_creation]"
    );
    assert_eq!(
        h.content.moderation_status(&t),
        Some(ModerationStatus::Hidden)
    );
}

#[tokio::test]
async fn test_kill_switch_blocks_execution() {
    let config = ModerationConfig {
        auto_hide_enabled: false,
        ..auto_hide_config()
    };
    let h = harness(config);
    let t = target(ContentType::Article, 2);
    h.content.insert_content(t, published_content(7, &spam_wall()));

    let evaluation = h
        .engine
        .evaluate(ContentType::Article, 2, TriggerSource::Publish)
        .await
        .expect("Evaluation should succeed");

    assert!(!evaluation.automation.enabled);
    assert!(!evaluation.automation.eligible);
    assert_eq!(
        evaluation.automation.blocked_reason,
        Some(BlockedReason::AutoHideDisabled)
    );
    assert!(!evaluation.automation.attempted);
    assert!(h.actions.calls().is_empty());
    assert!(h.audit.entries().is_empty());
    assert_eq!(
        h.content.moderation_status(&t),
        Some(ModerationStatus::Visible)
    );

    // The finding itself is still recorded for the queue
    let record = evaluation.record.expect("Signal row present");
    assert_eq!(record.status, SignalStatus::Active);
    assert_eq!(record.severity, Severity::Critical);
}

#[tokio::test]
async fn test_high_severity_below_floor_is_not_hidden() {
    let h = harness(auto_hide_config());
    let t = target(ContentType::Article, 3);
    h.content
        .insert_content(t, published_content(7, &single_shortener_text()));

    let evaluation = h
        .engine
        .evaluate(ContentType::Article, 3, TriggerSource::Publish)
        .await
        .expect("Evaluation should succeed");

    // One shortener in link-heavy text: high, and hide-recommended, but the
    // floor is critical
    assert_eq!(evaluation.score, 8);
    assert_eq!(evaluation.severity, Severity::High);
    assert_eq!(evaluation.recommended_action, RecommendedAction::Hide);
    assert_eq!(
        evaluation.automation.blocked_reason,
        Some(BlockedReason::SeverityBelowThreshold)
    );
    assert!(!evaluation.automation.attempted);
    assert!(h.actions.calls().is_empty());
    assert!(evaluation.record.is_some(), "Finding still goes to the queue");
}

#[tokio::test]
async fn test_min_severity_floor_can_be_lowered() {
    let config = ModerationConfig {
        auto_hide_min_severity: "high".to_string(),
        ..auto_hide_config()
    };
    let h = harness(config);
    let t = target(ContentType::Article, 4);
    h.content
        .insert_content(t, published_content(7, &single_shortener_text()));

    let evaluation = h
        .engine
        .evaluate(ContentType::Article, 4, TriggerSource::Publish)
        .await
        .expect("Evaluation should succeed");

    assert!(evaluation.automation.executed);
    let calls = h.actions.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].reason.contains("severity high, score 8"));
    assert_eq!(
        h.content.moderation_status(&t),
        Some(ModerationStatus::Hidden)
    );
}

#[tokio::test]
async fn test_unlisted_rules_block_execution() {
    let config = ModerationConfig {
        auto_hide_rules: "mass_creation".to_string(),
        ..auto_hide_config()
    };
    let h = harness(config);
    let t = target(ContentType::Article, 5);
    h.content.insert_content(t, published_content(7, &spam_wall()));

    let evaluation = h
        .engine
        .evaluate(ContentType::Article, 5, TriggerSource::Publish)
        .await
        .expect("Evaluation should succeed");

    // Spam and suspicious_link fired, neither is in the allow-list
    assert_eq!(evaluation.severity, Severity::Critical);
    assert_eq!(
        evaluation.automation.blocked_reason,
        Some(BlockedReason::RuleNotAllowed)
    );
    assert!(h.actions.calls().is_empty());
}

#[tokio::test]
async fn test_missing_actor_blocks_execution() {
    let config = ModerationConfig {
        auto_hide_actor_id: String::new(),
        ..auto_hide_config()
    };
    let h = harness(config);
    let t = target(ContentType::Article, 6);
    h.content.insert_content(t, published_content(7, &spam_wall()));

    let evaluation = h
        .engine
        .evaluate(ContentType::Article, 6, TriggerSource::Publish)
        .await
        .expect("Evaluation should succeed");

    assert_eq!(
        evaluation.automation.blocked_reason,
        Some(BlockedReason::AutoHideActorMissing)
    );
    assert!(!evaluation.automation.attempted);
    assert!(h.actions.calls().is_empty());
}

#[tokio::test]
async fn test_failed_hide_is_contained() {
    let h = harness(auto_hide_config());
    let t = target(ContentType::Article, 7);
    h.content.insert_content(t, published_content(7, &spam_wall()));
    h.actions.fail_with("storage offline");

    let evaluation = h
        .engine
        .evaluate(ContentType::Article, 7, TriggerSource::Publish)
        .await
        .expect("A failed hide must not fail the evaluation");

    let automation = &evaluation.automation;
    assert!(automation.attempted);
    assert!(!automation.executed);
    assert_eq!(automation.blocked_reason, Some(BlockedReason::AutomationError));
    assert_eq!(automation.last_outcome, Some(AutomationOutcome::Error));
    let error = automation.last_error.as_ref().expect("Error recorded");
    assert!(error.contains("storage offline"), "Got: {}", error);

    // The request reached the backend before failing
    let calls = h.actions.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].actor_user_id, 99);
    assert_eq!(calls[0].target, t);

    assert_eq!(
        h.content.moderation_status(&t),
        Some(ModerationStatus::Visible),
        "Failed hide leaves the content alone"
    );

    // The failure is audited
    let entries = h.audit.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].outcome, "error");
    let metadata = entries[0].metadata.as_ref().expect("Audit metadata present");
    assert!(metadata["error"]
        .as_str()
        .expect("Error in metadata")
        .contains("storage offline"));

    // And stored on the signal row
    let record = evaluation.record.expect("Signal row present");
    assert_eq!(record.automation["attempted"], true);
    assert_eq!(record.automation["executed"], false);
    assert_eq!(record.automation["blocked_reason"], "automation_error");
}

#[tokio::test]
async fn test_audit_failure_does_not_fail_evaluation() {
    let h = harness(auto_hide_config());
    let t = target(ContentType::Article, 8);
    h.content.insert_content(t, published_content(7, &spam_wall()));
    h.audit.fail_with("audit store down");

    let evaluation = h
        .engine
        .evaluate(ContentType::Article, 8, TriggerSource::Publish)
        .await
        .expect("A failed audit write must not fail the evaluation");

    assert!(evaluation.automation.executed, "The hide itself still runs");
    assert_eq!(
        h.content.moderation_status(&t),
        Some(ModerationStatus::Hidden)
    );
    assert!(h.audit.entries().is_empty());
}

#[tokio::test]
async fn test_second_evaluation_sees_already_moderated() {
    let h = harness(auto_hide_config());
    let t = target(ContentType::Article, 9);
    h.content.insert_content(t, published_content(7, &spam_wall()));

    let first = h
        .engine
        .evaluate(ContentType::Article, 9, TriggerSource::Publish)
        .await
        .expect("Evaluation should succeed");
    assert!(first.automation.executed);

    // Content is now hidden; an edit re-triggers evaluation
    let second = h
        .engine
        .evaluate(ContentType::Article, 9, TriggerSource::Update)
        .await
        .expect("Evaluation should succeed");

    assert_eq!(
        second.automation.blocked_reason,
        Some(BlockedReason::AlreadyModerated)
    );
    assert!(!second.automation.attempted);
    assert_eq!(h.actions.calls().len(), 1, "No second hide call");
    assert_eq!(
        h.content.moderation_status(&t),
        Some(ModerationStatus::Hidden)
    );

    // The row stays active with the latest decision
    let record = second.record.expect("Signal row present");
    assert_eq!(record.status, SignalStatus::Active);
    assert_eq!(record.automation["blocked_reason"], "already_moderated");
}

#[tokio::test]
async fn test_flood_only_finding_recommends_restrict() {
    let h = harness(auto_hide_config());
    let t = target(ContentType::Comment, 500);
    let now = Utc::now().naive_utc();

    h.content
        .insert_content(t, interaction_content(7, "Totally agree with this."));
    // Sixteen comments inside ten minutes, five more half an hour ago
    for i in 1..=16 {
        h.content
            .record_creation(ContentType::Comment, 7, now - Duration::seconds(i * 30));
    }
    for _ in 0..5 {
        h.content
            .record_creation(ContentType::Comment, 7, now - Duration::minutes(30));
    }

    let evaluation = h
        .engine
        .evaluate(ContentType::Comment, 500, TriggerSource::Create)
        .await
        .expect("Evaluation should succeed");

    // Double the 10m threshold (6) plus the 60m threshold (4)
    assert_eq!(evaluation.score, 10);
    assert_eq!(evaluation.severity, Severity::High);
    assert_eq!(evaluation.triggered_rules.len(), 1);
    assert_eq!(evaluation.triggered_rules[0].rule, RuleKind::Flood);
    // Flood alone is not confident enough for a hide
    assert_eq!(evaluation.recommended_action, RecommendedAction::Restrict);
    assert_eq!(
        evaluation.automation.blocked_reason,
        Some(BlockedReason::RecommendedActionNotHide)
    );
    assert!(h.actions.calls().is_empty());
    assert!(evaluation.record.is_some(), "Restrict findings reach the queue");
}
