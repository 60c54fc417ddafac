//! Evaluation pipeline integration tests
//!
//! Runs the full engine against in-memory backends: snapshot, signal
//! extraction, rule scoring, and signal row persistence.

mod common;

use common::fixtures::{
    auto_hide_config, clean_text, draft_content, harness, interaction_content, published_content,
    spam_wall, target,
};
use modwatch::config::ModerationConfig;
use modwatch::moderation::{
    BlockedReason, ContentType, ModerationError, RuleKind, SignalStore,
};
use modwatch::orm::moderation_signals::{
    RecommendedAction, Severity, SignalStatus, TriggerSource,
};

/// Policy with the kill switch off, so these tests exercise persistence
/// without any hide side effects.
fn observe_only_config() -> ModerationConfig {
    ModerationConfig {
        auto_hide_enabled: false,
        ..auto_hide_config()
    }
}

#[tokio::test]
async fn test_clean_comment_creates_no_record() {
    let h = harness(auto_hide_config());
    let t = target(ContentType::Comment, 1);
    h.content.insert_content(
        t,
        interaction_content(7, "This was a genuinely helpful walkthrough, thank you."),
    );

    let evaluation = h
        .engine
        .evaluate(ContentType::Comment, 1, TriggerSource::Create)
        .await
        .expect("Evaluation should succeed");

    assert_eq!(evaluation.score, 0, "Clean text should score zero");
    assert_eq!(evaluation.severity, Severity::None);
    assert_eq!(evaluation.recommended_action, RecommendedAction::None);
    assert!(evaluation.triggered_rules.is_empty());
    assert!(
        evaluation.record.is_none(),
        "Clean content should not produce a signal row"
    );
    assert_eq!(
        evaluation.automation.blocked_reason,
        Some(BlockedReason::NoTriggeredRules)
    );

    let stored = h.signals.find_by_target(&t).await.expect("Store readable");
    assert!(stored.is_none(), "Nothing should be persisted");
}

#[tokio::test]
async fn test_kill_switch_reason_overrides_no_rules() {
    let h = harness(observe_only_config());
    let t = target(ContentType::Comment, 2);
    h.content.insert_content(
        t,
        interaction_content(7, "Bookmarking this for the weekend build."),
    );

    let evaluation = h
        .engine
        .evaluate(ContentType::Comment, 2, TriggerSource::Create)
        .await
        .expect("Evaluation should succeed");

    assert!(evaluation.triggered_rules.is_empty());
    assert!(evaluation.record.is_none());
    // With the switch off, the disabled reason outranks every other blocker
    assert!(!evaluation.automation.enabled);
    assert!(!evaluation.automation.eligible);
    assert_eq!(
        evaluation.automation.blocked_reason,
        Some(BlockedReason::AutoHideDisabled)
    );
}

#[tokio::test]
async fn test_spam_article_creates_active_signal() {
    let h = harness(observe_only_config());
    let t = target(ContentType::Article, 1);
    h.content.insert_content(t, published_content(7, &spam_wall()));

    let evaluation = h
        .engine
        .evaluate(ContentType::Article, 1, TriggerSource::Create)
        .await
        .expect("Evaluation should succeed");

    // Spam 12 plus suspicious_link 12
    assert_eq!(evaluation.score, 24);
    assert_eq!(evaluation.severity, Severity::Critical);
    assert_eq!(evaluation.recommended_action, RecommendedAction::Hide);
    assert_eq!(evaluation.triggered_rules.len(), 2);
    assert_eq!(evaluation.triggered_rules[0].rule, RuleKind::Spam);
    assert_eq!(evaluation.triggered_rules[1].rule, RuleKind::SuspiciousLink);

    let record = evaluation.record.expect("A signal row should be created");
    assert_eq!(record.content_type, "article");
    assert_eq!(record.content_id, 1);
    assert_eq!(record.status, SignalStatus::Active);
    assert_eq!(record.trigger_source, TriggerSource::Create);
    assert_eq!(record.score, 24);
    assert_eq!(record.severity, Severity::Critical);
    assert_eq!(record.recommended_action, RecommendedAction::Hide);
    assert_eq!(
        record.first_detected_at, record.last_detected_at,
        "First detection sets both timestamps"
    );
    assert!(record.resolved_by.is_none());
    assert!(record.resolution_action.is_none());

    let rules = record
        .triggered_rules
        .as_array()
        .expect("Rules stored as JSON array");
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0]["rule"], "spam");
    assert_eq!(record.text_signals["repeated_token_count"], 50);
    assert_eq!(record.text_signals["suspicious_url_count"], 5);
}

#[tokio::test]
async fn test_reevaluation_updates_same_row() {
    let h = harness(observe_only_config());
    let t = target(ContentType::Video, 3);
    h.content.insert_content(t, published_content(7, &spam_wall()));

    let first = h
        .engine
        .evaluate(ContentType::Video, 3, TriggerSource::Create)
        .await
        .expect("First evaluation should succeed")
        .record
        .expect("First evaluation should create a row");

    let second = h
        .engine
        .evaluate(ContentType::Video, 3, TriggerSource::Update)
        .await
        .expect("Second evaluation should succeed")
        .record
        .expect("Second evaluation should keep the row");

    assert_eq!(second.id, first.id, "Same target must reuse the row");
    assert_eq!(second.trigger_source, TriggerSource::Update);
    // Unchanged content scores identically
    assert_eq!(second.score, first.score);
    assert_eq!(second.severity, first.severity);
    assert_eq!(second.triggered_rules, first.triggered_rules);
    assert_eq!(
        second.first_detected_at, first.first_detected_at,
        "First detection timestamp is insert-only"
    );
    assert!(second.last_detected_at >= first.last_detected_at);

    let stored = h
        .signals
        .find_by_target(&t)
        .await
        .expect("Store readable")
        .expect("Row should exist");
    assert_eq!(stored.id, first.id);
}

#[tokio::test]
async fn test_missing_content_is_target_not_found() {
    let h = harness(observe_only_config());

    let result = h
        .engine
        .evaluate(ContentType::Podcast, 12, TriggerSource::Update)
        .await;

    match result {
        Err(ModerationError::TargetNotFound(t)) => {
            assert_eq!(t.content_type, ContentType::Podcast);
            assert_eq!(t.content_id, 12);
        }
        other => panic!("Expected TargetNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_clean_reevaluation_clears_existing_row() {
    let h = harness(observe_only_config());
    let t = target(ContentType::Article, 9);
    h.content.insert_content(t, published_content(7, &spam_wall()));

    let flagged = h
        .engine
        .evaluate(ContentType::Article, 9, TriggerSource::Create)
        .await
        .expect("Flagging evaluation should succeed")
        .record
        .expect("Spam should create a row");

    // The author edits the spam out
    h.content.insert_content(t, published_content(7, &clean_text()));

    let evaluation = h
        .engine
        .evaluate(ContentType::Article, 9, TriggerSource::Update)
        .await
        .expect("Clean evaluation should succeed");

    assert_eq!(evaluation.score, 0);
    let cleared = evaluation
        .record
        .expect("Prior row should be closed out, not dropped");
    assert_eq!(cleared.id, flagged.id);
    assert_eq!(cleared.status, SignalStatus::Cleared);
    assert_eq!(cleared.score, 0);
    assert_eq!(cleared.severity, Severity::None);
    assert_eq!(cleared.recommended_action, RecommendedAction::None);
    assert_eq!(cleared.triggered_rules, serde_json::json!([]));
    assert_eq!(cleared.resolution_action.as_deref(), Some("cleared"));
    assert!(cleared.resolved_by.is_none(), "System clears have no moderator");
    assert!(cleared.resolved_at.is_some());
    assert_eq!(
        cleared.first_detected_at, flagged.first_detected_at,
        "Detection history survives the clear"
    );
    assert_eq!(cleared.automation["eligible"], false);
    assert_eq!(cleared.automation["blocked_reason"], "no_triggered_rules");
    // The flagged-era measurements stay on the row for the review queue
    assert_eq!(cleared.text_signals["repeated_token_count"], 50);
}

#[tokio::test]
async fn test_clean_content_never_creates_a_row_to_clear() {
    let h = harness(observe_only_config());
    let t = target(ContentType::Book, 4);
    h.content.insert_content(t, published_content(7, &clean_text()));

    for trigger in [TriggerSource::Create, TriggerSource::Update] {
        let evaluation = h
            .engine
            .evaluate(ContentType::Book, 4, trigger)
            .await
            .expect("Evaluation should succeed");
        assert!(evaluation.record.is_none());
    }

    let stored = h.signals.find_by_target(&t).await.expect("Store readable");
    assert!(stored.is_none());
}

#[tokio::test]
async fn test_draft_content_is_flagged_but_not_public() {
    let h = harness(auto_hide_config());
    let t = target(ContentType::Article, 21);
    h.content.insert_content(t, draft_content(7, &spam_wall()));

    let evaluation = h
        .engine
        .evaluate(ContentType::Article, 21, TriggerSource::Update)
        .await
        .expect("Evaluation should succeed");

    // The finding is recorded for the queue even though nothing is public yet
    assert_eq!(evaluation.severity, Severity::Critical);
    assert!(evaluation.record.is_some());
    assert_eq!(
        evaluation.automation.blocked_reason,
        Some(BlockedReason::ContentNotPublic)
    );
    assert!(!evaluation.automation.attempted);
    assert!(h.actions.calls().is_empty(), "No hide for drafts");
}
