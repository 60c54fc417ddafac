//! Test fixtures for building engines and content
#![allow(dead_code)]

use modwatch::config::ModerationConfig;
use modwatch::moderation::memory::{
    MemoryAuditSink, MemoryContentProvider, MemoryModerationActions, MemorySignalStore,
};
use modwatch::moderation::{
    ContentSnapshot, ContentType, ModerationEngine, ModerationTarget, PublishState,
};
use modwatch::orm::ModerationStatus;
use std::sync::Arc;

/// Engine plus handles to its in-memory collaborators.
pub struct TestHarness {
    pub engine: ModerationEngine,
    pub content: Arc<MemoryContentProvider>,
    pub signals: Arc<MemorySignalStore>,
    pub actions: Arc<MemoryModerationActions>,
    pub audit: Arc<MemoryAuditSink>,
}

/// Build an engine whose hide actions feed back into the content provider,
/// so a second evaluation sees the moderated status like it would in
/// production.
pub fn harness(config: ModerationConfig) -> TestHarness {
    let content = Arc::new(MemoryContentProvider::new());
    let signals = Arc::new(MemorySignalStore::new());
    let actions = Arc::new(MemoryModerationActions::wired(content.clone()));
    let audit = Arc::new(MemoryAuditSink::new());
    let engine = ModerationEngine::new(
        config,
        content.clone(),
        signals.clone(),
        actions.clone(),
        audit.clone(),
    );
    TestHarness {
        engine,
        content,
        signals,
        actions,
        audit,
    }
}

/// Policy allowing automation for critical spam/link/mass findings,
/// acting as service account 99.
pub fn auto_hide_config() -> ModerationConfig {
    ModerationConfig {
        auto_hide_enabled: true,
        auto_hide_actor_id: "99".to_string(),
        auto_hide_min_severity: "critical".to_string(),
        auto_hide_rules: "spam,suspicious_link,mass_creation".to_string(),
    }
}

pub fn target(content_type: ContentType, content_id: i32) -> ModerationTarget {
    ModerationTarget {
        content_type,
        content_id,
    }
}

/// A published, visible piece of primary content.
pub fn published_content(user_id: i32, text: &str) -> ContentSnapshot {
    ContentSnapshot {
        actor_user_id: Some(user_id),
        owner_user_id: Some(user_id),
        moderation_status: ModerationStatus::Visible,
        publish_state: PublishState::Published,
        text: text.to_string(),
    }
}

pub fn draft_content(user_id: i32, text: &str) -> ContentSnapshot {
    ContentSnapshot {
        publish_state: PublishState::Draft,
        ..published_content(user_id, text)
    }
}

/// A live comment or review body.
pub fn interaction_content(user_id: i32, text: &str) -> ContentSnapshot {
    ContentSnapshot {
        publish_state: PublishState::PublishedImplicit,
        ..published_content(user_id, text)
    }
}

/// Repetitive wall of text plus duplicated shortener links.
/// Scores 24 (spam 12 + suspicious_link 12), comfortably critical.
pub fn spam_wall() -> String {
    let mut text = "buy-crypto-now ".repeat(50);
    for _ in 0..5 {
        text.push_str("https://bit.ly/xk42 ");
    }
    text
}

/// One shortener among enough plain links for a high (not critical) score
/// of 8 on the suspicious_link rule alone.
pub fn single_shortener_text() -> String {
    "check https://bit.ly/promo and also https://alpha.example.com then \
     https://beta.example.com finally https://gamma.example.com"
        .to_string()
}

/// Ordinary prose that triggers nothing.
pub fn clean_text() -> String {
    "Notes from the workshop: we compared three finishing techniques on oak, \
     walnut, and maple, with photos of every stage and a parts list in the \
     appendix."
        .to_string()
}
