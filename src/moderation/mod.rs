//! Automated moderation signal engine
//!
//! Entry point is [`ModerationEngine::evaluate`], called by the content write
//! paths after a create, edit, or publish. An evaluation reads a snapshot of
//! the content, extracts text and activity signals, runs the detection rules,
//! persists the outcome as a moderation signal, and finally executes the
//! auto-hide policy when the finding qualifies.
//!
//! Everything the engine touches beyond pure computation goes through the
//! collaborator traits below, with sea-orm backends in [`database`] and
//! in-memory backends in [`memory`] for tests and local tooling.

pub mod activity;
pub mod automation;
pub mod database;
pub mod memory;
pub mod policy;
pub mod rules;
pub mod text_signals;

pub use activity::ActivitySignals;
pub use policy::{AutomationOutcome, AutomationState, BlockedReason};
pub use rules::{RuleKind, TriggeredRule};
pub use text_signals::TextSignals;

use crate::config::ModerationConfig;
use crate::orm::moderation_signals::{self, RecommendedAction, Severity, SignalStatus, TriggerSource};
use crate::orm::{ModerationStatus, PublishStatus};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sea_orm::{DatabaseConnection, DbErr};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Every content surface the engine can evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Article,
    Video,
    Course,
    Live,
    Podcast,
    Book,
    Comment,
    Review,
}

impl ContentType {
    /// The six primary surfaces, in portfolio counting order.
    pub const BASE: [ContentType; 6] = [
        ContentType::Article,
        ContentType::Video,
        ContentType::Course,
        ContentType::Live,
        ContentType::Podcast,
        ContentType::Book,
    ];

    /// Comments and reviews hang off primary content and follow
    /// stricter flood thresholds.
    pub fn is_interaction(self) -> bool {
        matches!(self, ContentType::Comment | ContentType::Review)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Article => "article",
            ContentType::Video => "video",
            ContentType::Course => "course",
            ContentType::Live => "live",
            ContentType::Podcast => "podcast",
            ContentType::Book => "book",
            ContentType::Comment => "comment",
            ContentType::Review => "review",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = ModerationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "article" => Ok(ContentType::Article),
            "video" => Ok(ContentType::Video),
            "course" => Ok(ContentType::Course),
            "live" => Ok(ContentType::Live),
            "podcast" => Ok(ContentType::Podcast),
            "book" => Ok(ContentType::Book),
            "comment" => Ok(ContentType::Comment),
            "review" => Ok(ContentType::Review),
            _ => Err(ModerationError::UnsupportedContentType(value.to_string())),
        }
    }
}

/// A single piece of content, addressed by surface and row id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModerationTarget {
    pub content_type: ContentType,
    pub content_id: i32,
}

impl fmt::Display for ModerationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.content_type, self.content_id)
    }
}

/// Publication state as the automation sees it.
///
/// Interactions map to `PublishedImplicit`: they have no publish column but
/// are public the moment they exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishState {
    Draft,
    Published,
    Archived,
    PublishedImplicit,
}

impl PublishState {
    pub fn is_public(self) -> bool {
        matches!(self, PublishState::Published | PublishState::PublishedImplicit)
    }
}

impl From<PublishStatus> for PublishState {
    fn from(status: PublishStatus) -> Self {
        match status {
            PublishStatus::Draft => PublishState::Draft,
            PublishStatus::Published => PublishState::Published,
            PublishStatus::Archived => PublishState::Archived,
        }
    }
}

/// What an evaluation needs to know about the content under review.
#[derive(Debug, Clone)]
pub struct ContentSnapshot {
    /// Author whose activity is counted; None for imported or system content
    pub actor_user_id: Option<i32>,
    pub owner_user_id: Option<i32>,
    pub moderation_status: ModerationStatus,
    pub publish_state: PublishState,
    /// Markup-bearing text of the surface, fields joined by newlines
    pub text: String,
}

/// How a moderator closes out a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalResolution {
    /// Looked at, kept for history
    Reviewed,
    /// False positive, dismissed
    Dismissed,
}

impl SignalResolution {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalResolution::Reviewed => "reviewed",
            SignalResolution::Dismissed => "dismissed",
        }
    }

    pub(crate) fn status(self) -> SignalStatus {
        match self {
            SignalResolution::Reviewed => SignalStatus::Reviewed,
            SignalResolution::Dismissed => SignalStatus::Cleared,
        }
    }
}

/// Full payload for writing a signal row after an evaluation with findings.
#[derive(Debug, Clone)]
pub struct SignalWrite {
    pub trigger_source: TriggerSource,
    pub score: i32,
    pub severity: Severity,
    pub recommended_action: RecommendedAction,
    pub triggered_rules: Vec<TriggeredRule>,
    pub text_signals: TextSignals,
    pub activity_signals: ActivitySignals,
    pub automation: AutomationState,
}

/// Result of a hide request against the content tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HideOutcome {
    /// False when the content was already hidden
    pub changed: bool,
    pub previous: ModerationStatus,
    pub current: ModerationStatus,
}

/// One row for the audit trail.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub actor_id: Option<i32>,
    pub actor_role: String,
    pub action: String,
    pub scope: String,
    pub resource_type: String,
    pub resource_id: Option<i32>,
    pub reason: Option<String>,
    pub method: Option<String>,
    pub path: Option<String>,
    pub status_code: Option<i32>,
    pub outcome: String,
    pub metadata: Option<serde_json::Value>,
}

/// Everything a single evaluation produced.
///
/// `record` is the stored signal row, or None when nothing triggered and no
/// prior row existed. When `automation.executed` is true the content has
/// already been hidden; callers refreshing caches should reload it.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub target: ModerationTarget,
    pub trigger: TriggerSource,
    pub text_signals: TextSignals,
    pub activity_signals: ActivitySignals,
    pub triggered_rules: Vec<TriggeredRule>,
    pub score: i32,
    pub severity: Severity,
    pub recommended_action: RecommendedAction,
    pub automation: AutomationState,
    pub record: Option<moderation_signals::Model>,
}

#[derive(Debug)]
pub enum ModerationError {
    /// The target row does not exist (or was deleted mid-evaluation)
    TargetNotFound(ModerationTarget),
    UnsupportedContentType(String),
    Database(DbErr),
    /// Signal payloads failed to encode as JSON
    Serialization(serde_json::Error),
    /// A non-database collaborator failed
    External(String),
}

impl fmt::Display for ModerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModerationError::TargetNotFound(target) => write!(f, "content {} not found", target),
            ModerationError::UnsupportedContentType(value) => {
                write!(f, "unsupported content type: {}", value)
            }
            ModerationError::Database(err) => write!(f, "database error: {}", err),
            ModerationError::Serialization(err) => write!(f, "signal encoding error: {}", err),
            ModerationError::External(message) => write!(f, "external service error: {}", message),
        }
    }
}

impl std::error::Error for ModerationError {}

impl From<DbErr> for ModerationError {
    fn from(err: DbErr) -> Self {
        ModerationError::Database(err)
    }
}

impl From<serde_json::Error> for ModerationError {
    fn from(err: serde_json::Error) -> Self {
        ModerationError::Serialization(err)
    }
}

/// Read access to the content tables.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Snapshot of a single piece of content, None if the row is gone.
    async fn snapshot(
        &self,
        target: &ModerationTarget,
    ) -> Result<Option<ContentSnapshot>, ModerationError>;

    /// How many rows of `content_type` the author created strictly after `since`.
    async fn count_created_since(
        &self,
        content_type: ContentType,
        actor_user_id: i32,
        since: NaiveDateTime,
    ) -> Result<u64, ModerationError>;
}

/// Persistence for moderation signal rows, one row per target.
#[async_trait]
pub trait SignalStore: Send + Sync {
    async fn find_by_target(
        &self,
        target: &ModerationTarget,
    ) -> Result<Option<moderation_signals::Model>, ModerationError>;

    /// Insert or refresh the signal row for a detection.
    /// Re-activates resolved rows and clears any prior resolution.
    async fn upsert(
        &self,
        target: &ModerationTarget,
        write: SignalWrite,
        now: NaiveDateTime,
    ) -> Result<moderation_signals::Model, ModerationError>;

    /// Mark an existing row cleared after an evaluation with no findings.
    /// Returns None (and writes nothing) when no row exists.
    async fn clear(
        &self,
        target: &ModerationTarget,
        automation: AutomationState,
        now: NaiveDateTime,
    ) -> Result<Option<moderation_signals::Model>, ModerationError>;

    /// Persist the automation outcome after an execution attempt.
    async fn record_automation(
        &self,
        target: &ModerationTarget,
        automation: &AutomationState,
        now: NaiveDateTime,
    ) -> Result<(), ModerationError>;

    /// Close out a signal on behalf of a moderator.
    async fn resolve(
        &self,
        target: &ModerationTarget,
        moderator_id: i32,
        resolution: SignalResolution,
        now: NaiveDateTime,
    ) -> Result<Option<moderation_signals::Model>, ModerationError>;
}

/// Moderation side effects against the content tables.
#[async_trait]
pub trait ModerationActions: Send + Sync {
    async fn hide(
        &self,
        actor_user_id: i32,
        target: &ModerationTarget,
        reason: &str,
        note: Option<&str>,
        metadata: serde_json::Value,
    ) -> Result<HideOutcome, ModerationError>;
}

/// Append-only audit trail.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> Result<(), ModerationError>;
}

/// Orchestrates one evaluation end to end. Cheap to clone.
#[derive(Clone)]
pub struct ModerationEngine {
    config: ModerationConfig,
    content: Arc<dyn ContentProvider>,
    signals: Arc<dyn SignalStore>,
    actions: Arc<dyn ModerationActions>,
    audit: Arc<dyn AuditSink>,
}

impl ModerationEngine {
    pub fn new(
        config: ModerationConfig,
        content: Arc<dyn ContentProvider>,
        signals: Arc<dyn SignalStore>,
        actions: Arc<dyn ModerationActions>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            config,
            content,
            signals,
            actions,
            audit,
        }
    }

    /// Engine wired to the sea-orm backends over one connection pool.
    pub fn with_database(config: ModerationConfig, db: DatabaseConnection) -> Self {
        Self {
            config,
            content: Arc::new(database::DbContentProvider::new(db.clone())),
            signals: Arc::new(database::DbSignalStore::new(db.clone())),
            actions: Arc::new(database::DbModerationActions::new(db.clone())),
            audit: Arc::new(database::DbAuditSink::new(db)),
        }
    }

    /// Evaluate one piece of content and persist the outcome.
    ///
    /// Returns `TargetNotFound` when the content row no longer exists. Write
    /// paths fire this after the content transaction commits, so a miss here
    /// means a racing delete and is safe to drop.
    pub async fn evaluate(
        &self,
        content_type: ContentType,
        content_id: i32,
        trigger: TriggerSource,
    ) -> Result<Evaluation, ModerationError> {
        let target = ModerationTarget {
            content_type,
            content_id,
        };
        let now = Utc::now().naive_utc();

        let snapshot = self
            .content
            .snapshot(&target)
            .await?
            .ok_or(ModerationError::TargetNotFound(target))?;

        let text_signals = text_signals::extract_text_signals(&snapshot.text);
        let activity_signals = activity::collect_activity_signals(
            self.content.as_ref(),
            content_type,
            snapshot.actor_user_id,
            now,
        )
        .await?;

        let triggered_rules = rules::evaluate_rules(content_type, &text_signals, &activity_signals);
        let score: i32 = triggered_rules.iter().map(|rule| rule.score).sum();
        let severity = policy::to_severity(score);
        let recommended_action = policy::recommend_action(severity, &triggered_rules);

        let auto_hide = self.config.auto_hide_policy();
        let automation = policy::decide_automation(
            &auto_hide,
            severity,
            recommended_action,
            &triggered_rules,
            snapshot.moderation_status,
            snapshot.publish_state,
        );

        let mut record = self
            .persist(
                &target,
                trigger,
                score,
                severity,
                recommended_action,
                &triggered_rules,
                &text_signals,
                &activity_signals,
                &automation,
                now,
            )
            .await?;

        // Automation runs only against a persisted signal, and its outcome is
        // written back before the evaluation returns.
        let automation = if record.is_some() {
            let outcome = automation::run_auto_hide(
                self.actions.as_ref(),
                self.audit.as_ref(),
                &auto_hide,
                &target,
                severity,
                score,
                &triggered_rules,
                automation,
                now,
            )
            .await;
            if outcome.attempted {
                self.signals
                    .record_automation(&target, &outcome, now)
                    .await?;
                if let Some(model) = record.as_mut() {
                    model.automation = serde_json::to_value(&outcome)?;
                }
            }
            outcome
        } else {
            automation
        };

        if !triggered_rules.is_empty() {
            log::info!(
                "moderation signal for {}: score {}, severity {}, action {}",
                target,
                score,
                severity.as_str(),
                recommended_action.as_str()
            );
        }

        Ok(Evaluation {
            target,
            trigger,
            text_signals,
            activity_signals,
            triggered_rules,
            score,
            severity,
            recommended_action,
            automation,
            record,
        })
    }

    /// Close out a signal on behalf of a moderator.
    /// Returns None when the target has no signal row.
    pub async fn resolve(
        &self,
        target: &ModerationTarget,
        moderator_id: i32,
        resolution: SignalResolution,
    ) -> Result<Option<moderation_signals::Model>, ModerationError> {
        let resolved = self
            .signals
            .resolve(target, moderator_id, resolution, Utc::now().naive_utc())
            .await?;
        if resolved.is_some() {
            log::info!(
                "moderation signal for {} {} by user {}",
                target,
                resolution.as_str(),
                moderator_id
            );
        }
        Ok(resolved)
    }

    #[allow(clippy::too_many_arguments)]
    async fn persist(
        &self,
        target: &ModerationTarget,
        trigger: TriggerSource,
        score: i32,
        severity: Severity,
        recommended_action: RecommendedAction,
        triggered_rules: &[TriggeredRule],
        text_signals: &TextSignals,
        activity_signals: &ActivitySignals,
        automation: &AutomationState,
        now: NaiveDateTime,
    ) -> Result<Option<moderation_signals::Model>, ModerationError> {
        if triggered_rules.is_empty() {
            // Nothing triggered: close out a prior row if there is one, never
            // create a row for clean content.
            let reset = AutomationState::no_rules(self.config.auto_hide_enabled);
            let cleared = self.signals.clear(target, reset, now).await?;
            if cleared.is_some() {
                log::info!("moderation signal cleared for {}", target);
            }
            return Ok(cleared);
        }

        let write = SignalWrite {
            trigger_source: trigger,
            score,
            severity,
            recommended_action,
            triggered_rules: triggered_rules.to_vec(),
            text_signals: text_signals.clone(),
            activity_signals: activity_signals.clone(),
            automation: automation.clone(),
        };
        self.signals.upsert(target, write, now).await.map(Some)
    }
}
