//! sea-orm backends for the engine collaborators
//!
//! One backend struct per seam, each holding its own handle to the shared
//! connection pool. The content tables are heterogeneous, so the provider
//! spells out one arm per surface instead of reaching for generics; new
//! surfaces are added by extending the matches (the compiler will point at
//! every spot).

use super::{
    AuditEntry, AuditSink, ContentProvider, ContentSnapshot, ContentType, HideOutcome,
    ModerationActions, ModerationError, ModerationTarget, PublishState, SignalResolution,
    SignalStore, SignalWrite,
};
use crate::moderation::policy::AutomationState;
use crate::orm::moderation_signals::{RecommendedAction, Severity, SignalStatus};
use crate::orm::{
    articles, audit_log, books, comments, courses, lives, moderation_signals, podcasts, reviews,
    videos, ModerationStatus,
};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sea_orm::{entity::*, query::*, ActiveValue::Set, DatabaseConnection};
use serde::Serialize;

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, ModerationError> {
    Ok(serde_json::to_value(value)?)
}

/// Join the text-bearing fields of a row, skipping absent ones.
fn join_text(parts: &[Option<&str>]) -> String {
    parts
        .iter()
        .filter_map(|part| *part)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct DbContentProvider {
    db: DatabaseConnection,
}

impl DbContentProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ContentProvider for DbContentProvider {
    async fn snapshot(
        &self,
        target: &ModerationTarget,
    ) -> Result<Option<ContentSnapshot>, ModerationError> {
        let db = &self.db;
        let id = target.content_id;
        let snapshot = match target.content_type {
            ContentType::Article => articles::Entity::find_by_id(id).one(db).await?.map(|row| {
                ContentSnapshot {
                    actor_user_id: row.user_id,
                    owner_user_id: row.user_id,
                    moderation_status: row.moderation_status,
                    publish_state: row.publish_status.into(),
                    text: join_text(&[
                        Some(row.title.as_str()),
                        row.description.as_deref(),
                        Some(row.body.as_str()),
                    ]),
                }
            }),
            ContentType::Video => videos::Entity::find_by_id(id).one(db).await?.map(|row| {
                ContentSnapshot {
                    actor_user_id: row.user_id,
                    owner_user_id: row.user_id,
                    moderation_status: row.moderation_status,
                    publish_state: row.publish_status.into(),
                    text: join_text(&[Some(row.title.as_str()), row.description.as_deref()]),
                }
            }),
            ContentType::Course => courses::Entity::find_by_id(id).one(db).await?.map(|row| {
                ContentSnapshot {
                    actor_user_id: row.user_id,
                    owner_user_id: row.user_id,
                    moderation_status: row.moderation_status,
                    publish_state: row.publish_status.into(),
                    text: join_text(&[
                        Some(row.title.as_str()),
                        row.description.as_deref(),
                        row.syllabus.as_deref(),
                    ]),
                }
            }),
            ContentType::Live => lives::Entity::find_by_id(id).one(db).await?.map(|row| {
                ContentSnapshot {
                    actor_user_id: row.user_id,
                    owner_user_id: row.user_id,
                    moderation_status: row.moderation_status,
                    publish_state: row.publish_status.into(),
                    text: join_text(&[Some(row.title.as_str()), row.description.as_deref()]),
                }
            }),
            ContentType::Podcast => podcasts::Entity::find_by_id(id).one(db).await?.map(|row| {
                ContentSnapshot {
                    actor_user_id: row.user_id,
                    owner_user_id: row.user_id,
                    moderation_status: row.moderation_status,
                    publish_state: row.publish_status.into(),
                    text: join_text(&[Some(row.title.as_str()), row.description.as_deref()]),
                }
            }),
            ContentType::Book => books::Entity::find_by_id(id).one(db).await?.map(|row| {
                ContentSnapshot {
                    actor_user_id: row.user_id,
                    owner_user_id: row.user_id,
                    moderation_status: row.moderation_status,
                    publish_state: row.publish_status.into(),
                    text: join_text(&[
                        Some(row.title.as_str()),
                        row.description.as_deref(),
                        row.excerpt.as_deref(),
                    ]),
                }
            }),
            ContentType::Comment => comments::Entity::find_by_id(id).one(db).await?.map(|row| {
                ContentSnapshot {
                    actor_user_id: row.user_id,
                    owner_user_id: row.user_id,
                    moderation_status: row.moderation_status,
                    publish_state: PublishState::PublishedImplicit,
                    text: row.body,
                }
            }),
            ContentType::Review => reviews::Entity::find_by_id(id).one(db).await?.map(|row| {
                ContentSnapshot {
                    actor_user_id: row.user_id,
                    owner_user_id: row.user_id,
                    moderation_status: row.moderation_status,
                    publish_state: PublishState::PublishedImplicit,
                    text: row.body.unwrap_or_default(),
                }
            }),
        };
        Ok(snapshot)
    }

    async fn count_created_since(
        &self,
        content_type: ContentType,
        actor_user_id: i32,
        since: NaiveDateTime,
    ) -> Result<u64, ModerationError> {
        let db = &self.db;
        let count = match content_type {
            ContentType::Article => {
                articles::Entity::find()
                    .filter(articles::Column::UserId.eq(actor_user_id))
                    .filter(articles::Column::CreatedAt.gt(since))
                    .count(db)
                    .await?
            }
            ContentType::Video => {
                videos::Entity::find()
                    .filter(videos::Column::UserId.eq(actor_user_id))
                    .filter(videos::Column::CreatedAt.gt(since))
                    .count(db)
                    .await?
            }
            ContentType::Course => {
                courses::Entity::find()
                    .filter(courses::Column::UserId.eq(actor_user_id))
                    .filter(courses::Column::CreatedAt.gt(since))
                    .count(db)
                    .await?
            }
            ContentType::Live => {
                lives::Entity::find()
                    .filter(lives::Column::UserId.eq(actor_user_id))
                    .filter(lives::Column::CreatedAt.gt(since))
                    .count(db)
                    .await?
            }
            ContentType::Podcast => {
                podcasts::Entity::find()
                    .filter(podcasts::Column::UserId.eq(actor_user_id))
                    .filter(podcasts::Column::CreatedAt.gt(since))
                    .count(db)
                    .await?
            }
            ContentType::Book => {
                books::Entity::find()
                    .filter(books::Column::UserId.eq(actor_user_id))
                    .filter(books::Column::CreatedAt.gt(since))
                    .count(db)
                    .await?
            }
            ContentType::Comment => {
                comments::Entity::find()
                    .filter(comments::Column::UserId.eq(actor_user_id))
                    .filter(comments::Column::CreatedAt.gt(since))
                    .count(db)
                    .await?
            }
            ContentType::Review => {
                reviews::Entity::find()
                    .filter(reviews::Column::UserId.eq(actor_user_id))
                    .filter(reviews::Column::CreatedAt.gt(since))
                    .count(db)
                    .await?
            }
        };
        Ok(count as u64)
    }
}

pub struct DbSignalStore {
    db: DatabaseConnection,
}

impl DbSignalStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SignalStore for DbSignalStore {
    async fn find_by_target(
        &self,
        target: &ModerationTarget,
    ) -> Result<Option<moderation_signals::Model>, ModerationError> {
        let found = moderation_signals::Entity::find()
            .filter(moderation_signals::Column::ContentType.eq(target.content_type.as_str()))
            .filter(moderation_signals::Column::ContentId.eq(target.content_id))
            .one(&self.db)
            .await?;
        Ok(found)
    }

    async fn upsert(
        &self,
        target: &ModerationTarget,
        write: SignalWrite,
        now: NaiveDateTime,
    ) -> Result<moderation_signals::Model, ModerationError> {
        match self.find_by_target(target).await? {
            Some(existing) => {
                // Refresh in place; a resolved row comes back as active
                let mut active: moderation_signals::ActiveModel = existing.into();
                active.status = Set(SignalStatus::Active);
                active.trigger_source = Set(write.trigger_source);
                active.score = Set(write.score);
                active.severity = Set(write.severity);
                active.recommended_action = Set(write.recommended_action);
                active.triggered_rules = Set(to_json(&write.triggered_rules)?);
                active.text_signals = Set(to_json(&write.text_signals)?);
                active.activity_signals = Set(to_json(&write.activity_signals)?);
                active.automation = Set(to_json(&write.automation)?);
                active.last_detected_at = Set(now);
                active.last_evaluated_at = Set(now);
                active.resolved_by = Set(None);
                active.resolved_at = Set(None);
                active.resolution_action = Set(None);
                Ok(active.update(&self.db).await?)
            }
            None => {
                let fresh = moderation_signals::ActiveModel {
                    content_type: Set(target.content_type.as_str().to_string()),
                    content_id: Set(target.content_id),
                    status: Set(SignalStatus::Active),
                    trigger_source: Set(write.trigger_source),
                    score: Set(write.score),
                    severity: Set(write.severity),
                    recommended_action: Set(write.recommended_action),
                    triggered_rules: Set(to_json(&write.triggered_rules)?),
                    text_signals: Set(to_json(&write.text_signals)?),
                    activity_signals: Set(to_json(&write.activity_signals)?),
                    automation: Set(to_json(&write.automation)?),
                    first_detected_at: Set(now),
                    last_detected_at: Set(now),
                    last_evaluated_at: Set(now),
                    resolved_by: Set(None),
                    resolved_at: Set(None),
                    resolution_action: Set(None),
                    ..Default::default()
                };
                Ok(fresh.insert(&self.db).await?)
            }
        }
    }

    async fn clear(
        &self,
        target: &ModerationTarget,
        automation: AutomationState,
        now: NaiveDateTime,
    ) -> Result<Option<moderation_signals::Model>, ModerationError> {
        let existing = match self.find_by_target(target).await? {
            Some(model) => model,
            None => return Ok(None),
        };

        // Zero out the finding but keep the last text/activity measurements
        // for queue history.
        let mut active: moderation_signals::ActiveModel = existing.into();
        active.status = Set(SignalStatus::Cleared);
        active.score = Set(0);
        active.severity = Set(Severity::None);
        active.recommended_action = Set(RecommendedAction::None);
        active.triggered_rules = Set(serde_json::json!([]));
        active.automation = Set(to_json(&automation)?);
        active.last_evaluated_at = Set(now);
        active.resolved_by = Set(None);
        active.resolved_at = Set(Some(now));
        active.resolution_action = Set(Some("cleared".to_string()));
        Ok(Some(active.update(&self.db).await?))
    }

    async fn record_automation(
        &self,
        target: &ModerationTarget,
        automation: &AutomationState,
        now: NaiveDateTime,
    ) -> Result<(), ModerationError> {
        match self.find_by_target(target).await? {
            Some(existing) => {
                let mut active: moderation_signals::ActiveModel = existing.into();
                active.automation = Set(to_json(automation)?);
                active.last_evaluated_at = Set(now);
                active.update(&self.db).await?;
                Ok(())
            }
            None => {
                // The row this outcome belongs to is gone; nothing sane to do
                log::warn!("automation outcome for {} has no signal row", target);
                Ok(())
            }
        }
    }

    async fn resolve(
        &self,
        target: &ModerationTarget,
        moderator_id: i32,
        resolution: SignalResolution,
        now: NaiveDateTime,
    ) -> Result<Option<moderation_signals::Model>, ModerationError> {
        let existing = match self.find_by_target(target).await? {
            Some(model) => model,
            None => return Ok(None),
        };

        let mut active: moderation_signals::ActiveModel = existing.into();
        active.status = Set(resolution.status());
        active.resolved_by = Set(Some(moderator_id));
        active.resolved_at = Set(Some(now));
        active.resolution_action = Set(Some(resolution.as_str().to_string()));
        Ok(Some(active.update(&self.db).await?))
    }
}

pub struct DbModerationActions {
    db: DatabaseConnection,
}

impl DbModerationActions {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ModerationActions for DbModerationActions {
    async fn hide(
        &self,
        actor_user_id: i32,
        target: &ModerationTarget,
        reason: &str,
        note: Option<&str>,
        metadata: serde_json::Value,
    ) -> Result<HideOutcome, ModerationError> {
        let db = &self.db;
        let id = target.content_id;
        log::debug!(
            "hide of {} by user {}: {} (note: {:?}, metadata: {})",
            target,
            actor_user_id,
            reason,
            note,
            metadata
        );

        let previous = match target.content_type {
            ContentType::Article => {
                let row = articles::Entity::find_by_id(id)
                    .one(db)
                    .await?
                    .ok_or(ModerationError::TargetNotFound(*target))?;
                let previous = row.moderation_status;
                if previous != ModerationStatus::Hidden {
                    let mut active: articles::ActiveModel = row.into();
                    active.moderation_status = Set(ModerationStatus::Hidden);
                    active.update(db).await?;
                }
                previous
            }
            ContentType::Video => {
                let row = videos::Entity::find_by_id(id)
                    .one(db)
                    .await?
                    .ok_or(ModerationError::TargetNotFound(*target))?;
                let previous = row.moderation_status;
                if previous != ModerationStatus::Hidden {
                    let mut active: videos::ActiveModel = row.into();
                    active.moderation_status = Set(ModerationStatus::Hidden);
                    active.update(db).await?;
                }
                previous
            }
            ContentType::Course => {
                let row = courses::Entity::find_by_id(id)
                    .one(db)
                    .await?
                    .ok_or(ModerationError::TargetNotFound(*target))?;
                let previous = row.moderation_status;
                if previous != ModerationStatus::Hidden {
                    let mut active: courses::ActiveModel = row.into();
                    active.moderation_status = Set(ModerationStatus::Hidden);
                    active.update(db).await?;
                }
                previous
            }
            ContentType::Live => {
                let row = lives::Entity::find_by_id(id)
                    .one(db)
                    .await?
                    .ok_or(ModerationError::TargetNotFound(*target))?;
                let previous = row.moderation_status;
                if previous != ModerationStatus::Hidden {
                    let mut active: lives::ActiveModel = row.into();
                    active.moderation_status = Set(ModerationStatus::Hidden);
                    active.update(db).await?;
                }
                previous
            }
            ContentType::Podcast => {
                let row = podcasts::Entity::find_by_id(id)
                    .one(db)
                    .await?
                    .ok_or(ModerationError::TargetNotFound(*target))?;
                let previous = row.moderation_status;
                if previous != ModerationStatus::Hidden {
                    let mut active: podcasts::ActiveModel = row.into();
                    active.moderation_status = Set(ModerationStatus::Hidden);
                    active.update(db).await?;
                }
                previous
            }
            ContentType::Book => {
                let row = books::Entity::find_by_id(id)
                    .one(db)
                    .await?
                    .ok_or(ModerationError::TargetNotFound(*target))?;
                let previous = row.moderation_status;
                if previous != ModerationStatus::Hidden {
                    let mut active: books::ActiveModel = row.into();
                    active.moderation_status = Set(ModerationStatus::Hidden);
                    active.update(db).await?;
                }
                previous
            }
            ContentType::Comment => {
                let row = comments::Entity::find_by_id(id)
                    .one(db)
                    .await?
                    .ok_or(ModerationError::TargetNotFound(*target))?;
                let previous = row.moderation_status;
                if previous != ModerationStatus::Hidden {
                    let mut active: comments::ActiveModel = row.into();
                    active.moderation_status = Set(ModerationStatus::Hidden);
                    active.update(db).await?;
                }
                previous
            }
            ContentType::Review => {
                let row = reviews::Entity::find_by_id(id)
                    .one(db)
                    .await?
                    .ok_or(ModerationError::TargetNotFound(*target))?;
                let previous = row.moderation_status;
                if previous != ModerationStatus::Hidden {
                    let mut active: reviews::ActiveModel = row.into();
                    active.moderation_status = Set(ModerationStatus::Hidden);
                    active.update(db).await?;
                }
                previous
            }
        };

        Ok(HideOutcome {
            changed: previous != ModerationStatus::Hidden,
            previous,
            current: ModerationStatus::Hidden,
        })
    }
}

pub struct DbAuditSink {
    db: DatabaseConnection,
}

impl DbAuditSink {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuditSink for DbAuditSink {
    async fn record(&self, entry: AuditEntry) -> Result<(), ModerationError> {
        let row = audit_log::ActiveModel {
            actor_id: Set(entry.actor_id),
            actor_role: Set(entry.actor_role),
            action: Set(entry.action),
            scope: Set(entry.scope),
            resource_type: Set(entry.resource_type),
            resource_id: Set(entry.resource_id),
            reason: Set(entry.reason),
            method: Set(entry.method),
            path: Set(entry.path),
            status_code: Set(entry.status_code),
            outcome: Set(entry.outcome),
            metadata: Set(entry.metadata),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        };
        row.insert(&self.db).await?;
        Ok(())
    }
}
