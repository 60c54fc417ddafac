//! In-memory backends for the engine collaborators
//!
//! Used by the test suites. They implement the same row semantics as the
//! sea-orm backends, so the full evaluate / clear / resolve lifecycle can be
//! exercised without a database.

use super::{
    AuditEntry, AuditSink, ContentProvider, ContentSnapshot, ContentType, HideOutcome,
    ModerationActions, ModerationError, ModerationTarget, SignalResolution, SignalStore,
    SignalWrite,
};
use crate::moderation::policy::AutomationState;
use crate::orm::moderation_signals::{self, RecommendedAction, Severity, SignalStatus};
use crate::orm::ModerationStatus;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, ModerationError> {
    Ok(serde_json::to_value(value)?)
}

/// Content snapshots plus a creation ledger for activity counting.
#[derive(Default)]
pub struct MemoryContentProvider {
    snapshots: DashMap<(ContentType, i32), ContentSnapshot>,
    creations: DashMap<(ContentType, i32), Vec<NaiveDateTime>>,
}

impl MemoryContentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the snapshot for a target.
    pub fn insert_content(&self, target: ModerationTarget, snapshot: ContentSnapshot) {
        self.snapshots
            .insert((target.content_type, target.content_id), snapshot);
    }

    /// Record one creation event for the activity windows.
    pub fn record_creation(
        &self,
        content_type: ContentType,
        actor_user_id: i32,
        created_at: NaiveDateTime,
    ) {
        self.creations
            .entry((content_type, actor_user_id))
            .or_default()
            .push(created_at);
    }

    /// Current stored moderation status, for assertions.
    pub fn moderation_status(&self, target: &ModerationTarget) -> Option<ModerationStatus> {
        self.snapshots
            .get(&(target.content_type, target.content_id))
            .map(|snapshot| snapshot.moderation_status)
    }

    fn set_moderation_status(&self, target: &ModerationTarget, status: ModerationStatus) {
        if let Some(mut snapshot) = self
            .snapshots
            .get_mut(&(target.content_type, target.content_id))
        {
            snapshot.moderation_status = status;
        }
    }
}

#[async_trait]
impl ContentProvider for MemoryContentProvider {
    async fn snapshot(
        &self,
        target: &ModerationTarget,
    ) -> Result<Option<ContentSnapshot>, ModerationError> {
        Ok(self
            .snapshots
            .get(&(target.content_type, target.content_id))
            .map(|snapshot| snapshot.clone()))
    }

    async fn count_created_since(
        &self,
        content_type: ContentType,
        actor_user_id: i32,
        since: NaiveDateTime,
    ) -> Result<u64, ModerationError> {
        Ok(self
            .creations
            .get(&(content_type, actor_user_id))
            .map(|stamps| stamps.iter().filter(|at| **at > since).count() as u64)
            .unwrap_or(0))
    }
}

/// Signal rows in a map, same write semantics as the database store.
pub struct MemorySignalStore {
    records: DashMap<(ContentType, i32), moderation_signals::Model>,
    next_id: AtomicI32,
}

impl MemorySignalStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            next_id: AtomicI32::new(1),
        }
    }
}

impl Default for MemorySignalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalStore for MemorySignalStore {
    async fn find_by_target(
        &self,
        target: &ModerationTarget,
    ) -> Result<Option<moderation_signals::Model>, ModerationError> {
        Ok(self
            .records
            .get(&(target.content_type, target.content_id))
            .map(|row| row.clone()))
    }

    async fn upsert(
        &self,
        target: &ModerationTarget,
        write: SignalWrite,
        now: NaiveDateTime,
    ) -> Result<moderation_signals::Model, ModerationError> {
        let key = (target.content_type, target.content_id);

        if let Some(mut row) = self.records.get_mut(&key) {
            row.status = SignalStatus::Active;
            row.trigger_source = write.trigger_source;
            row.score = write.score;
            row.severity = write.severity;
            row.recommended_action = write.recommended_action;
            row.triggered_rules = to_json(&write.triggered_rules)?;
            row.text_signals = to_json(&write.text_signals)?;
            row.activity_signals = to_json(&write.activity_signals)?;
            row.automation = to_json(&write.automation)?;
            row.last_detected_at = now;
            row.last_evaluated_at = now;
            row.resolved_by = None;
            row.resolved_at = None;
            row.resolution_action = None;
            return Ok(row.clone());
        }

        let fresh = moderation_signals::Model {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            content_type: target.content_type.as_str().to_string(),
            content_id: target.content_id,
            status: SignalStatus::Active,
            trigger_source: write.trigger_source,
            score: write.score,
            severity: write.severity,
            recommended_action: write.recommended_action,
            triggered_rules: to_json(&write.triggered_rules)?,
            text_signals: to_json(&write.text_signals)?,
            activity_signals: to_json(&write.activity_signals)?,
            automation: to_json(&write.automation)?,
            first_detected_at: now,
            last_detected_at: now,
            last_evaluated_at: now,
            resolved_by: None,
            resolved_at: None,
            resolution_action: None,
        };
        self.records.insert(key, fresh.clone());
        Ok(fresh)
    }

    async fn clear(
        &self,
        target: &ModerationTarget,
        automation: AutomationState,
        now: NaiveDateTime,
    ) -> Result<Option<moderation_signals::Model>, ModerationError> {
        let key = (target.content_type, target.content_id);
        let mut row = match self.records.get_mut(&key) {
            Some(row) => row,
            None => return Ok(None),
        };

        row.status = SignalStatus::Cleared;
        row.score = 0;
        row.severity = Severity::None;
        row.recommended_action = RecommendedAction::None;
        row.triggered_rules = serde_json::json!([]);
        row.automation = to_json(&automation)?;
        row.last_evaluated_at = now;
        row.resolved_by = None;
        row.resolved_at = Some(now);
        row.resolution_action = Some("cleared".to_string());
        Ok(Some(row.clone()))
    }

    async fn record_automation(
        &self,
        target: &ModerationTarget,
        automation: &AutomationState,
        now: NaiveDateTime,
    ) -> Result<(), ModerationError> {
        let key = (target.content_type, target.content_id);
        if let Some(mut row) = self.records.get_mut(&key) {
            row.automation = to_json(automation)?;
            row.last_evaluated_at = now;
        } else {
            log::warn!("automation outcome for {} has no signal row", target);
        }
        Ok(())
    }

    async fn resolve(
        &self,
        target: &ModerationTarget,
        moderator_id: i32,
        resolution: SignalResolution,
        now: NaiveDateTime,
    ) -> Result<Option<moderation_signals::Model>, ModerationError> {
        let key = (target.content_type, target.content_id);
        let mut row = match self.records.get_mut(&key) {
            Some(row) => row,
            None => return Ok(None),
        };

        row.status = resolution.status();
        row.resolved_by = Some(moderator_id);
        row.resolved_at = Some(now);
        row.resolution_action = Some(resolution.as_str().to_string());
        Ok(Some(row.clone()))
    }
}

/// One recorded hide request.
#[derive(Debug, Clone)]
pub struct HideCall {
    pub actor_user_id: i32,
    pub target: ModerationTarget,
    pub reason: String,
    pub note: Option<String>,
    pub metadata: serde_json::Value,
}

/// Records hide requests; optionally wired to a [`MemoryContentProvider`] so
/// a successful hide is visible to later snapshots, like the real backend.
#[derive(Default)]
pub struct MemoryModerationActions {
    calls: Mutex<Vec<HideCall>>,
    fail_with: Mutex<Option<String>>,
    content: Option<Arc<MemoryContentProvider>>,
}

impl MemoryModerationActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wired(content: Arc<MemoryContentProvider>) -> Self {
        Self {
            content: Some(content),
            ..Self::default()
        }
    }

    /// Make every subsequent hide fail with this message. Failed requests
    /// are still recorded in [`Self::calls`].
    pub fn fail_with(&self, message: &str) {
        if let Ok(mut fail) = self.fail_with.lock() {
            *fail = Some(message.to_string());
        }
    }

    pub fn calls(&self) -> Vec<HideCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ModerationActions for MemoryModerationActions {
    async fn hide(
        &self,
        actor_user_id: i32,
        target: &ModerationTarget,
        reason: &str,
        note: Option<&str>,
        metadata: serde_json::Value,
    ) -> Result<HideOutcome, ModerationError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(HideCall {
                actor_user_id,
                target: *target,
                reason: reason.to_string(),
                note: note.map(|n| n.to_string()),
                metadata,
            });
        }

        if let Ok(fail) = self.fail_with.lock() {
            if let Some(message) = fail.as_ref() {
                return Err(ModerationError::External(message.clone()));
            }
        }

        let previous = match &self.content {
            Some(content) => {
                let previous = content
                    .moderation_status(target)
                    .unwrap_or(ModerationStatus::Visible);
                content.set_moderation_status(target, ModerationStatus::Hidden);
                previous
            }
            None => ModerationStatus::Visible,
        };

        Ok(HideOutcome {
            changed: previous != ModerationStatus::Hidden,
            previous,
            current: ModerationStatus::Hidden,
        })
    }
}

/// Collects audit entries; can be told to fail for error-path tests.
#[derive(Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
    fail_with: Mutex<Option<String>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, message: &str) {
        if let Ok(mut fail) = self.fail_with.lock() {
            *fail = Some(message.to_string());
        }
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, entry: AuditEntry) -> Result<(), ModerationError> {
        if let Ok(fail) = self.fail_with.lock() {
            if let Some(message) = fail.as_ref() {
                return Err(ModerationError::External(message.clone()));
            }
        }
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
        Ok(())
    }
}
