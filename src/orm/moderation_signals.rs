//! SeaORM Entity for moderation_signals table
//!
//! One row per flagged piece of content (unique on content_type + content_id).
//! Repeated evaluations update the row in place; resolution by a moderator or
//! by a clean re-evaluation keeps the row around as history for the queue.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Review lifecycle of a signal row
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "moderation_signal_status")]
#[derive(Default)]
#[serde(rename_all = "snake_case")]
pub enum SignalStatus {
    /// Open finding, awaiting review
    #[sea_orm(string_value = "active")]
    #[default]
    Active,
    /// A moderator looked at it and kept the record for history
    #[sea_orm(string_value = "reviewed")]
    Reviewed,
    /// Dismissed, either by a moderator or by a clean re-evaluation
    #[sea_orm(string_value = "cleared")]
    Cleared,
}

impl SignalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalStatus::Active => "active",
            SignalStatus::Reviewed => "reviewed",
            SignalStatus::Cleared => "cleared",
        }
    }
}

/// Which write path asked for the evaluation
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "moderation_trigger_source")]
#[derive(Default)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    #[sea_orm(string_value = "create")]
    #[default]
    Create,
    #[sea_orm(string_value = "update")]
    Update,
    #[sea_orm(string_value = "publish")]
    Publish,
}

impl TriggerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerSource::Create => "create",
            TriggerSource::Update => "update",
            TriggerSource::Publish => "publish",
        }
    }
}

/// Severity tier derived from the aggregate score.
/// Declaration order matters: the derived Ord is used to compare tiers
/// against the configured auto-hide floor.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, EnumIter, DeriveActiveEnum, Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "moderation_severity")]
#[derive(Default)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[sea_orm(string_value = "none")]
    #[default]
    None,
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "critical")]
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Tolerant name lookup for config values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Severity::None),
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }
}

/// What the engine thinks a moderator (or the automation) should do
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "moderation_recommended_action")]
#[derive(Default)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    #[sea_orm(string_value = "none")]
    #[default]
    None,
    /// Surface in the review queue, no visibility change
    #[sea_orm(string_value = "review")]
    Review,
    /// Pull from discovery surfaces while a human looks
    #[sea_orm(string_value = "restrict")]
    Restrict,
    /// Remove from public view
    #[sea_orm(string_value = "hide")]
    Hide,
}

impl RecommendedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendedAction::None => "none",
            RecommendedAction::Review => "review",
            RecommendedAction::Restrict => "restrict",
            RecommendedAction::Hide => "hide",
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "moderation_signals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Flagged surface ("article", "comment", ...)
    pub content_type: String,
    pub content_id: i32,
    pub status: SignalStatus,
    pub trigger_source: TriggerSource,
    /// Aggregate score, sum of all triggered rule scores
    pub score: i32,
    pub severity: Severity,
    pub recommended_action: RecommendedAction,
    /// Array of triggered rule objects (rule, score, severity, description, metadata)
    pub triggered_rules: Json,
    /// Lexical and link features extracted from the content text
    pub text_signals: Json,
    /// Creation counts for the author over the 10m/60m windows
    pub activity_signals: Json,
    /// Auto-hide decision and execution record for the latest evaluation
    pub automation: Json,
    pub first_detected_at: DateTime,
    pub last_detected_at: DateTime,
    pub last_evaluated_at: DateTime,
    pub resolved_by: Option<i32>,
    pub resolved_at: Option<DateTime>,
    /// "reviewed", "dismissed", or "cleared" (system)
    pub resolution_action: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::ResolvedBy",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Resolver,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Resolver.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
