//! SeaORM Entity for audit_log table
//!
//! Append-only record of privileged actions. Rows written by the moderation
//! automation use actor_role "system" and leave the request fields null.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "audit_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Acting user, or the configured service account for automated actions
    pub actor_id: Option<i32>,
    /// "admin", "moderator", "system", ...
    pub actor_role: String,
    /// Dotted action name, e.g. "content.auto_hide"
    pub action: String,
    /// Coarse grouping for filtering ("moderation", "account", ...)
    pub scope: String,
    pub resource_type: String,
    pub resource_id: Option<i32>,
    #[sea_orm(column_type = "Text", nullable)]
    pub reason: Option<String>,
    /// HTTP request context, null for non-request actors
    pub method: Option<String>,
    pub path: Option<String>,
    pub status_code: Option<i32>,
    /// "success" or "error"
    pub outcome: String,
    pub metadata: Option<Json>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::ActorId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Actor,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Actor.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
