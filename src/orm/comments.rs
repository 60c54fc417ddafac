//! SeaORM Entity for comments table
//!
//! Comments attach to any primary content surface through the
//! (content_type, content_id) pair. They have no draft state; a stored
//! comment is live unless moderation hides it.

use sea_orm::entity::prelude::*;

use super::ModerationStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "comments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: Option<i32>,
    /// Parent surface ("article", "video", ...)
    pub content_type: String,
    pub content_id: i32,
    #[sea_orm(column_type = "Text")]
    pub body: String,
    pub moderation_status: ModerationStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Author,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
