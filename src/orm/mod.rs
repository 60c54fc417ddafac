//! SeaORM entities for the content catalog and the moderation tables.

pub mod articles;
pub mod audit_log;
pub mod books;
pub mod comments;
pub mod courses;
pub mod lives;
pub mod moderation_signals;
pub mod podcasts;
pub mod reviews;
pub mod users;
pub mod videos;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Moderation visibility shared by every catalog table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "moderation_status")]
#[derive(Default)]
#[serde(rename_all = "snake_case")]
pub enum ModerationStatus {
    /// Normal visibility, eligible for listings and feeds
    #[sea_orm(string_value = "visible")]
    #[default]
    Visible,
    /// Removed from public view by moderation
    #[sea_orm(string_value = "hidden")]
    Hidden,
    /// Visible but excluded from discovery surfaces
    #[sea_orm(string_value = "restricted")]
    Restricted,
}

impl ModerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationStatus::Visible => "visible",
            ModerationStatus::Hidden => "hidden",
            ModerationStatus::Restricted => "restricted",
        }
    }
}

/// Publication lifecycle of primary content.
///
/// Comments and reviews carry no publish column; they are treated as live from
/// the moment they exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "publish_status")]
#[derive(Default)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    #[sea_orm(string_value = "draft")]
    #[default]
    Draft,
    #[sea_orm(string_value = "published")]
    Published,
    #[sea_orm(string_value = "archived")]
    Archived,
}

impl PublishStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStatus::Draft => "draft",
            PublishStatus::Published => "published",
            PublishStatus::Archived => "archived",
        }
    }
}
