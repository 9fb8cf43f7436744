//! Event entity: an award gala owned by one user.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Moderation status of an event.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "UPPERCASE")]
pub enum EventStatus {
    #[sea_orm(string_value = "DRAFT")]
    #[default]
    Draft,
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    #[sea_orm(string_value = "DENIED")]
    Denied,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "event")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owner
    #[sea_orm(indexed)]
    pub user_id: String,

    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub status: EventStatus,

    /// Results reveal time; voting closes at the same instant
    #[sea_orm(nullable)]
    pub gala_date: Option<DateTimeWithTimeZone>,

    /// Listed in the public directory once approved
    #[sea_orm(default_value = true)]
    pub is_public: bool,

    /// Reason given by the moderator on denial
    #[sea_orm(column_type = "Text", nullable)]
    pub moderation_note: Option<String>,

    #[sea_orm(nullable)]
    pub submitted_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,

    #[sea_orm(has_many = "super::participant::Entity")]
    Participants,

    #[sea_orm(has_many = "super::poll::Entity")]
    Polls,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::participant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participants.def()
    }
}

impl Related<super::poll::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Polls.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
