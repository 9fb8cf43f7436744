//! Notification entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "camelCase")]
pub enum NotificationType {
    #[sea_orm(string_value = "eventApproved")]
    EventApproved,
    #[sea_orm(string_value = "eventDenied")]
    EventDenied,
    #[sea_orm(string_value = "reportResolved")]
    ReportResolved,
    #[sea_orm(string_value = "supportReply")]
    SupportReply,
    #[sea_orm(string_value = "subscriptionChanged")]
    SubscriptionChanged,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The user receiving the notification
    #[sea_orm(indexed)]
    pub user_id: String,

    /// Notification type
    pub notification_type: NotificationType,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub body: String,

    /// Related event, if any
    #[sea_orm(nullable)]
    pub event_id: Option<String>,

    /// Has this notification been read?
    #[sea_orm(default_value = false)]
    pub is_read: bool,

    pub created_at: DateTimeWithTimeZone,
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
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
