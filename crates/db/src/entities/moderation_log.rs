//! Moderation audit log entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Action recorded in the moderation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "camelCase")]
pub enum ModerationAction {
    #[sea_orm(string_value = "approveEvent")]
    ApproveEvent,
    #[sea_orm(string_value = "denyEvent")]
    DenyEvent,
    #[sea_orm(string_value = "resolveReport")]
    ResolveReport,
    #[sea_orm(string_value = "dismissReport")]
    DismissReport,
    #[sea_orm(string_value = "banUser")]
    BanUser,
    #[sea_orm(string_value = "unbanUser")]
    UnbanUser,
    #[sea_orm(string_value = "setPlan")]
    SetPlan,
    #[sea_orm(string_value = "closeSupportChat")]
    CloseSupportChat,
}

/// Kind of record a log entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "camelCase")]
pub enum TargetType {
    #[sea_orm(string_value = "event")]
    Event,
    #[sea_orm(string_value = "report")]
    Report,
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "supportChat")]
    SupportChat,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "moderation_log")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Admin who performed the action
    #[sea_orm(indexed)]
    pub moderator_id: String,

    pub action: ModerationAction,

    pub target_type: TargetType,

    #[sea_orm(indexed)]
    pub target_id: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub reason: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
