//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Subscription plan tier.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[sea_orm(string_value = "free")]
    #[default]
    Free,
    #[sea_orm(string_value = "premium")]
    Premium,
    #[sea_orm(string_value = "unlimited")]
    Unlimited,
}

/// Billing subscription status as last reported by the provider.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[sea_orm(string_value = "none")]
    #[default]
    None,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "past_due")]
    PastDue,
    #[sea_orm(string_value = "canceled")]
    Canceled,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub username: String,

    pub username_lower: String,

    #[sea_orm(nullable)]
    pub email: Option<String>,

    /// Display name
    #[sea_orm(nullable)]
    pub name: Option<String>,

    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Access token
    #[sea_orm(unique, nullable)]
    #[serde(skip_serializing)]
    pub token: Option<String>,

    #[sea_orm(default_value = false)]
    pub is_admin: bool,

    #[sea_orm(default_value = false)]
    pub is_banned: bool,

    pub plan: Plan,

    /// Customer ID at the billing provider
    #[sea_orm(nullable)]
    pub billing_customer_id: Option<String>,

    /// Subscription ID at the billing provider
    #[sea_orm(nullable)]
    pub subscription_id: Option<String>,

    pub subscription_status: SubscriptionStatus,

    /// End of the current paid period
    #[sea_orm(nullable)]
    pub plan_renews_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::event::Entity")]
    Events,

    #[sea_orm(has_many = "super::notification::Entity")]
    Notifications,
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Events.def()
    }
}

impl Related<super::notification::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notifications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
