//! Processed billing webhook events, kept for idempotency.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "billing_event")]
pub struct Model {
    /// Event ID assigned by the billing provider
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub kind: String,

    /// User the event was applied to, if it could be resolved
    #[sea_orm(nullable)]
    pub user_id: Option<String>,

    pub received_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
