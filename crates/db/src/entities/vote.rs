//! Vote entity: one ballot per voter fingerprint per poll.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vote")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub poll_id: String,

    /// Salted hash identifying the voter
    pub voter_fingerprint: String,

    /// Set when the voter was signed in
    #[sea_orm(nullable)]
    pub user_id: Option<String>,

    /// Selected poll option IDs (JSON array of strings)
    #[sea_orm(column_type = "Json")]
    pub option_ids: JsonValue,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::poll::Entity",
        from = "Column::PollId",
        to = "super::poll::Column::Id",
        on_delete = "Cascade"
    )]
    Poll,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    User,
}

impl Related<super::poll::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Poll.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Model {
    /// Selected option IDs, tolerating malformed rows as an empty ballot.
    #[must_use]
    pub fn selected_options(&self) -> Vec<String> {
        serde_json::from_value(self.option_ids.clone()).unwrap_or_default()
    }
}

impl ActiveModelBehavior for ActiveModel {}
