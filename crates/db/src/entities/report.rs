//! Report entity: a complaint about an event.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Report status.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    #[sea_orm(string_value = "resolved")]
    Resolved,
    #[sea_orm(string_value = "dismissed")]
    Dismissed,
}

/// Report model.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "report")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// The reported event.
    #[sea_orm(indexed)]
    pub event_id: String,
    /// The user who submitted the report; `None` for anonymous visitors.
    pub reporter_id: Option<String>,
    /// Reason for the report.
    #[sea_orm(column_type = "Text")]
    pub reason: String,
    /// Current status of the report.
    pub status: ReportStatus,
    /// Admin who handled the report.
    pub resolved_by: Option<String>,
    /// Resolution note by admin.
    #[sea_orm(column_type = "Text", nullable)]
    pub resolution_note: Option<String>,
    /// When the report was created.
    pub created_at: DateTimeWithTimeZone,
    /// When the report was resolved.
    pub resolved_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::event::Entity",
        from = "Column::EventId",
        to = "super::event::Column::Id",
        on_delete = "Cascade"
    )]
    Event,
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Event.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
