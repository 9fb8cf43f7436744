//! Moderation log repository.

use std::sync::Arc;

use crate::entities::{ModerationLog, moderation_log};
use pollnow_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

/// Repository for the admin audit trail.
#[derive(Clone)]
pub struct ModerationLogRepository {
    db: Arc<DatabaseConnection>,
}

impl ModerationLogRepository {
    /// Create a new moderation log repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Append an entry.
    pub async fn create(
        &self,
        model: moderation_log::ActiveModel,
    ) -> AppResult<moderation_log::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List entries newest first, paging backwards with `until_id`.
    pub async fn find_recent(
        &self,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<moderation_log::Model>> {
        let mut query = ModerationLog::find().order_by_desc(moderation_log::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(moderation_log::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Entries concerning one target, newest first.
    pub async fn find_by_target(&self, target_id: &str) -> AppResult<Vec<moderation_log::Model>> {
        ModerationLog::find()
            .filter(moderation_log::Column::TargetId.eq(target_id))
            .order_by_desc(moderation_log::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
