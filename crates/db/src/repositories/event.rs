//! Event repository.

use std::sync::Arc;

use crate::entities::{Event, event, event::EventStatus};
use pollnow_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

/// Event repository for database operations.
#[derive(Clone)]
pub struct EventRepository {
    db: Arc<DatabaseConnection>,
}

impl EventRepository {
    /// Create a new event repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an event by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<event::Model>> {
        Event::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an event by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<event::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::EventNotFound(id.to_string()))
    }

    /// Create a new event.
    pub async fn create(&self, model: event::ActiveModel) -> AppResult<event::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update an event.
    pub async fn update(&self, model: event::ActiveModel) -> AppResult<event::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete an event. Participants, polls and votes cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Event::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get events owned by a user, newest first.
    pub async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<event::Model>> {
        Event::find()
            .filter(event::Column::UserId.eq(user_id))
            .order_by_desc(event::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count events owned by a user.
    pub async fn count_by_user(&self, user_id: &str) -> AppResult<u64> {
        Event::find()
            .filter(event::Column::UserId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get approved public events (paginated).
    pub async fn find_public(&self, limit: u64, offset: u64) -> AppResult<Vec<event::Model>> {
        Event::find()
            .filter(event::Column::Status.eq(EventStatus::Approved))
            .filter(event::Column::IsPublic.eq(true))
            .order_by_desc(event::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get events with a given moderation status, oldest submission first.
    pub async fn find_by_status(
        &self,
        status: EventStatus,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<event::Model>> {
        Event::find()
            .filter(event::Column::Status.eq(status))
            .order_by_asc(event::Column::SubmittedAt)
            .order_by_asc(event::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count events with a given moderation status.
    pub async fn count_by_status(&self, status: EventStatus) -> AppResult<u64> {
        Event::find()
            .filter(event::Column::Status.eq(status))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_event(id: &str, user_id: &str, status: EventStatus) -> event::Model {
        event::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            name: "Friends of the Year".to_string(),
            description: None,
            status,
            gala_date: None,
            is_public: true,
            moderation_note: None,
            submitted_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_public() {
        let e1 = create_test_event("event1", "user1", EventStatus::Approved);
        let e2 = create_test_event("event2", "user2", EventStatus::Approved);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[e1, e2]])
                .into_connection(),
        );

        let repo = EventRepository::new(db);
        let result = repo.find_public(20, 0).await.unwrap();

        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn test_get_by_id_missing_is_event_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<event::Model>::new()])
                .into_connection(),
        );

        let repo = EventRepository::new(db);
        let result = repo.get_by_id("nope").await;

        assert!(matches!(result, Err(AppError::EventNotFound(_))));
    }
}
