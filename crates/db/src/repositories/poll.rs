//! Poll repository, including poll options.

use std::sync::Arc;

use crate::entities::{Poll, PollOption, poll, poll_option};
use pollnow_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, TransactionTrait, sea_query::Expr,
};

/// Poll repository for database operations.
#[derive(Clone)]
pub struct PollRepository {
    db: Arc<DatabaseConnection>,
}

impl PollRepository {
    /// Create a new poll repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a poll by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<poll::Model>> {
        Poll::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a poll by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<poll::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PollNotFound(id.to_string()))
    }

    /// Get all polls of an event in display order.
    pub async fn find_by_event(&self, event_id: &str) -> AppResult<Vec<poll::Model>> {
        Poll::find()
            .filter(poll::Column::EventId.eq(event_id))
            .order_by_asc(poll::Column::Position)
            .order_by_asc(poll::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count polls in an event.
    pub async fn count_by_event(&self, event_id: &str) -> AppResult<u64> {
        Poll::find()
            .filter(poll::Column::EventId.eq(event_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the options of a poll in display order.
    pub async fn find_options(&self, poll_id: &str) -> AppResult<Vec<poll_option::Model>> {
        PollOption::find()
            .filter(poll_option::Column::PollId.eq(poll_id))
            .order_by_asc(poll_option::Column::Position)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the options of several polls at once.
    pub async fn find_options_for_polls(
        &self,
        poll_ids: &[String],
    ) -> AppResult<Vec<poll_option::Model>> {
        if poll_ids.is_empty() {
            return Ok(vec![]);
        }

        PollOption::find()
            .filter(poll_option::Column::PollId.is_in(poll_ids.iter().cloned()))
            .order_by_asc(poll_option::Column::PollId)
            .order_by_asc(poll_option::Column::Position)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a poll and its options atomically.
    pub async fn create_with_options(
        &self,
        model: poll::ActiveModel,
        options: Vec<poll_option::ActiveModel>,
    ) -> AppResult<poll::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let poll = model
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if !options.is_empty() {
            PollOption::insert_many(options)
                .exec_without_returning(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(poll)
    }

    /// Update a poll, optionally replacing its option set atomically.
    pub async fn update(
        &self,
        model: poll::ActiveModel,
        replace_options: Option<Vec<poll_option::ActiveModel>>,
    ) -> AppResult<poll::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let poll = model
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if let Some(options) = replace_options {
            PollOption::delete_many()
                .filter(poll_option::Column::PollId.eq(poll.id.as_str()))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

            if !options.is_empty() {
                PollOption::insert_many(options)
                    .exec_without_returning(&txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
            }
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(poll)
    }

    /// Delete a poll. Options and votes cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Poll::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Rewrite positions so that `ordered_ids[i]` gets position `i`.
    pub async fn reorder(&self, event_id: &str, ordered_ids: &[String]) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        for (index, id) in ordered_ids.iter().enumerate() {
            let position = i32::try_from(index).unwrap_or(i32::MAX);
            Poll::update_many()
                .col_expr(poll::Column::Position, Expr::value(position))
                .filter(poll::Column::Id.eq(id.as_str()))
                .filter(poll::Column::EventId.eq(event_id))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Set};

    fn create_test_poll(id: &str) -> poll::Model {
        poll::Model {
            id: id.to_string(),
            event_id: "event1".to_string(),
            title: "Funniest Friend".to_string(),
            description: None,
            max_choices: 1,
            position: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_option(id: &str, poll_id: &str, position: i32) -> poll_option::Model {
        poll_option::Model {
            id: id.to_string(),
            poll_id: poll_id.to_string(),
            participant_id: format!("participant-{id}"),
            position,
        }
    }

    #[tokio::test]
    async fn test_get_by_id_missing_is_poll_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<poll::Model>::new()])
                .into_connection(),
        );

        let repo = PollRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::PollNotFound(_))));
    }

    #[tokio::test]
    async fn test_find_options() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    create_test_option("o1", "poll1", 0),
                    create_test_option("o2", "poll1", 1),
                ]])
                .into_connection(),
        );

        let repo = PollRepository::new(db);
        let options = repo.find_options("poll1").await.unwrap();

        assert_eq!(options.len(), 2);
        assert_eq!(options[0].id, "o1");
    }

    #[tokio::test]
    async fn test_create_with_options() {
        let poll = create_test_poll("poll1");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[poll.clone()]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 2,
                }])
                .into_connection(),
        );

        let repo = PollRepository::new(db);
        let model = poll::ActiveModel {
            id: Set(poll.id.clone()),
            event_id: Set(poll.event_id.clone()),
            title: Set(poll.title.clone()),
            description: Set(None),
            max_choices: Set(1),
            position: Set(0),
            created_at: Set(poll.created_at),
            updated_at: Set(None),
        };
        let options = vec![
            poll_option::ActiveModel {
                id: Set("o1".to_string()),
                poll_id: Set("poll1".to_string()),
                participant_id: Set("p1".to_string()),
                position: Set(0),
            },
            poll_option::ActiveModel {
                id: Set("o2".to_string()),
                poll_id: Set("poll1".to_string()),
                participant_id: Set("p2".to_string()),
                position: Set(1),
            },
        ];

        let created = repo.create_with_options(model, options).await.unwrap();
        assert_eq!(created.id, "poll1");
    }
}
