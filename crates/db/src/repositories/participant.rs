//! Participant repository.

use std::sync::Arc;

use crate::entities::{Participant, participant};
use pollnow_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait, sea_query::Expr,
};

/// Participant repository for database operations.
#[derive(Clone)]
pub struct ParticipantRepository {
    db: Arc<DatabaseConnection>,
}

impl ParticipantRepository {
    /// Create a new participant repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a participant by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<participant::Model>> {
        Participant::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a participant by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<participant::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Participant {id}")))
    }

    /// Get all participants of an event in display order.
    pub async fn find_by_event(&self, event_id: &str) -> AppResult<Vec<participant::Model>> {
        Participant::find()
            .filter(participant::Column::EventId.eq(event_id))
            .order_by_asc(participant::Column::Position)
            .order_by_asc(participant::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get participants by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<participant::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Participant::find()
            .filter(participant::Column::Id.is_in(ids.iter().cloned()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count participants in an event.
    pub async fn count_by_event(&self, event_id: &str) -> AppResult<u64> {
        Participant::find()
            .filter(participant::Column::EventId.eq(event_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Position to give the next participant appended to an event.
    pub async fn next_position(&self, event_id: &str) -> AppResult<i32> {
        let last = Participant::find()
            .filter(participant::Column::EventId.eq(event_id))
            .order_by_desc(participant::Column::Position)
            .limit(1)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(last.map_or(0, |p| p.position + 1))
    }

    /// Create a new participant.
    pub async fn create(&self, model: participant::ActiveModel) -> AppResult<participant::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a participant.
    pub async fn update(&self, model: participant::ActiveModel) -> AppResult<participant::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a participant. Poll options pointing at it cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Participant::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Rewrite positions so that `ordered_ids[i]` gets position `i`.
    ///
    /// Runs in a single transaction; IDs outside the event are left untouched.
    pub async fn reorder(&self, event_id: &str, ordered_ids: &[String]) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        for (index, id) in ordered_ids.iter().enumerate() {
            let position = i32::try_from(index).unwrap_or(i32::MAX);
            Participant::update_many()
                .col_expr(participant::Column::Position, Expr::value(position))
                .filter(participant::Column::Id.eq(id.as_str()))
                .filter(participant::Column::EventId.eq(event_id))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
