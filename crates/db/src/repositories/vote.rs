//! Vote repository.

use std::sync::Arc;

use crate::entities::{Vote, vote};
use pollnow_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, SqlErr,
};

/// Vote repository for database operations.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Record a ballot.
    ///
    /// A second ballot for the same poll and fingerprint hits the unique
    /// index and is reported as [`AppError::Conflict`].
    pub async fn create(&self, model: vote::ActiveModel) -> AppResult<vote::Model> {
        model.insert(self.db.as_ref()).await.map_err(map_insert_error)
    }

    /// Find the ballot cast by a fingerprint on a poll.
    pub async fn find_by_fingerprint(
        &self,
        poll_id: &str,
        fingerprint: &str,
    ) -> AppResult<Option<vote::Model>> {
        Vote::find()
            .filter(vote::Column::PollId.eq(poll_id))
            .filter(vote::Column::VoterFingerprint.eq(fingerprint))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the ballots a fingerprint cast across several polls.
    pub async fn find_by_fingerprint_in_polls(
        &self,
        poll_ids: &[String],
        fingerprint: &str,
    ) -> AppResult<Vec<vote::Model>> {
        if poll_ids.is_empty() {
            return Ok(vec![]);
        }

        Vote::find()
            .filter(vote::Column::PollId.is_in(poll_ids.iter().cloned()))
            .filter(vote::Column::VoterFingerprint.eq(fingerprint))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get all ballots of a poll.
    pub async fn find_by_poll(&self, poll_id: &str) -> AppResult<Vec<vote::Model>> {
        Vote::find()
            .filter(vote::Column::PollId.eq(poll_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get all ballots of several polls.
    pub async fn find_by_polls(&self, poll_ids: &[String]) -> AppResult<Vec<vote::Model>> {
        if poll_ids.is_empty() {
            return Ok(vec![]);
        }

        Vote::find()
            .filter(vote::Column::PollId.is_in(poll_ids.iter().cloned()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count ballots on a poll.
    pub async fn count_by_poll(&self, poll_id: &str) -> AppResult<u64> {
        Vote::find()
            .filter(vote::Column::PollId.eq(poll_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

fn map_insert_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("Already voted in this poll".to_string())
        }
        _ => AppError::Database(err.to_string()),
    }
}
