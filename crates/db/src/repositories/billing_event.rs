//! Processed billing webhook events.

use std::sync::Arc;

use crate::entities::{BillingEvent, billing_event};
use chrono::Utc;
use pollnow_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    sea_query::{Expr, OnConflict},
};

/// Repository recording which provider events were already applied.
#[derive(Clone)]
pub struct BillingEventRepository {
    db: Arc<DatabaseConnection>,
}

impl BillingEventRepository {
    /// Create a new billing event repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Claim a provider event ID before applying it.
    ///
    /// Returns `false` when the ID is already recorded, including when a
    /// concurrent delivery claimed it first.
    pub async fn claim(&self, id: &str, kind: &str) -> AppResult<bool> {
        let model = billing_event::ActiveModel {
            id: Set(id.to_string()),
            kind: Set(kind.to_string()),
            user_id: Set(None),
            received_at: Set(Utc::now().into()),
        };

        let inserted = BillingEvent::insert(model)
            .on_conflict(
                OnConflict::column(billing_event::Column::Id)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(inserted > 0)
    }

    /// Link a claimed event to the user it was applied to.
    pub async fn attach_user(&self, id: &str, user_id: &str) -> AppResult<()> {
        BillingEvent::update_many()
            .col_expr(billing_event::Column::UserId, Expr::value(user_id))
            .filter(billing_event::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Drop a claim whose event could not be applied, so a retry can.
    pub async fn release(&self, id: &str) -> AppResult<()> {
        BillingEvent::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn affected(rows: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: rows,
        }
    }

    #[tokio::test]
    async fn test_claim_reports_first_delivery_only() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([affected(1), affected(0)])
                .into_connection(),
        );

        let repo = BillingEventRepository::new(db);
        assert!(repo.claim("evt_1", "invoice.payment_failed").await.unwrap());
        assert!(!repo.claim("evt_1", "invoice.payment_failed").await.unwrap());
    }

    #[tokio::test]
    async fn test_attach_and_release() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([affected(1), affected(1)])
                .into_connection(),
        );

        let repo = BillingEventRepository::new(db);
        repo.attach_user("evt_1", "user1").await.unwrap();
        repo.release("evt_1").await.unwrap();
    }
}
