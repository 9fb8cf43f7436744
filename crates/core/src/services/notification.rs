//! Notification service.

use chrono::Utc;
use pollnow_common::{AppError, AppResult, IdGenerator};
use pollnow_db::{
    entities::notification::{self, NotificationType},
    repositories::NotificationRepository,
};
use sea_orm::Set;

/// Maximum page size for notification listings.
const MAX_LIMIT: u64 = 100;

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(notification_repo: NotificationRepository) -> Self {
        Self {
            notification_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a notification for a user.
    pub async fn create(
        &self,
        user_id: &str,
        notification_type: NotificationType,
        title: impl Into<String>,
        body: impl Into<String>,
        event_id: Option<&str>,
    ) -> AppResult<notification::Model> {
        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            notification_type: Set(notification_type),
            title: Set(title.into()),
            body: Set(body.into()),
            event_id: Set(event_id.map(str::to_string)),
            is_read: Set(false),
            created_at: Set(Utc::now().into()),
        };

        self.notification_repo.create(model).await
    }

    /// Create a notification as a side effect of another action.
    ///
    /// Failures are logged and swallowed so the primary action still succeeds.
    pub async fn notify(
        &self,
        user_id: &str,
        notification_type: NotificationType,
        title: impl Into<String>,
        body: impl Into<String>,
        event_id: Option<&str>,
    ) {
        if let Err(e) = self
            .create(user_id, notification_type, title, body, event_id)
            .await
        {
            tracing::warn!(error = %e, user_id = %user_id, "Failed to create notification");
        }
    }

    /// Get notifications for a user.
    pub async fn list(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
        unread_only: bool,
    ) -> AppResult<Vec<notification::Model>> {
        self.notification_repo
            .find_by_user(user_id, limit.clamp(1, MAX_LIMIT), until_id, unread_only)
            .await
    }

    /// Mark one notification as read.
    pub async fn mark_as_read(&self, user_id: &str, notification_id: &str) -> AppResult<()> {
        if self
            .notification_repo
            .mark_as_read(notification_id, user_id)
            .await?
        {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Notification {notification_id}")))
        }
    }

    /// Mark all notifications as read for a user.
    pub async fn mark_all_as_read(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.mark_all_as_read(user_id).await
    }

    /// Count unread notifications for a user.
    pub async fn count_unread(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(user_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn service(db: MockDatabase) -> NotificationService {
        NotificationService::new(NotificationRepository::new(Arc::new(db.into_connection())))
    }

    #[tokio::test]
    async fn test_mark_foreign_notification_not_found() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            },
        ]));

        let result = svc.mark_as_read("user1", "n-of-someone-else").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_notify_swallows_errors() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_errors([DbErr::Custom("db down".to_string())]),
        );

        svc.notify(
            "user1",
            NotificationType::EventApproved,
            "Approved",
            "Your event is live",
            Some("e1"),
        )
        .await;
    }
}
