//! Support chat repository.

use std::sync::Arc;

use crate::entities::{
    SupportChat, SupportMessage, support_chat, support_chat::ChatStatus, support_message,
};
use pollnow_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait, sea_query::Expr,
};

/// Repository for support chats and their messages.
#[derive(Clone)]
pub struct SupportChatRepository {
    db: Arc<DatabaseConnection>,
}

impl SupportChatRepository {
    /// Create a new support chat repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a chat by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<support_chat::Model>> {
        SupportChat::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a chat by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<support_chat::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Support chat {id}")))
    }

    /// Open a new chat.
    pub async fn create(&self, model: support_chat::ActiveModel) -> AppResult<support_chat::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a chat.
    pub async fn update(&self, model: support_chat::ActiveModel) -> AppResult<support_chat::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Chats opened by a user, most recently active first.
    pub async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<support_chat::Model>> {
        SupportChat::find()
            .filter(support_chat::Column::UserId.eq(user_id))
            .order_by_desc(support_chat::Column::LastMessageAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Chats for the staff inbox, most recently active first.
    pub async fn find_all(
        &self,
        status: Option<ChatStatus>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<support_chat::Model>> {
        let mut query = SupportChat::find();

        if let Some(s) = status {
            query = query.filter(support_chat::Column::Status.eq(s));
        }

        query
            .order_by_desc(support_chat::Column::LastMessageAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count chats with a given status.
    pub async fn count_by_status(&self, status: ChatStatus) -> AppResult<u64> {
        SupportChat::find()
            .filter(support_chat::Column::Status.eq(status))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Append a message and bump the chat's activity time atomically.
    pub async fn add_message(
        &self,
        model: support_message::ActiveModel,
    ) -> AppResult<support_message::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let message = model
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        SupportChat::update_many()
            .col_expr(
                support_chat::Column::LastMessageAt,
                Expr::value(message.created_at),
            )
            .filter(support_chat::Column::Id.eq(message.chat_id.as_str()))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(message)
    }

    /// Messages in a chat in send order, optionally only those after `since_id`.
    pub async fn find_messages(
        &self,
        chat_id: &str,
        since_id: Option<&str>,
        limit: u64,
    ) -> AppResult<Vec<support_message::Model>> {
        let mut query = SupportMessage::find()
            .filter(support_message::Column::ChatId.eq(chat_id))
            .order_by_asc(support_message::Column::Id);

        if let Some(id) = since_id {
            query = query.filter(support_message::Column::Id.gt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
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

    fn create_test_message(id: &str, is_staff: bool) -> support_message::Model {
        support_message::Model {
            id: id.to_string(),
            chat_id: "chat1".to_string(),
            sender_id: if is_staff { "admin1" } else { "user1" }.to_string(),
            is_staff,
            body: "Hello".to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_messages_since() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_message("m3", true)]])
                .into_connection(),
        );

        let repo = SupportChatRepository::new(db);
        let messages = repo.find_messages("chat1", Some("m2"), 100).await.unwrap();

        assert_eq!(messages.len(), 1);
        assert!(messages[0].is_staff);
    }

    #[tokio::test]
    async fn test_add_message_bumps_chat() {
        let message = create_test_message("m1", false);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[message.clone()]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = SupportChatRepository::new(db);
        let saved = repo
            .add_message(support_message::ActiveModel {
                id: Set(message.id.clone()),
                chat_id: Set(message.chat_id.clone()),
                sender_id: Set(message.sender_id.clone()),
                is_staff: Set(false),
                body: Set(message.body.clone()),
                created_at: Set(message.created_at),
            })
            .await
            .unwrap();

        assert_eq!(saved.id, "m1");
    }
}
