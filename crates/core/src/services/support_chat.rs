//! Support chat between users and staff.
//!
//! Clients poll [`SupportChatService::messages`] with the last message ID
//! they have seen; there is no push channel.

use chrono::Utc;
use pollnow_common::{AppError, AppResult, IdGenerator};
use pollnow_db::{
    entities::{
        moderation_log::{ModerationAction, TargetType},
        notification::NotificationType,
        support_chat::{self, ChatStatus},
        support_message, user,
    },
    repositories::{ModerationLogRepository, SupportChatRepository},
};
use sea_orm::Set;
use serde::Serialize;

use super::moderation::{ensure_admin, write_log};
use super::notification::NotificationService;

const MAX_BODY_CHARS: usize = 4000;
const MAX_SUBJECT_CHARS: usize = 200;
const MESSAGE_PAGE: u64 = 200;

/// A chat with its opening message.
#[derive(Debug, Clone, Serialize)]
pub struct OpenedChat {
    pub chat: support_chat::Model,
    pub message: support_message::Model,
}

/// Support chat service.
#[derive(Clone)]
pub struct SupportChatService {
    chat_repo: SupportChatRepository,
    log_repo: ModerationLogRepository,
    notifications: NotificationService,
    id_gen: IdGenerator,
}

impl SupportChatService {
    /// Create a new support chat service.
    #[must_use]
    pub const fn new(
        chat_repo: SupportChatRepository,
        log_repo: ModerationLogRepository,
        notifications: NotificationService,
    ) -> Self {
        Self {
            chat_repo,
            log_repo,
            notifications,
            id_gen: IdGenerator::new(),
        }
    }

    /// Open a chat with a first message.
    pub async fn open(&self, user: &user::Model, subject: &str, body: &str) -> AppResult<OpenedChat> {
        let subject = subject.trim();
        if subject.is_empty() || subject.chars().count() > MAX_SUBJECT_CHARS {
            return Err(AppError::BadRequest(format!(
                "Subject must be 1 to {MAX_SUBJECT_CHARS} characters"
            )));
        }
        let body = validate_body(body)?;

        let now = Utc::now();
        let chat = self
            .chat_repo
            .create(support_chat::ActiveModel {
                id: Set(self.id_gen.generate()),
                user_id: Set(user.id.clone()),
                subject: Set(subject.to_string()),
                status: Set(ChatStatus::Open),
                last_message_at: Set(now.into()),
                created_at: Set(now.into()),
            })
            .await?;

        let message = self.append(&chat.id, user, false, body).await?;
        tracing::info!(chat_id = %chat.id, user_id = %user.id, "Support chat opened");

        Ok(OpenedChat { chat, message })
    }

    /// Post a message as the chat's owner.
    pub async fn send(
        &self,
        user: &user::Model,
        chat_id: &str,
        body: &str,
    ) -> AppResult<support_message::Model> {
        let chat = self.chat_repo.get_by_id(chat_id).await?;
        if chat.user_id != user.id {
            return Err(AppError::NotFound(format!("Support chat {chat_id}")));
        }
        ensure_open(&chat)?;

        let body = validate_body(body)?;
        self.append(chat_id, user, false, body).await
    }

    /// Messages after `since_id`, for the chat's owner or staff.
    pub async fn messages(
        &self,
        viewer: &user::Model,
        chat_id: &str,
        since_id: Option<&str>,
    ) -> AppResult<Vec<support_message::Model>> {
        let chat = self.chat_repo.get_by_id(chat_id).await?;
        if chat.user_id != viewer.id && !viewer.is_admin {
            return Err(AppError::NotFound(format!("Support chat {chat_id}")));
        }

        self.chat_repo
            .find_messages(chat_id, since_id, MESSAGE_PAGE)
            .await
    }

    /// Chats opened by a user.
    pub async fn mine(&self, user: &user::Model) -> AppResult<Vec<support_chat::Model>> {
        self.chat_repo.find_by_user(&user.id).await
    }

    /// Staff inbox.
    pub async fn list(
        &self,
        admin: &user::Model,
        status: Option<ChatStatus>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<support_chat::Model>> {
        ensure_admin(admin)?;
        self.chat_repo.find_all(status, limit.min(100), offset).await
    }

    /// Reply as staff and notify the chat's owner.
    pub async fn reply(
        &self,
        admin: &user::Model,
        chat_id: &str,
        body: &str,
    ) -> AppResult<support_message::Model> {
        ensure_admin(admin)?;

        let chat = self.chat_repo.get_by_id(chat_id).await?;
        ensure_open(&chat)?;

        let body = validate_body(body)?;
        let message = self.append(chat_id, admin, true, body).await?;

        self.notifications
            .notify(
                &chat.user_id,
                NotificationType::SupportReply,
                "Support replied",
                format!("New reply in \"{}\"", chat.subject),
                None,
            )
            .await;

        Ok(message)
    }

    /// Close a chat. Closed chats accept no further messages.
    pub async fn close(&self, admin: &user::Model, chat_id: &str) -> AppResult<support_chat::Model> {
        ensure_admin(admin)?;

        let chat = self.chat_repo.get_by_id(chat_id).await?;
        ensure_open(&chat)?;

        let mut active: support_chat::ActiveModel = chat.into();
        active.status = Set(ChatStatus::Closed);
        let chat = self.chat_repo.update(active).await?;

        write_log(
            &self.log_repo,
            &self.id_gen,
            admin,
            ModerationAction::CloseSupportChat,
            TargetType::SupportChat,
            &chat.id,
            None,
        )
        .await?;

        Ok(chat)
    }

    async fn append(
        &self,
        chat_id: &str,
        sender: &user::Model,
        is_staff: bool,
        body: &str,
    ) -> AppResult<support_message::Model> {
        self.chat_repo
            .add_message(support_message::ActiveModel {
                id: Set(self.id_gen.generate()),
                chat_id: Set(chat_id.to_string()),
                sender_id: Set(sender.id.clone()),
                is_staff: Set(is_staff),
                body: Set(body.to_string()),
                created_at: Set(Utc::now().into()),
            })
            .await
    }
}

fn ensure_open(chat: &support_chat::Model) -> AppResult<()> {
    if chat.status == ChatStatus::Closed {
        Err(AppError::Conflict("This chat is closed".to_string()))
    } else {
        Ok(())
    }
}

fn validate_body(body: &str) -> AppResult<&str> {
    let body = body.trim();
    if body.is_empty() || body.chars().count() > MAX_BODY_CHARS {
        return Err(AppError::BadRequest(format!(
            "Message must be 1 to {MAX_BODY_CHARS} characters"
        )));
    }
    Ok(body)
}
