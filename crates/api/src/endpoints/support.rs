//! Support chat endpoints for users.
//!
//! There is no push channel: clients poll `/support/messages` with the last
//! message ID they have seen, every few seconds.

use axum::{Json, Router, extract::State, routing::post};
use pollnow_common::AppResult;
use pollnow_core::OpenedChat;
use pollnow_db::entities::{
    support_chat::{self, ChatStatus},
    support_message,
};
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Support chat response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub id: String,
    pub user_id: String,
    pub subject: String,
    pub status: ChatStatus,
    pub last_message_at: String,
    pub created_at: String,
}

impl From<support_chat::Model> for ChatResponse {
    fn from(chat: support_chat::Model) -> Self {
        Self {
            id: chat.id,
            user_id: chat.user_id,
            subject: chat.subject,
            status: chat.status,
            last_message_at: chat.last_message_at.to_rfc3339(),
            created_at: chat.created_at.to_rfc3339(),
        }
    }
}

/// Support message response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub is_staff: bool,
    pub body: String,
    pub created_at: String,
}

impl From<support_message::Model> for MessageResponse {
    fn from(message: support_message::Model) -> Self {
        Self {
            id: message.id,
            chat_id: message.chat_id,
            sender_id: message.sender_id,
            is_staff: message.is_staff,
            body: message.body,
            created_at: message.created_at.to_rfc3339(),
        }
    }
}

/// A new chat with its opening message.
#[derive(Serialize)]
pub struct OpenedChatResponse {
    pub chat: ChatResponse,
    pub message: MessageResponse,
}

impl From<OpenedChat> for OpenedChatResponse {
    fn from(opened: OpenedChat) -> Self {
        Self {
            chat: opened.chat.into(),
            message: opened.message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OpenChatRequest {
    pub subject: String,
    pub body: String,
}

/// A message for an existing chat.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageRequest {
    pub chat_id: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesRequest {
    pub chat_id: String,
    /// Only messages newer than this one
    pub since_id: Option<String>,
}

async fn open_chat(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<OpenChatRequest>,
) -> AppResult<ApiResponse<OpenedChatResponse>> {
    let opened = state
        .support_chat_service
        .open(&user, &req.subject, &req.body)
        .await?;
    Ok(ApiResponse::created(opened.into()))
}

async fn send_message(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ChatMessageRequest>,
) -> AppResult<ApiResponse<MessageResponse>> {
    let message = state
        .support_chat_service
        .send(&user, &req.chat_id, &req.body)
        .await?;
    Ok(ApiResponse::created(message.into()))
}

async fn list_messages(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<MessagesRequest>,
) -> AppResult<ApiResponse<Vec<MessageResponse>>> {
    let messages = state
        .support_chat_service
        .messages(&user, &req.chat_id, req.since_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(messages.into_iter().map(Into::into).collect()))
}

async fn my_chats(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<ChatResponse>>> {
    let chats = state.support_chat_service.mine(&user).await?;
    Ok(ApiResponse::ok(chats.into_iter().map(Into::into).collect()))
}

/// Create the support router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/open", post(open_chat))
        .route("/send", post(send_message))
        .route("/messages", post(list_messages))
        .route("/mine", post(my_chats))
}
