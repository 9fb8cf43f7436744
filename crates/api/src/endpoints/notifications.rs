//! Notifications endpoints.

use axum::{Json, Router, extract::State, routing::post};
use pollnow_common::AppResult;
use pollnow_db::entities::notification::{self, NotificationType};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, OkResponse, ok},
};

/// List notifications request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNotificationsRequest {
    /// Maximum results (default: 10, max: 100)
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Cursor for pagination (before this ID)
    pub until_id: Option<String>,
    /// Only unread notifications
    #[serde(default)]
    pub unread_only: bool,
}

const fn default_limit() -> u64 {
    10
}

/// Notification response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub body: String,
    pub event_id: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}

impl From<notification::Model> for NotificationResponse {
    fn from(n: notification::Model) -> Self {
        Self {
            id: n.id,
            notification_type: n.notification_type,
            title: n.title,
            body: n.body,
            event_id: n.event_id,
            is_read: n.is_read,
            created_at: n.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub notification_id: String,
}

/// Count response.
#[derive(Serialize)]
pub struct CountResponse {
    pub count: u64,
}

async fn list_notifications(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ListNotificationsRequest>,
) -> AppResult<ApiResponse<Vec<NotificationResponse>>> {
    let notifications = state
        .notification_service
        .list(&user.id, req.limit, req.until_id.as_deref(), req.unread_only)
        .await?;
    Ok(ApiResponse::ok(
        notifications.into_iter().map(Into::into).collect(),
    ))
}

async fn mark_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<MarkReadRequest>,
) -> AppResult<ApiResponse<OkResponse>> {
    state
        .notification_service
        .mark_as_read(&user.id, &req.notification_id)
        .await?;
    Ok(ok())
}

async fn mark_all_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<CountResponse>> {
    let count = state.notification_service.mark_all_as_read(&user.id).await?;
    Ok(ApiResponse::ok(CountResponse { count }))
}

async fn unread_count(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<CountResponse>> {
    let count = state.notification_service.count_unread(&user.id).await?;
    Ok(ApiResponse::ok(CountResponse { count }))
}

/// Create the notifications router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/list", post(list_notifications))
        .route("/mark-read", post(mark_read))
        .route("/mark-all-read", post(mark_all_read))
        .route("/unread-count", post(unread_count))
}
