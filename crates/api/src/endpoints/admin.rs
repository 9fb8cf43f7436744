//! Admin and moderation endpoints.
//!
//! Every route requires an admin token. Each state change is recorded in the
//! moderation log by the service layer.

use axum::{Json, Router, extract::State, routing::post};
use pollnow_common::{AppError, AppResult};
use pollnow_core::{ModerationStats, parse_tier};
use pollnow_db::entities::{
    moderation_log::{self, ModerationAction, TargetType},
    report::ReportStatus,
    support_chat::ChatStatus,
};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::AdminUser,
    middleware::AppState,
    response::{ApiResponse, PageRequest},
};

use super::{
    auth::UserResponse,
    events::{EventIdRequest, EventResponse},
    reports::ReportResponse,
    support::{ChatMessageRequest, ChatResponse, MessageResponse},
};

/// Moderation log entry response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationLogResponse {
    pub id: String,
    pub moderator_id: String,
    pub action: ModerationAction,
    pub target_type: TargetType,
    pub target_id: String,
    pub reason: Option<String>,
    pub created_at: String,
}

impl From<moderation_log::Model> for ModerationLogResponse {
    fn from(log: moderation_log::Model) -> Self {
        Self {
            id: log.id,
            moderator_id: log.moderator_id,
            action: log.action,
            target_type: log.target_type,
            target_id: log.target_id,
            reason: log.reason,
            created_at: log.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DenyEventRequest {
    pub event_id: String,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReportsRequest {
    pub status: Option<ReportStatus>,
    #[serde(flatten)]
    pub page: PageRequest,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveReportRequest {
    pub report_id: String,
    /// `resolved` or `dismissed`
    pub status: ReportStatus,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActionRequest {
    pub user_id: String,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPlanRequest {
    pub user_id: String,
    pub plan: String,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListLogsRequest {
    #[serde(default = "default_log_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
}

const fn default_log_limit() -> u64 {
    50
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListChatsRequest {
    pub status: Option<ChatStatus>,
    #[serde(flatten)]
    pub page: PageRequest,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatIdRequest {
    pub chat_id: String,
}

// ========== Dashboard ==========

async fn stats(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<ModerationStats>> {
    let stats = state.moderation_service.stats().await?;
    Ok(ApiResponse::ok(stats))
}

// ========== Events ==========

async fn pending_events(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<PageRequest>,
) -> AppResult<ApiResponse<Vec<EventResponse>>> {
    let events = state
        .moderation_service
        .list_pending_events(req.limit, req.offset)
        .await?;
    Ok(ApiResponse::ok(events.into_iter().map(Into::into).collect()))
}

async fn approve_event(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<EventIdRequest>,
) -> AppResult<ApiResponse<EventResponse>> {
    let event = state
        .moderation_service
        .approve_event(&admin, &req.event_id)
        .await?;
    Ok(ApiResponse::ok(event.into()))
}

async fn deny_event(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<DenyEventRequest>,
) -> AppResult<ApiResponse<EventResponse>> {
    let event = state
        .moderation_service
        .deny_event(&admin, &req.event_id, &req.reason)
        .await?;
    Ok(ApiResponse::ok(event.into()))
}

// ========== Reports ==========

async fn list_reports(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<ListReportsRequest>,
) -> AppResult<ApiResponse<Vec<ReportResponse>>> {
    let reports = state
        .moderation_service
        .list_reports(req.status, req.page.limit, req.page.offset)
        .await?;
    Ok(ApiResponse::ok(reports.into_iter().map(Into::into).collect()))
}

async fn resolve_report(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<ResolveReportRequest>,
) -> AppResult<ApiResponse<ReportResponse>> {
    let report = state
        .moderation_service
        .resolve_report(&admin, &req.report_id, req.status, req.note)
        .await?;
    Ok(ApiResponse::ok(report.into()))
}

// ========== Users ==========

async fn list_users(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<PageRequest>,
) -> AppResult<ApiResponse<Vec<UserResponse>>> {
    let users = state
        .moderation_service
        .list_users(req.limit, req.offset)
        .await?;
    Ok(ApiResponse::ok(users.into_iter().map(Into::into).collect()))
}

async fn ban_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<UserActionRequest>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state
        .moderation_service
        .ban_user(&admin, &req.user_id, req.reason)
        .await?;
    Ok(ApiResponse::ok(user.into()))
}

async fn unban_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<UserActionRequest>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state
        .moderation_service
        .unban_user(&admin, &req.user_id)
        .await?;
    Ok(ApiResponse::ok(user.into()))
}

async fn set_plan(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<SetPlanRequest>,
) -> AppResult<ApiResponse<UserResponse>> {
    let tier = parse_tier(&req.plan)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown plan: {}", req.plan)))?;
    let user = state
        .moderation_service
        .set_plan(&admin, &req.user_id, tier, req.reason)
        .await?;
    Ok(ApiResponse::ok(user.into()))
}

// ========== Log ==========

async fn list_logs(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<ListLogsRequest>,
) -> AppResult<ApiResponse<Vec<ModerationLogResponse>>> {
    let logs = state
        .moderation_service
        .list_logs(req.limit, req.until_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(logs.into_iter().map(Into::into).collect()))
}

// ========== Support inbox ==========

async fn list_chats(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<ListChatsRequest>,
) -> AppResult<ApiResponse<Vec<ChatResponse>>> {
    let chats = state
        .support_chat_service
        .list(&admin, req.status, req.page.limit, req.page.offset)
        .await?;
    Ok(ApiResponse::ok(chats.into_iter().map(Into::into).collect()))
}

async fn reply_chat(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<ChatMessageRequest>,
) -> AppResult<ApiResponse<MessageResponse>> {
    let message = state
        .support_chat_service
        .reply(&admin, &req.chat_id, &req.body)
        .await?;
    Ok(ApiResponse::created(message.into()))
}

async fn close_chat(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<ChatIdRequest>,
) -> AppResult<ApiResponse<ChatResponse>> {
    let chat = state
        .support_chat_service
        .close(&admin, &req.chat_id)
        .await?;
    Ok(ApiResponse::ok(chat.into()))
}

/// Create the admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", post(stats))
        // Events
        .route("/events/pending", post(pending_events))
        .route("/events/approve", post(approve_event))
        .route("/events/deny", post(deny_event))
        // Reports
        .route("/reports", post(list_reports))
        .route("/reports/resolve", post(resolve_report))
        // Users
        .route("/users", post(list_users))
        .route("/users/ban", post(ban_user))
        .route("/users/unban", post(unban_user))
        .route("/users/set-plan", post(set_plan))
        // Log
        .route("/logs", post(list_logs))
        // Support inbox
        .route("/support/list", post(list_chats))
        .route("/support/reply", post(reply_chat))
        .route("/support/close", post(close_chat))
}
