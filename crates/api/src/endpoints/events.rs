//! Event endpoints.

use axum::{Json, Router, extract::State, routing::post};
use chrono::Utc;
use pollnow_common::AppResult;
use pollnow_core::{CreateEventInput, EventResults, GalaGate, UpdateEventInput};
use pollnow_db::entities::event::{self, EventStatus};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{ApiResponse, OkResponse, PageRequest, ok, rfc3339},
};

/// Event response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: EventStatus,
    pub gala_date: Option<String>,
    pub is_public: bool,
    pub moderation_note: Option<String>,
    pub submitted_at: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<event::Model> for EventResponse {
    fn from(event: event::Model) -> Self {
        Self {
            gala_date: rfc3339(event.gala_date.as_ref()),
            submitted_at: rfc3339(event.submitted_at.as_ref()),
            created_at: event.created_at.to_rfc3339(),
            updated_at: rfc3339(event.updated_at.as_ref()),
            id: event.id,
            user_id: event.user_id,
            name: event.name,
            description: event.description,
            status: event.status,
            is_public: event.is_public,
            moderation_note: event.moderation_note,
        }
    }
}

/// Event with the current state of its gala gate.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetailResponse {
    #[serde(flatten)]
    pub event: EventResponse,
    pub gate: GalaGate,
}

/// Request naming one event.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventIdRequest {
    pub event_id: String,
}

/// Update event request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub event_id: String,
    #[serde(flatten)]
    pub input: UpdateEventInput,
}

async fn create_event(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateEventInput>,
) -> AppResult<ApiResponse<EventResponse>> {
    let event = state.event_service.create(&user, req).await?;
    Ok(ApiResponse::created(event.into()))
}

async fn show_event(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Json(req): Json<EventIdRequest>,
) -> AppResult<ApiResponse<EventDetailResponse>> {
    let event = state
        .event_service
        .get_visible(&req.event_id, viewer.as_ref())
        .await?;
    let gate = GalaGate::evaluate(event.gala_date, Utc::now());

    Ok(ApiResponse::ok(EventDetailResponse {
        event: event.into(),
        gate,
    }))
}

/// Public directory of approved events.
async fn list_events(
    State(state): State<AppState>,
    Json(req): Json<PageRequest>,
) -> AppResult<ApiResponse<Vec<EventResponse>>> {
    let events = state
        .event_service
        .list_public(req.limit, req.offset)
        .await?;
    Ok(ApiResponse::ok(events.into_iter().map(Into::into).collect()))
}

async fn my_events(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<EventResponse>>> {
    let events = state.event_service.list_mine(&user).await?;
    Ok(ApiResponse::ok(events.into_iter().map(Into::into).collect()))
}

async fn update_event(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateEventRequest>,
) -> AppResult<ApiResponse<EventResponse>> {
    let event = state
        .event_service
        .update(&req.event_id, &user, req.input)
        .await?;
    Ok(ApiResponse::ok(event.into()))
}

async fn delete_event(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<EventIdRequest>,
) -> AppResult<ApiResponse<OkResponse>> {
    state.event_service.delete(&req.event_id, &user).await?;
    Ok(ok())
}

/// Submit a draft or denied event for review.
async fn submit_event(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<EventIdRequest>,
) -> AppResult<ApiResponse<EventResponse>> {
    let event = state.event_service.submit(&req.event_id, &user).await?;
    Ok(ApiResponse::ok(event.into()))
}

/// Tallied results, withheld until the gala date except for the owner and admins.
async fn event_results(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Json(req): Json<EventIdRequest>,
) -> AppResult<ApiResponse<EventResults>> {
    let results = state
        .results_service
        .event_results(&req.event_id, viewer.as_ref(), Utc::now())
        .await?;
    Ok(ApiResponse::ok(results))
}

/// Create the events router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_event))
        .route("/show", post(show_event))
        .route("/list", post(list_events))
        .route("/mine", post(my_events))
        .route("/update", post(update_event))
        .route("/delete", post(delete_event))
        .route("/submit", post(submit_event))
        .route("/results", post(event_results))
}
