//! Participant (nominee) endpoints.

use axum::{Json, Router, extract::State, routing::post};
use pollnow_common::AppResult;
use pollnow_core::{CreateParticipantInput, UpdateParticipantInput};
use pollnow_db::entities::participant;
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{ApiResponse, OkResponse, ok},
};

use super::events::EventIdRequest;

/// Participant response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantResponse {
    pub id: String,
    pub event_id: String,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub position: i32,
    pub created_at: String,
}

impl From<participant::Model> for ParticipantResponse {
    fn from(p: participant::Model) -> Self {
        Self {
            id: p.id,
            event_id: p.event_id,
            name: p.name,
            description: p.description,
            image_url: p.image_url,
            position: p.position,
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateParticipantRequest {
    pub event_id: String,
    #[serde(flatten)]
    pub input: CreateParticipantInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParticipantRequest {
    pub participant_id: String,
    #[serde(flatten)]
    pub input: UpdateParticipantInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantIdRequest {
    pub participant_id: String,
}

/// Full new order of an event's participants.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderParticipantsRequest {
    pub event_id: String,
    pub participant_ids: Vec<String>,
}

async fn create_participant(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateParticipantRequest>,
) -> AppResult<ApiResponse<ParticipantResponse>> {
    let participant = state
        .participant_service
        .add(&user, &req.event_id, req.input)
        .await?;
    Ok(ApiResponse::created(participant.into()))
}

async fn update_participant(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateParticipantRequest>,
) -> AppResult<ApiResponse<ParticipantResponse>> {
    let participant = state
        .participant_service
        .update(&user, &req.participant_id, req.input)
        .await?;
    Ok(ApiResponse::ok(participant.into()))
}

async fn delete_participant(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ParticipantIdRequest>,
) -> AppResult<ApiResponse<OkResponse>> {
    state
        .participant_service
        .remove(&user, &req.participant_id)
        .await?;
    Ok(ok())
}

async fn list_participants(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Json(req): Json<EventIdRequest>,
) -> AppResult<ApiResponse<Vec<ParticipantResponse>>> {
    let participants = state
        .participant_service
        .list(&req.event_id, viewer.as_ref())
        .await?;
    Ok(ApiResponse::ok(
        participants.into_iter().map(Into::into).collect(),
    ))
}

async fn reorder_participants(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ReorderParticipantsRequest>,
) -> AppResult<ApiResponse<OkResponse>> {
    state
        .participant_service
        .reorder(&user, &req.event_id, &req.participant_ids)
        .await?;
    Ok(ok())
}

/// Create the participants router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_participant))
        .route("/update", post(update_participant))
        .route("/delete", post(delete_participant))
        .route("/list", post(list_participants))
        .route("/reorder", post(reorder_participants))
}
