//! Event report endpoints.

use axum::{Json, Router, extract::State, routing::post};
use pollnow_common::AppResult;
use pollnow_db::entities::report::{self, ReportStatus};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::MaybeAuthUser,
    middleware::AppState,
    response::{ApiResponse, rfc3339},
};

/// Report response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub id: String,
    pub event_id: String,
    pub reporter_id: Option<String>,
    pub reason: String,
    pub status: ReportStatus,
    pub resolved_by: Option<String>,
    pub resolution_note: Option<String>,
    pub created_at: String,
    pub resolved_at: Option<String>,
}

impl From<report::Model> for ReportResponse {
    fn from(report: report::Model) -> Self {
        Self {
            created_at: report.created_at.to_rfc3339(),
            resolved_at: rfc3339(report.resolved_at.as_ref()),
            id: report.id,
            event_id: report.event_id,
            reporter_id: report.reporter_id,
            reason: report.reason,
            status: report.status,
            resolved_by: report.resolved_by,
            resolution_note: report.resolution_note,
        }
    }
}

/// Create report request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    pub event_id: String,
    pub reason: String,
}

/// Report an approved event. Visitors may report without signing in.
async fn create_report(
    MaybeAuthUser(reporter): MaybeAuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateReportRequest>,
) -> AppResult<ApiResponse<ReportResponse>> {
    let report = state
        .moderation_service
        .create_report(reporter.as_ref(), &req.event_id, &req.reason)
        .await?;
    Ok(ApiResponse::created(report.into()))
}

/// Create the reports router.
pub fn router() -> Router<AppState> {
    Router::new().route("/create", post(create_report))
}
