//! Public plan table.

use axum::{Router, routing::post};
use pollnow_core::{PlanInfo, all_plans};

use crate::{middleware::AppState, response::ApiResponse};

async fn list_plans() -> ApiResponse<Vec<PlanInfo>> {
    ApiResponse::ok(all_plans())
}

/// Create the plans router.
pub fn router() -> Router<AppState> {
    Router::new().route("/plans", post(list_plans).get(list_plans))
}
