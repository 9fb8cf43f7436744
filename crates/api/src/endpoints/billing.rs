//! Billing provider webhook.

use axum::{Router, extract::State, http::HeaderMap, routing::post};
use bytes::Bytes;
use chrono::Utc;
use pollnow_common::{AppError, AppResult};
use pollnow_core::WebhookOutcome;
use serde::Serialize;

use crate::{middleware::AppState, response::ApiResponse};

/// Header carrying `t=<unix>,v1=<hex hmac>`.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Webhook acknowledgement.
#[derive(Serialize)]
pub struct WebhookResponse {
    pub received: bool,
    pub outcome: &'static str,
}

/// Receive a signed billing event.
///
/// The body is read raw: the signature covers the exact bytes sent.
async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<ApiResponse<WebhookResponse>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::InvalidSignature)?;

    state.billing_service.verify(signature, &body, Utc::now())?;

    let outcome = match state.billing_service.handle_event(&body).await? {
        WebhookOutcome::Applied => "applied",
        WebhookOutcome::Duplicate => "duplicate",
        WebhookOutcome::Ignored => "ignored",
    };

    Ok(ApiResponse::ok(WebhookResponse {
        received: true,
        outcome,
    }))
}

/// Create the billing router.
pub fn router() -> Router<AppState> {
    Router::new().route("/webhook", post(webhook))
}
