//! API response types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Standard API response wrapper: `{"data": ...}`.
///
/// Failures are rendered by [`pollnow_common::AppError`] as
/// `{"error": {"code", "message"}}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    /// A 200 response.
    pub const fn ok(data: T) -> Self {
        Self {
            data,
            status: StatusCode::OK,
        }
    }

    /// A 201 response for newly created records.
    pub const fn created(data: T) -> Self {
        Self {
            data,
            status: StatusCode::CREATED,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Body of endpoints that only acknowledge.
#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// Acknowledge a successful write.
#[must_use]
pub const fn ok() -> ApiResponse<OkResponse> {
    ApiResponse::ok(OkResponse { ok: true })
}

/// Offset paging used by list endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

const fn default_limit() -> u64 {
    20
}

/// Format an optional timestamp for responses.
pub(crate) fn rfc3339(
    value: Option<&chrono::DateTime<chrono::FixedOffset>>,
) -> Option<String> {
    value.map(|t| t.to_rfc3339())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_created_sets_status() {
        let response = ApiResponse::created(OkResponse { ok: true }).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[test]
    fn test_page_defaults() {
        let page: PageRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(page.limit, 20);
        assert_eq!(page.offset, 0);
    }
}
