//! Authentication endpoints.

use axum::{Json, Router, extract::State, routing::post};
use chrono::Utc;
use pollnow_common::AppResult;
use pollnow_core::{PlanLimits, PlanTier, SigninInput, SignupInput, effective_plan};
use pollnow_db::entities::user::{self, SubscriptionStatus};
use serde::Serialize;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, OkResponse, ok, rfc3339},
};

/// User as shown to the user themself and to admins.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub is_admin: bool,
    pub is_banned: bool,
    pub plan: PlanTier,
    pub subscription_status: SubscriptionStatus,
    pub plan_renews_at: Option<String>,
    pub created_at: String,
}

impl From<user::Model> for UserResponse {
    fn from(user: user::Model) -> Self {
        Self {
            plan_renews_at: rfc3339(user.plan_renews_at.as_ref()),
            created_at: user.created_at.to_rfc3339(),
            id: user.id,
            username: user.username,
            name: user.name,
            email: user.email,
            is_admin: user.is_admin,
            is_banned: user.is_banned,
            plan: user.plan,
            subscription_status: user.subscription_status,
        }
    }
}

/// Response of signup and signin.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

impl AuthResponse {
    fn from_user(mut user: user::Model) -> Self {
        let token = user.token.take().unwrap_or_default();
        Self {
            user: user.into(),
            token,
        }
    }
}

/// Create a new account.
async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupInput>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let user = state.user_service.signup(req).await?;
    Ok(ApiResponse::created(AuthResponse::from_user(user)))
}

/// Sign in to an existing account.
async fn signin(
    State(state): State<AppState>,
    Json(req): Json<SigninInput>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let user = state.user_service.signin(req).await?;
    Ok(ApiResponse::ok(AuthResponse::from_user(user)))
}

/// Sign out by rotating the token.
async fn signout(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<OkResponse>> {
    state.user_service.signout(&user.id).await?;
    Ok(ok())
}

/// The signed-in user with the limits that currently apply.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub effective_plan: PlanTier,
    pub limits: PlanLimits,
}

async fn me(AuthUser(user): AuthUser) -> AppResult<ApiResponse<MeResponse>> {
    let effective = effective_plan(&user, Utc::now());
    Ok(ApiResponse::ok(MeResponse {
        user: user.into(),
        effective_plan: effective,
        limits: PlanLimits::for_tier(effective),
    }))
}

/// Regenerate token response.
#[derive(Serialize)]
pub struct RegenerateTokenResponse {
    pub token: String,
}

async fn regenerate_token(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<RegenerateTokenResponse>> {
    let token = state.user_service.regenerate_token(&user.id).await?;
    Ok(ApiResponse::ok(RegenerateTokenResponse { token }))
}

/// Create the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/signout", post(signout))
        .route("/i", post(me))
        .route("/i/regenerate-token", post(regenerate_token))
}
