//! Poll and voting endpoints.

use std::collections::HashMap;

use axum::{Json, Router, extract::State, routing::post};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use pollnow_common::{AppError, AppResult, IdGenerator};
use pollnow_core::{CreatePollInput, PollWithOptions, UpdatePollInput, Voter};
use pollnow_db::entities::user;
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{ApiResponse, OkResponse, ok, rfc3339},
};

use super::events::EventIdRequest;

/// Poll option response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOptionResponse {
    pub id: String,
    pub participant_id: String,
    pub position: i32,
}

/// Poll response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub id: String,
    pub event_id: String,
    pub title: String,
    pub description: Option<String>,
    pub max_choices: i32,
    pub position: i32,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub options: Vec<PollOptionResponse>,
}

impl From<PollWithOptions> for PollResponse {
    fn from(PollWithOptions { poll, options }: PollWithOptions) -> Self {
        Self {
            created_at: poll.created_at.to_rfc3339(),
            updated_at: rfc3339(poll.updated_at.as_ref()),
            id: poll.id,
            event_id: poll.event_id,
            title: poll.title,
            description: poll.description,
            max_choices: poll.max_choices,
            position: poll.position,
            options: options
                .into_iter()
                .map(|o| PollOptionResponse {
                    id: o.id,
                    participant_id: o.participant_id,
                    position: o.position,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    pub event_id: String,
    #[serde(flatten)]
    pub input: CreatePollInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePollRequest {
    pub poll_id: String,
    #[serde(flatten)]
    pub input: UpdatePollInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollIdRequest {
    pub poll_id: String,
}

/// Full new order of an event's polls.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderPollsRequest {
    pub event_id: String,
    pub poll_ids: Vec<String>,
}

/// Ballot request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub poll_id: String,
    pub option_ids: Vec<String>,
}

/// Accepted ballot.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub id: String,
    pub poll_id: String,
    pub option_ids: Vec<String>,
    pub created_at: String,
}

/// The caller's ballots in an event, keyed by poll ID.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStatusResponse {
    pub votes: HashMap<String, Vec<String>>,
}

/// Identify the caller as a voter.
///
/// Signed-in users vote as themselves. Anonymous visitors are tracked by a
/// long-lived cookie, issued on their first ballot when `issue` is set.
fn resolve_voter(
    user: Option<&user::Model>,
    jar: CookieJar,
    cookie_name: &str,
    issue: bool,
) -> (Option<Voter>, CookieJar) {
    if let Some(user) = user {
        return (Some(Voter::User(user.id.clone())), jar);
    }

    if let Some(cookie) = jar.get(cookie_name) {
        let value = cookie.value().to_string();
        return (Some(Voter::Anonymous(value)), jar);
    }

    if !issue {
        return (None, jar);
    }

    let token = IdGenerator::new().generate_token();
    let cookie = Cookie::build((cookie_name.to_string(), token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .permanent();

    (Some(Voter::Anonymous(token)), jar.add(cookie))
}

async fn create_poll(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreatePollRequest>,
) -> AppResult<ApiResponse<PollResponse>> {
    let poll = state
        .poll_service
        .create(&user, &req.event_id, req.input)
        .await?;
    Ok(ApiResponse::created(poll.into()))
}

async fn update_poll(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdatePollRequest>,
) -> AppResult<ApiResponse<PollResponse>> {
    let poll = state
        .poll_service
        .update(&user, &req.poll_id, req.input)
        .await?;
    Ok(ApiResponse::ok(poll.into()))
}

async fn delete_poll(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<PollIdRequest>,
) -> AppResult<ApiResponse<OkResponse>> {
    state.poll_service.delete(&user, &req.poll_id).await?;
    Ok(ok())
}

async fn list_polls(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Json(req): Json<EventIdRequest>,
) -> AppResult<ApiResponse<Vec<PollResponse>>> {
    let polls = state
        .poll_service
        .list(&req.event_id, viewer.as_ref())
        .await?;
    Ok(ApiResponse::ok(polls.into_iter().map(Into::into).collect()))
}

async fn reorder_polls(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ReorderPollsRequest>,
) -> AppResult<ApiResponse<OkResponse>> {
    state
        .poll_service
        .reorder(&user, &req.event_id, &req.poll_ids)
        .await?;
    Ok(ok())
}

/// Cast a ballot.
async fn vote(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<VoteRequest>,
) -> AppResult<(CookieJar, ApiResponse<VoteResponse>)> {
    let (voter, jar) = resolve_voter(viewer.as_ref(), jar, &state.voter_cookie, true);
    let voter = voter.ok_or(AppError::Unauthorized)?;

    let ballot = state
        .vote_service
        .cast(&req.poll_id, &voter, req.option_ids, Utc::now())
        .await?;

    let option_ids = serde_json::from_value(ballot.option_ids).unwrap_or_default();

    Ok((
        jar,
        ApiResponse::created(VoteResponse {
            id: ballot.id,
            poll_id: ballot.poll_id,
            option_ids,
            created_at: ballot.created_at.to_rfc3339(),
        }),
    ))
}

/// Which polls of an event the caller already voted in.
async fn vote_status(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<EventIdRequest>,
) -> AppResult<ApiResponse<VoteStatusResponse>> {
    let (voter, _) = resolve_voter(viewer.as_ref(), jar, &state.voter_cookie, false);

    let votes = match voter {
        Some(voter) => {
            state
                .vote_service
                .ballots_in_event(&req.event_id, &voter)
                .await?
        }
        None => HashMap::new(),
    };

    Ok(ApiResponse::ok(VoteStatusResponse { votes }))
}

/// Create the polls router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_poll))
        .route("/update", post(update_poll))
        .route("/delete", post(delete_poll))
        .route("/list", post(list_polls))
        .route("/reorder", post(reorder_polls))
        .route("/vote", post(vote))
        .route("/status", post(vote_status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollnow_db::entities::user::{Plan, SubscriptionStatus};

    fn user(id: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: id.to_string(),
            username_lower: id.to_string(),
            email: None,
            name: None,
            password_hash: String::new(),
            token: None,
            is_admin: false,
            is_banned: false,
            plan: Plan::Free,
            billing_customer_id: None,
            subscription_id: None,
            subscription_status: SubscriptionStatus::None,
            plan_renews_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[test]
    fn test_signed_in_user_votes_as_themself() {
        let alice = user("alice");
        let (voter, jar) = resolve_voter(Some(&alice), CookieJar::new(), "pollnow_voter", true);

        assert_eq!(voter, Some(Voter::User("alice".to_string())));
        assert!(jar.get("pollnow_voter").is_none());
    }

    #[test]
    fn test_existing_cookie_is_reused() {
        let jar = CookieJar::new().add(Cookie::new("pollnow_voter", "abc123"));
        let (voter, jar) = resolve_voter(None, jar, "pollnow_voter", true);

        assert_eq!(voter, Some(Voter::Anonymous("abc123".to_string())));
        assert_eq!(
            jar.get("pollnow_voter").map(|c| c.value().to_string()),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn test_first_ballot_issues_cookie() {
        let (voter, jar) = resolve_voter(None, CookieJar::new(), "pollnow_voter", true);

        let cookie = jar.get("pollnow_voter").map(|c| c.value().to_string());
        assert!(cookie.is_some());
        assert_eq!(voter, cookie.map(Voter::Anonymous));
    }

    #[test]
    fn test_status_lookup_does_not_issue_cookie() {
        let (voter, jar) = resolve_voter(None, CookieJar::new(), "pollnow_voter", false);

        assert_eq!(voter, None);
        assert!(jar.get("pollnow_voter").is_none());
    }
}
