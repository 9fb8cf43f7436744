//! API middleware.

use std::sync::Arc;

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use pollnow_common::Config;
use pollnow_core::{
    BillingService, EventService, ModerationService, NotificationService, ParticipantService,
    PollService, ResultsService, SupportChatService, UserService, VoteService,
};
use pollnow_db::repositories::{
    BillingEventRepository, EventRepository, ModerationLogRepository, NotificationRepository,
    ParticipantRepository, PollRepository, ReportRepository, SupportChatRepository,
    UserRepository, VoteRepository,
};
use sea_orm::DatabaseConnection;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub event_service: EventService,
    pub participant_service: ParticipantService,
    pub poll_service: PollService,
    pub vote_service: VoteService,
    pub results_service: ResultsService,
    pub notification_service: NotificationService,
    pub moderation_service: ModerationService,
    pub support_chat_service: SupportChatService,
    pub billing_service: BillingService,
    /// Name of the anonymous voter cookie.
    pub voter_cookie: String,
}

impl AppState {
    /// Wire repositories and services over one connection pool.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, config: &Config) -> Self {
        let user_repo = UserRepository::new(Arc::clone(&db));
        let event_repo = EventRepository::new(Arc::clone(&db));
        let participant_repo = ParticipantRepository::new(Arc::clone(&db));
        let poll_repo = PollRepository::new(Arc::clone(&db));
        let vote_repo = VoteRepository::new(Arc::clone(&db));
        let report_repo = ReportRepository::new(Arc::clone(&db));
        let log_repo = ModerationLogRepository::new(Arc::clone(&db));
        let notification_repo = NotificationRepository::new(Arc::clone(&db));
        let chat_repo = SupportChatRepository::new(Arc::clone(&db));
        let billing_event_repo = BillingEventRepository::new(Arc::clone(&db));

        let notification_service = NotificationService::new(notification_repo);
        let poll_service = PollService::new(
            poll_repo.clone(),
            participant_repo.clone(),
            event_repo.clone(),
            vote_repo.clone(),
        );

        Self {
            user_service: UserService::new(user_repo.clone()),
            event_service: EventService::new(event_repo.clone(), poll_repo.clone()),
            participant_service: ParticipantService::new(
                participant_repo.clone(),
                event_repo.clone(),
                poll_repo.clone(),
                vote_repo.clone(),
            ),
            vote_service: VoteService::new(
                vote_repo.clone(),
                poll_repo,
                event_repo.clone(),
                config.voting.fingerprint_salt.clone(),
            ),
            results_service: ResultsService::new(
                event_repo.clone(),
                participant_repo,
                vote_repo,
                poll_service.clone(),
            ),
            poll_service,
            moderation_service: ModerationService::new(
                event_repo,
                report_repo,
                log_repo.clone(),
                user_repo.clone(),
                chat_repo.clone(),
                notification_service.clone(),
            ),
            support_chat_service: SupportChatService::new(
                chat_repo,
                log_repo,
                notification_service.clone(),
            ),
            billing_service: BillingService::new(
                user_repo,
                billing_event_repo,
                notification_service.clone(),
                &config.billing,
            ),
            notification_service,
            voter_cookie: config.voting.cookie_name.clone(),
        }
    }
}

/// Authentication middleware.
///
/// Resolves `Authorization: Bearer <token>` into the request's user. Requests
/// without a valid token continue anonymously; handlers decide whether that
/// is acceptable.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        match state.user_service.authenticate_by_token(token.trim()).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => tracing::debug!(error = %e, "Bearer token rejected"),
        }
    }

    next.run(req).await
}
