//! API endpoints.

mod admin;
mod auth;
mod billing;
mod events;
mod notifications;
mod participants;
mod plans;
mod polls;
mod reports;
mod support;

use axum::Router;

use crate::middleware::AppState;

pub use billing::SIGNATURE_HEADER;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(plans::router())
        .nest("/events", events::router())
        .nest("/participants", participants::router())
        .nest("/polls", polls::router())
        .nest("/reports", reports::router())
        .nest("/notifications", notifications::router())
        .nest("/support", support::router())
        .nest("/admin", admin::router())
        .nest("/billing", billing::router())
}
