//! HTTP API layer for pollnow.
//!
//! Routes are POST endpoints taking and returning JSON, grouped by
//! resource (`/events/create`, `/polls/vote`, `/admin/events/approve`).
//! The billing webhook is the one route that reads a raw body.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod rate_limit;
pub mod response;

pub use endpoints::router;
pub use middleware::AppState;
pub use rate_limit::{ApiRateLimiter, RateLimitConfig, RateLimiterState};
