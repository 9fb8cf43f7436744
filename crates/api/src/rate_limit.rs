//! API rate limiting middleware.
//!
//! Fixed-window counters kept in memory, keyed by user ID when the request
//! is authenticated and by client IP otherwise. Voting and sign-in routes
//! get tighter budgets than the rest of the API.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use pollnow_db::entities::user;
use tokio::sync::RwLock;

/// Rate limit configuration for one endpoint category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl RateLimitConfig {
    /// Create a new rate limit config.
    #[must_use]
    pub const fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window_secs,
        }
    }
}

/// Default budgets per endpoint category.
pub mod limits {
    use super::RateLimitConfig;

    /// Reads and ordinary writes.
    pub const STANDARD: RateLimitConfig = RateLimitConfig::new(300, 60);

    /// Ballot casting.
    pub const VOTE: RateLimitConfig = RateLimitConfig::new(30, 60);

    /// Sign in.
    pub const AUTH: RateLimitConfig = RateLimitConfig::new(10, 300);

    /// Sign up.
    pub const SIGNUP: RateLimitConfig = RateLimitConfig::new(5, 3600);

    /// Budget for a request path. Paths may carry a mount prefix such as `/api`.
    #[must_use]
    pub fn for_path(path: &str) -> (&'static str, RateLimitConfig) {
        if path.ends_with("/polls/vote") {
            ("vote", VOTE)
        } else if path.ends_with("/signin") {
            ("auth", AUTH)
        } else if path.ends_with("/signup") {
            ("signup", SIGNUP)
        } else {
            ("standard", STANDARD)
        }
    }
}

#[derive(Debug, Clone)]
struct WindowState {
    count: u32,
    window_start: Instant,
}

impl WindowState {
    fn new() -> Self {
        Self {
            count: 0,
            window_start: Instant::now(),
        }
    }
}

/// In-memory fixed-window rate limiter.
#[derive(Clone, Default)]
pub struct ApiRateLimiter {
    states: Arc<RwLock<HashMap<String, WindowState>>>,
}

impl ApiRateLimiter {
    /// Create a new rate limiter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a request is allowed and record it.
    pub async fn check(&self, key: &str, config: &RateLimitConfig) -> RateLimitResult {
        let mut states = self.states.write().await;
        let now = Instant::now();
        let window = Duration::from_secs(config.window_secs);

        let state = states
            .entry(key.to_string())
            .or_insert_with(WindowState::new);

        if now.duration_since(state.window_start) >= window {
            state.count = 0;
            state.window_start = now;
        }

        let reset = window
            .saturating_sub(now.duration_since(state.window_start))
            .as_secs();

        if state.count >= config.max_requests {
            return RateLimitResult::Limited {
                retry_after: reset.max(1),
                limit: config.max_requests,
            };
        }

        state.count += 1;

        RateLimitResult::Allowed {
            remaining: config.max_requests.saturating_sub(state.count),
            limit: config.max_requests,
            reset,
        }
    }

    /// Drop windows older than twice `max_window_secs`.
    pub async fn cleanup(&self, max_window_secs: u64) {
        let mut states = self.states.write().await;
        let now = Instant::now();
        let max_age = Duration::from_secs(max_window_secs * 2);

        states.retain(|_, state| now.duration_since(state.window_start) < max_age);
    }

    /// Number of tracked keys.
    pub async fn key_count(&self) -> usize {
        self.states.read().await.len()
    }
}

/// Rate limit check result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed.
    Allowed {
        /// Remaining requests in the window.
        remaining: u32,
        /// Total limit.
        limit: u32,
        /// Seconds until the window resets.
        reset: u64,
    },
    /// Request is rate limited.
    Limited {
        /// Seconds until the window resets.
        retry_after: u64,
        /// Total limit.
        limit: u32,
    },
}

/// Rate limiter state for the middleware.
#[derive(Clone, Default)]
pub struct RateLimiterState {
    /// Per-user limiter.
    pub user_limiter: ApiRateLimiter,
    /// Per-IP limiter for anonymous requests.
    pub ip_limiter: ApiRateLimiter,
}

impl RateLimiterState {
    /// Create a new rate limiter state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prune stale windows in both limiters.
    pub async fn cleanup(&self) {
        let longest = limits::SIGNUP.window_secs;
        self.user_limiter.cleanup(longest).await;
        self.ip_limiter.cleanup(longest).await;
    }
}

/// Rate limit error response.
#[derive(Debug)]
pub struct RateLimitError {
    pub retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": {
                "code": "RATE_LIMITED",
                "message": "Too many requests",
                "retryAfter": self.retry_after
            }
        });

        (
            StatusCode::TOO_MANY_REQUESTS,
            [
                ("Retry-After", self.retry_after.to_string()),
                ("Content-Type", "application/json".to_string()),
            ],
            body.to_string(),
        )
            .into_response()
    }
}

/// Client IP from proxy headers, else the peer address of the connection.
fn extract_client_ip(req: &Request<Body>) -> Option<IpAddr> {
    if let Some(xff) = req.headers().get("x-forwarded-for")
        && let Ok(xff_str) = xff.to_str()
        && let Some(first_ip) = xff_str.split(',').next()
        && let Ok(ip) = first_ip.trim().parse::<IpAddr>()
    {
        return Some(ip);
    }

    req.headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
}

/// Rate limiting middleware. Must run after the auth middleware.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiterState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, RateLimitError> {
    let (category, config) = limits::for_path(req.uri().path());

    let (key, per_user) = if let Some(user) = req.extensions().get::<user::Model>() {
        (format!("{category}:user:{}", user.id), true)
    } else if let Some(ip) = extract_client_ip(&req) {
        (format!("{category}:ip:{ip}"), false)
    } else {
        (format!("{category}:unknown"), false)
    };

    let result = if per_user {
        limiter.user_limiter.check(&key, &config).await
    } else {
        limiter.ip_limiter.check(&key, &config).await
    };

    match result {
        RateLimitResult::Allowed {
            remaining,
            limit,
            reset,
        } => {
            let mut response = next.run(req).await;

            let headers = response.headers_mut();
            headers.insert("X-RateLimit-Limit", limit.into());
            headers.insert("X-RateLimit-Remaining", remaining.into());
            headers.insert("X-RateLimit-Reset", reset.into());

            Ok(response)
        }
        RateLimitResult::Limited { retry_after, .. } => {
            tracing::debug!(key = %key, retry_after, "Rate limited");
            Err(RateLimitError { retry_after })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allows_up_to_limit() {
        let limiter = ApiRateLimiter::new();
        let config = RateLimitConfig::new(5, 60);

        for _ in 0..5 {
            assert!(matches!(
                limiter.check("voter", &config).await,
                RateLimitResult::Allowed { .. }
            ));
        }
    }

    #[tokio::test]
    async fn test_blocks_after_limit() {
        let limiter = ApiRateLimiter::new();
        let config = RateLimitConfig::new(3, 60);

        for _ in 0..3 {
            limiter.check("voter", &config).await;
        }

        match limiter.check("voter", &config).await {
            RateLimitResult::Limited { retry_after, limit } => {
                assert!(retry_after > 0);
                assert_eq!(limit, 3);
            }
            other @ RateLimitResult::Allowed { .. } => panic!("expected Limited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let limiter = ApiRateLimiter::new();
        let config = RateLimitConfig::new(2, 60);

        limiter.check("user_a", &config).await;
        limiter.check("user_a", &config).await;

        assert!(matches!(
            limiter.check("user_b", &config).await,
            RateLimitResult::Allowed { .. }
        ));
        assert_eq!(limiter.key_count().await, 2);
    }

    #[tokio::test]
    async fn test_remaining_counts_down() {
        let limiter = ApiRateLimiter::new();
        let config = RateLimitConfig::new(10, 60);

        match limiter.check("test", &config).await {
            RateLimitResult::Allowed {
                remaining,
                limit,
                reset,
            } => {
                assert_eq!(limit, 10);
                assert_eq!(remaining, 9);
                assert!(reset <= 60);
            }
            other @ RateLimitResult::Limited { .. } => panic!("expected Allowed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cleanup_keeps_fresh_windows() {
        let limiter = ApiRateLimiter::new();
        let config = RateLimitConfig::new(10, 60);

        limiter.check("a", &config).await;
        limiter.check("b", &config).await;
        limiter.cleanup(60).await;

        assert_eq!(limiter.key_count().await, 2);
    }

    #[test]
    fn test_vote_and_auth_paths_get_tighter_budgets() {
        assert_eq!(limits::for_path("/api/polls/vote"), ("vote", limits::VOTE));
        assert_eq!(limits::for_path("/signin"), ("auth", limits::AUTH));
        assert_eq!(limits::for_path("/api/signup"), ("signup", limits::SIGNUP));
        assert_eq!(
            limits::for_path("/api/events/show"),
            ("standard", limits::STANDARD)
        );
        assert!(limits::VOTE.max_requests < limits::STANDARD.max_requests);
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn test_anonymous_peers_get_separate_budgets() {
        use axum::{Router, middleware::from_fn_with_state, routing::post};
        use tower::ServiceExt;

        let app = Router::new()
            .route("/signup", post(|| async { "ok" }))
            .layer(from_fn_with_state(
                RateLimiterState::new(),
                rate_limit_middleware,
            ));

        let signup_from = |peer: &str| {
            let mut req = Request::builder()
                .uri("/signup")
                .method("POST")
                .body(Body::empty())
                .unwrap();
            req.extensions_mut()
                .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
            req
        };

        for _ in 0..limits::SIGNUP.max_requests {
            let response = app.clone().oneshot(signup_from("203.0.113.7:40000")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let blocked = app.clone().oneshot(signup_from("203.0.113.7:40001")).await.unwrap();
        assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);

        let other = app.oneshot(signup_from("198.51.100.20:40000")).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }
}
