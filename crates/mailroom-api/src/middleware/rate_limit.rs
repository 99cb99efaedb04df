//! Sliding-window rate limiting per client IP.
//!
//! Two buckets: `login` covers the login path, `api` everything else
//! non-exempt. Counters are in-memory and per-process; a restart empties
//! the window. Excess requests get 429 with `Retry-After: 60`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::sync::Mutex;

use mailroom_core::error::AppError;

use crate::middleware::auth::client_ip;
use crate::state::AppState;

/// Window length.
const WINDOW: Duration = Duration::from_secs(60);
/// How often stale entries are dropped.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Exact paths exempt from rate limiting.
const EXEMPT_ROUTES: &[&str] = &["/health", "/docs", "/redoc", "/openapi.json"];

/// Path prefixes exempt from rate limiting.
const EXEMPT_PREFIXES: &[&str] = &["/static/", "/uploads/"];

/// The login path, which gets its own (tighter) bucket.
const LOGIN_PATH: &str = "/auth/login";

/// Rate-limit bucket identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Login,
    Api,
}

struct Windows {
    requests: HashMap<(String, Bucket), Vec<Instant>>,
    last_cleanup: Instant,
}

/// In-memory sliding-window limiter keyed by (client IP, bucket).
pub struct RateLimiter {
    windows: Mutex<Windows>,
    login_limit: u32,
    api_limit: u32,
}

impl RateLimiter {
    /// Creates a limiter with per-minute limits for each bucket.
    pub fn new(login_limit: u32, api_limit: u32) -> Self {
        Self {
            windows: Mutex::new(Windows {
                requests: HashMap::new(),
                last_cleanup: Instant::now(),
            }),
            login_limit,
            api_limit,
        }
    }

    /// Record a request and report whether it is within the limit.
    /// Exactly `limit` requests fit in a window; the next one is shed.
    pub async fn check(&self, ip: &str, bucket: Bucket) -> bool {
        let limit = match bucket {
            Bucket::Login => self.login_limit,
            Bucket::Api => self.api_limit,
        };
        let now = Instant::now();
        let mut windows = self.windows.lock().await;

        if now.duration_since(windows.last_cleanup) > CLEANUP_INTERVAL {
            windows
                .requests
                .retain(|_, hits| hits.iter().any(|t| now.duration_since(*t) < WINDOW));
            windows.last_cleanup = now;
        }

        let hits = windows
            .requests
            .entry((ip.to_string(), bucket))
            .or_default();
        hits.retain(|t| now.duration_since(*t) < WINDOW);

        if hits.len() >= limit as usize {
            return false;
        }
        hits.push(now);
        true
    }
}

pub async fn rate_limiting(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if is_exempt(path) {
        return next.run(request).await;
    }

    let bucket = if path == LOGIN_PATH {
        Bucket::Login
    } else {
        Bucket::Api
    };
    let ip = client_ip(&request).unwrap_or_else(|| "unknown".to_string());

    if !state.rate_limiter.check(&ip, bucket).await {
        let limit = match bucket {
            Bucket::Login => state.config.rate_limit_login,
            Bucket::Api => state.config.rate_limit_api,
        };
        return AppError::rate_limited(format!(
            "Rate limit exceeded. Maximum {limit} requests per minute allowed."
        ))
        .into_response();
    }

    next.run(request).await
}

fn is_exempt(path: &str) -> bool {
    EXEMPT_ROUTES.contains(&path) || EXEMPT_PREFIXES.iter().any(|p| path.starts_with(p))
}
