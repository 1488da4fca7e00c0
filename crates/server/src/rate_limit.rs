//! Fixed-window request limits keyed by client address, one window per
//! route class.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::warn;

use crate::app_state::AppState;

const PRUNE_ABOVE: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitClass {
    Api,
    Ai,
    Heavy,
    Auth,
}

impl LimitClass {
    pub fn window(self) -> Duration {
        match self {
            LimitClass::Api => Duration::from_secs(60),
            LimitClass::Ai => Duration::from_secs(15 * 60),
            LimitClass::Heavy => Duration::from_secs(5 * 60),
            LimitClass::Auth => Duration::from_secs(15 * 60),
        }
    }

    pub fn max_requests(self) -> u32 {
        match self {
            LimitClass::Api => 100,
            LimitClass::Ai => 20,
            LimitClass::Heavy => 10,
            LimitClass::Auth => 15,
        }
    }

    fn message(self) -> &'static str {
        match self {
            LimitClass::Api => "Too many requests, please slow down",
            LimitClass::Ai => "AI assistant is busy. Please try again in 15 minutes.",
            LimitClass::Heavy => "System is processing heavy requests. Please wait a few minutes.",
            LimitClass::Auth => "Too many login attempts. Please try again after 15 minutes.",
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            LimitClass::Api => "api",
            LimitClass::Ai => "ai",
            LimitClass::Heavy => "heavy",
            LimitClass::Auth => "auth",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_after: Duration,
}

pub struct RateLimiter {
    enabled: bool,
    windows: Mutex<HashMap<(LimitClass, String), Window>>,
}

impl RateLimiter {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Counts one request from `client` against `class`.
    pub fn check(&self, class: LimitClass, client: &str, now: Instant) -> Decision {
        let window_len = class.window();
        let limit = class.max_requests();

        let mut windows = self.windows.lock().unwrap_or_else(|p| p.into_inner());

        if windows.len() > PRUNE_ABOVE {
            windows.retain(|(c, _), w| now.duration_since(w.started) < c.window());
        }

        let window = windows
            .entry((class, client.to_string()))
            .or_insert(Window {
                started: now,
                count: 0,
            });

        if now.duration_since(window.started) >= window_len {
            window.started = now;
            window.count = 0;
        }

        let reset_after = window_len.saturating_sub(now.duration_since(window.started));

        if window.count >= limit {
            return Decision {
                allowed: false,
                limit,
                remaining: 0,
                reset_after,
            };
        }

        window.count += 1;
        Decision {
            allowed: true,
            limit,
            remaining: limit - window.count,
            reset_after,
        }
    }
}

pub async fn limit_api(State(state): State<AppState>, req: Request, next: Next) -> Response {
    enforce(&state, LimitClass::Api, req, next).await
}

pub async fn limit_ai(State(state): State<AppState>, req: Request, next: Next) -> Response {
    enforce(&state, LimitClass::Ai, req, next).await
}

pub async fn limit_heavy(State(state): State<AppState>, req: Request, next: Next) -> Response {
    enforce(&state, LimitClass::Heavy, req, next).await
}

pub async fn limit_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    enforce(&state, LimitClass::Auth, req, next).await
}

async fn enforce(state: &AppState, class: LimitClass, req: Request, next: Next) -> Response {
    if !state.limiter.enabled() {
        return next.run(req).await;
    }

    let client = client_key(&req);
    let decision = state.limiter.check(class, &client, Instant::now());

    if !decision.allowed {
        warn!(class = class.as_str(), client = %client, "rate limit exceeded");
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "message": class.message() })),
        )
            .into_response();
        apply_headers(&mut response, &decision);
        return response;
    }

    let mut response = next.run(req).await;
    apply_headers(&mut response, &decision);
    response
}

fn client_key(req: &Request) -> String {
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}

/// Limiters nest (`api` wraps `auth`, `heavy` and `ai`); the innermost
/// decision owns the headers, so existing values are left alone.
fn apply_headers(response: &mut Response, decision: &Decision) {
    let headers = response.headers_mut();
    if headers.contains_key("ratelimit-limit") {
        return;
    }
    headers.insert("ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert(
        "ratelimit-reset",
        HeaderValue::from(decision.reset_after.as_secs().max(1)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_request_past_the_limit() {
        let limiter = RateLimiter::new(true);
        let now = Instant::now();

        for i in 0..10 {
            let d = limiter.check(LimitClass::Heavy, "10.0.0.1", now);
            assert!(d.allowed, "request {i} should pass");
            assert_eq!(d.remaining, 9 - i);
        }

        let d = limiter.check(LimitClass::Heavy, "10.0.0.1", now);
        assert!(!d.allowed);
        assert_eq!(d.remaining, 0);
    }

    #[test]
    fn window_resets_after_it_elapses() {
        let limiter = RateLimiter::new(true);
        let start = Instant::now();

        for _ in 0..15 {
            assert!(limiter.check(LimitClass::Auth, "ip", start).allowed);
        }
        assert!(!limiter.check(LimitClass::Auth, "ip", start).allowed);

        let later = start + LimitClass::Auth.window();
        let d = limiter.check(LimitClass::Auth, "ip", later);
        assert!(d.allowed);
        assert_eq!(d.remaining, 14);
    }

    #[test]
    fn classes_and_clients_are_counted_separately() {
        let limiter = RateLimiter::new(true);
        let now = Instant::now();

        for _ in 0..20 {
            limiter.check(LimitClass::Ai, "a", now);
        }
        assert!(!limiter.check(LimitClass::Ai, "a", now).allowed);
        assert!(limiter.check(LimitClass::Ai, "b", now).allowed);
        assert!(limiter.check(LimitClass::Api, "a", now).allowed);
    }

    #[test]
    fn inner_limiter_headers_are_kept() {
        let mut response = StatusCode::TOO_MANY_REQUESTS.into_response();
        let inner = Decision {
            allowed: false,
            limit: 15,
            remaining: 0,
            reset_after: Duration::from_secs(900),
        };
        let outer = Decision {
            allowed: true,
            limit: 100,
            remaining: 84,
            reset_after: Duration::from_secs(59),
        };
        apply_headers(&mut response, &inner);
        apply_headers(&mut response, &outer);

        let headers = response.headers();
        assert_eq!(headers["ratelimit-limit"], "15");
        assert_eq!(headers["ratelimit-remaining"], "0");
        assert_eq!(headers["ratelimit-reset"], "900");
    }

    #[test]
    fn forwarded_for_is_used_without_connect_info() {
        let req = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(client_key(&req), "203.0.113.7");
    }
}
