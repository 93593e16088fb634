use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use orkut_types::ErrorResponse;

/// Fixed-window in-memory rate limiter keyed by bearer token
#[derive(Clone)]
pub struct RateLimiter {
    // token -> (request_count, window_start)
    state: Arc<Mutex<HashMap<String, (u32, Instant)>>>,
    max_requests: u32,
    window_duration: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_seconds: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window_duration: Duration::from_secs(window_seconds),
        }
    }

    /// Count a request against `token`; Err carries the message for the client
    pub fn check_rate_limit(&self, token: &str) -> Result<(), String> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Instant::now();

        // drop stale windows once the map grows large
        if state.len() > 10000 {
            state.retain(|_, (_, start)| now.duration_since(*start) < self.window_duration * 2);
        }

        match state.get_mut(token) {
            Some((count, window_start)) => {
                if now.duration_since(*window_start) < self.window_duration {
                    if *count >= self.max_requests {
                        let remaining = self.window_duration - now.duration_since(*window_start);
                        return Err(format!(
                            "Rate limit exceeded. Try again in {} seconds.",
                            remaining.as_secs()
                        ));
                    }
                    *count += 1;
                } else {
                    *window_start = now;
                    *count = 1;
                }
            }
            None => {
                state.insert(token.to_string(), (1, now));
            }
        }

        Ok(())
    }
}

/// Middleware applying the limiter to authenticated requests
pub async fn rate_limit_middleware(
    axum::Extension(limiter): axum::Extension<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if let Some(token) = token {
        if let Err(msg) = limiter.check_rate_limit(token) {
            tracing::warn!("Rate limit exceeded");
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(ErrorResponse {
                    error: "Too Many Requests".to_string(),
                    message: Some(msg),
                }),
            )
                .into_response();
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = RateLimiter::new(3, 60);
        for _ in 0..3 {
            assert!(limiter.check_rate_limit("token-a").is_ok());
        }
        let err = limiter.check_rate_limit("token-a").unwrap_err();
        assert!(err.contains("Rate limit exceeded"));
    }

    #[test]
    fn test_tokens_are_independent() {
        let limiter = RateLimiter::new(1, 60);
        assert!(limiter.check_rate_limit("token-a").is_ok());
        assert!(limiter.check_rate_limit("token-a").is_err());
        assert!(limiter.check_rate_limit("token-b").is_ok());
    }

    #[test]
    fn test_window_resets() {
        let limiter = RateLimiter::new(1, 0);
        assert!(limiter.check_rate_limit("token-a").is_ok());
        // zero-length window: every request opens a new one
        assert!(limiter.check_rate_limit("token-a").is_ok());
    }

    #[test]
    fn test_clones_share_state() {
        let limiter = RateLimiter::new(1, 60);
        let clone = limiter.clone();
        assert!(limiter.check_rate_limit("token-a").is_ok());
        assert!(clone.check_rate_limit("token-a").is_err());
    }
}
