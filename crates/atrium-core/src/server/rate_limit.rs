//! Rate limit middleware.

use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::{HeaderMap, HeaderValue};
use tracing::warn;

use crate::server::AppState;
use crate::server::error::ApiError;

const FORWARDED_FOR: &str = "x-forwarded-for";
const LIMIT_HEADER: &str = "x-ratelimit-limit";
const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Key identifying a caller: the first `X-Forwarded-For` entry when that
/// header is trusted, else the peer IP, else `"unknown"`.
pub fn caller_key(headers: &HeaderMap, peer: Option<IpAddr>, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = headers
            .get(FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(first) = forwarded {
            return first.to_string();
        }
    }
    peer.map_or_else(|| "unknown".to_string(), |ip| ip.to_string())
}

/// Rejects callers over budget with 429 and tags allowed responses with
/// the remaining budget.
pub async fn enforce(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(limiter) = state.rate_limiter() else {
        return next.run(request).await;
    };

    let peer = request.extensions().get::<ConnectInfo<SocketAddr>>().map(|c| c.0.ip());
    let key = caller_key(request.headers(), peer, state.trust_forwarded_for());
    let decision = limiter.check(&key).await;

    if !decision.allowed {
        warn!(
            caller = %key,
            limit = decision.limit,
            retry_after_secs = decision.retry_after.as_secs(),
            "Rate limit hit"
        );
        return ApiError::RateLimited { retry_after: decision.retry_after }.into_response();
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(LIMIT_HEADER, HeaderValue::from(decision.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forwarded(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_caller_key_uses_first_forwarded_entry_when_trusted() {
        let peer = Some("10.0.0.1".parse().unwrap());
        let headers = forwarded("203.0.113.7, 10.0.0.1");
        assert_eq!(caller_key(&headers, peer, true), "203.0.113.7");
    }

    #[test]
    fn test_caller_key_ignores_forwarded_when_untrusted() {
        let peer = Some("10.0.0.1".parse().unwrap());
        let headers = forwarded("203.0.113.7");
        assert_eq!(caller_key(&headers, peer, false), "10.0.0.1");
    }

    #[test]
    fn test_caller_key_falls_back() {
        assert_eq!(caller_key(&forwarded(" , "), None, true), "unknown");
        assert_eq!(caller_key(&HeaderMap::new(), None, false), "unknown");
    }
}
