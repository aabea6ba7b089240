//! Bearer-token gate for the diagnostic routes.

use http::{HeaderMap, header};
use tracing::{info, warn};

use crate::server::error::ApiError;

/// Extracts the token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then(|| token.trim()).filter(|t| !t.is_empty())
}

/// Compares without short-circuiting on the first differing byte.
fn tokens_match(given: &str, expected: &str) -> bool {
    let (given, expected) = (given.as_bytes(), expected.as_bytes());
    given.len() == expected.len()
        && given.iter().zip(expected).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

/// Admits the request when it carries the configured admin token.
///
/// Without a configured token the routes do not exist (404). A missing or
/// wrong token is rejected with 401.
pub fn authorize(expected: Option<&str>, headers: &HeaderMap, route: &str) -> Result<(), ApiError> {
    let Some(expected) = expected else {
        return Err(ApiError::NotFound);
    };
    match bearer_token(headers) {
        Some(given) if tokens_match(given, expected) => {
            info!(route, "Admin diagnostics accessed");
            Ok(())
        }
        Some(_) => {
            warn!(route, "Admin request with invalid token");
            Err(ApiError::Unauthorized)
        }
        None => {
            warn!(route, "Admin request without bearer token");
            Err(ApiError::Unauthorized)
        }
    }
}
