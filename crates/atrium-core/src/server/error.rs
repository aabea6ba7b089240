//! Mapping of failures onto HTTP responses.

use std::time::Duration;

use axum::{BoxError, Json};
use axum::response::{IntoResponse, Response};
use http::{HeaderValue, StatusCode, header};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::catalog::CatalogError;

/// Error body: `{"error": <message>, "code": <CODE>}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

/// Failure of a public endpoint.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Too Many Requests")]
    RateLimited { retry_after: Duration },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not Found")]
    NotFound,

    #[error("Request timed out")]
    Timeout,

    /// A middleware failure with no more specific mapping.
    #[error("Internal server error")]
    Middleware(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Catalog(_) | Self::Timeout | Self::Middleware(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Catalog(e) => e.code(),
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NotFound => "NOT_FOUND",
            Self::Timeout | Self::Middleware(_) => "INTERNAL_ERROR",
        }
    }

    /// Message shown to callers. Internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            Self::Catalog(CatalogError::ServiceNotReady(_)) => {
                "Agent catalog is not available".to_string()
            }
            Self::Catalog(CatalogError::Internal(_)) => "Failed to load agents".to_string(),
            other => other.to_string(),
        }
    }
}

/// Whole seconds until retry, rounded up and at least one.
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Catalog(e) => error!(code = e.code(), error = %e, "Catalog request failed"),
            Self::Timeout => error!("Request exceeded the configured timeout"),
            Self::Middleware(detail) => error!(error = %detail, "Middleware failed"),
            _ => {}
        }

        let status = self.status();
        let body = ErrorBody { error: self.public_message(), code: self.code() };
        let mut response = (status, Json(body)).into_response();
        if let Self::RateLimited { retry_after } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs(retry_after)));
        }
        response
    }
}

/// Maps errors raised by fallible middleware (the request timeout) onto
/// the usual error body.
pub async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        ApiError::Timeout
    } else {
        ApiError::Middleware(err.to_string())
    }
}
