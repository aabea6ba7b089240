//! Route handlers for the public catalog.

use axum::Json;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use http::{HeaderMap, HeaderValue, header};
use serde_json::json;

use crate::catalog::ListAgentsParams;
use crate::server::AppState;
use crate::server::admin;
use crate::server::error::ApiError;

/// Query string of `GET /agents`. Every field is taken as text and
/// interpreted leniently so malformed values fall back to defaults.
#[derive(Debug, Default)]
pub struct ListAgentsQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ListAgentsQuery {
    /// Builds the query from raw key/value pairs. The first occurrence of a
    /// repeated key wins and unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "q" => &mut query.q,
                "category" => &mut query.category,
                "limit" => &mut query.limit,
                "offset" => &mut query.offset,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        query
    }
}

/// Reads the leading integer of `raw`, ignoring surrounding whitespace and
/// anything after the digits (`"20abc"` is 20, `"abc"` is nothing).
fn leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(sign * magnitude)
}

impl From<ListAgentsQuery> for ListAgentsParams {
    fn from(query: ListAgentsQuery) -> Self {
        Self {
            query: query.q,
            category: query.category,
            limit: query.limit.as_deref().and_then(leading_int),
            offset: query.offset.as_deref().and_then(leading_int),
        }
    }
}

fn cached(value: &HeaderValue, body: impl IntoResponse) -> Response {
    ([(header::CACHE_CONTROL, value.clone())], body).into_response()
}

fn uncached(body: impl IntoResponse) -> Response {
    ([(header::CACHE_CONTROL, HeaderValue::from_static("no-store"))], body).into_response()
}

/// `GET /agents`
pub async fn list_agents(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let catalog = state.catalog()?;
    let params = ListAgentsParams::from(ListAgentsQuery::from_pairs(pairs));
    let agents = catalog.list_agents(&params).await?;
    Ok(cached(state.agents_cache_control(), Json(agents)))
}

/// `GET /agents/categories`
pub async fn list_categories(State(state): State<AppState>) -> Result<Response, ApiError> {
    let catalog = state.catalog()?;
    let categories = catalog.list_categories().await?;
    Ok(cached(state.categories_cache_control(), Json(categories)))
}

/// `GET /ping`
pub async fn ping() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

/// `GET /agents/_debug`
pub async fn debug_info(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    admin::authorize(state.admin_token(), &headers, "_debug")?;
    let inspection = state.catalog()?.inspect().await?;
    Ok(uncached(Json(inspection)))
}

/// `GET /agents/_schema`
pub async fn schema_info(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    admin::authorize(state.admin_token(), &headers, "_schema")?;
    let probe = state.catalog()?.probe_schema().await?;
    Ok(uncached(Json(probe)))
}
