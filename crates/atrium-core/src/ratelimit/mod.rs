//! Fixed-window rate limiting keyed by caller.
//!
//! The limiter is advisory traffic shaping in front of the catalog. Its
//! counters live in a pluggable [`RateLimitStore`]: process memory for a
//! single instance, or a table in the shared SQLite database when several
//! instances must agree on one budget.

mod store;

pub use store::{InMemoryRateLimitStore, SqliteRateLimitStore};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage::StorageResult;

/// Counter state of one key after a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    /// Epoch milliseconds at which the current window opened.
    pub window_start_ms: i64,
    /// Hits recorded in the current window, including this one.
    pub count: u32,
}

/// Storage for per-key window counters.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Records one hit for `key` at `now_ms`, opening a new window when more
    /// than `window` has elapsed since the current one opened.
    async fn hit(&self, key: &str, window: Duration, now_ms: i64) -> StorageResult<WindowState>;
}

/// Which counter store backs the limiter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitBackend {
    #[default]
    Memory,
    Sqlite,
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the current window closes.
    pub retry_after: Duration,
}

/// Fixed-window limiter: at most `max_requests` per `window` per key.
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    max_requests: u32,
    window: Duration,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("store", &"<RateLimitStore>")
            .field("max_requests", &self.max_requests)
            .field("window", &self.window)
            .finish()
    }
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, max_requests: u32, window: Duration) -> Self {
        Self { store, max_requests, window }
    }

    /// In-memory limiter with the given budget.
    pub fn in_memory(max_requests: u32, window: Duration) -> Self {
        Self::new(Arc::new(InMemoryRateLimitStore::new()), max_requests, window)
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Checks `key` against the budget at the current wall-clock time.
    pub async fn check(&self, key: &str) -> Decision {
        self.check_at(key, chrono::Utc::now().timestamp_millis()).await
    }

    /// Checks `key` at `now_ms`. A failing store lets the request through.
    pub async fn check_at(&self, key: &str, now_ms: i64) -> Decision {
        let state = match self.store.hit(key, self.window, now_ms).await {
            Ok(state) => state,
            Err(e) => {
                warn!(key = %key, error = %e, "Rate limit store failed; allowing request");
                return Decision {
                    allowed: true,
                    limit: self.max_requests,
                    remaining: self.max_requests,
                    retry_after: Duration::ZERO,
                };
            }
        };

        let window_ms = i64::try_from(self.window.as_millis()).unwrap_or(i64::MAX);
        let closes_at = state.window_start_ms.saturating_add(window_ms);
        let retry_after = Duration::from_millis(closes_at.saturating_sub(now_ms).max(0) as u64);
        let allowed = state.count <= self.max_requests;
        if !allowed {
            debug!(key = %key, count = state.count, limit = self.max_requests, "Rate limit exceeded");
        }
        Decision {
            allowed,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(state.count),
            retry_after,
        }
    }
}
