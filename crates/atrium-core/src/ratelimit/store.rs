//! Counter stores for the rate limiter.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::params;
use tokio::sync::Mutex as AsyncMutex;

use crate::ratelimit::{RateLimitStore, WindowState};
use crate::storage::{Database, StorageError, StorageResult};

/// Number of tracked keys above which expired windows are pruned.
const PRUNE_THRESHOLD: usize = 1000;

fn window_ms(window: Duration) -> i64 {
    i64::try_from(window.as_millis()).unwrap_or(i64::MAX)
}

/// Process-local counters. Suitable for a single instance only.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    windows: AsyncMutex<HashMap<String, WindowState>>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently tracked.
    pub async fn tracked_keys(&self) -> usize {
        self.windows.lock().await.len()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn hit(&self, key: &str, window: Duration, now_ms: i64) -> StorageResult<WindowState> {
        let window_ms = window_ms(window);
        let mut windows = self.windows.lock().await;

        if windows.len() > PRUNE_THRESHOLD {
            windows.retain(|_, w| now_ms - w.window_start_ms <= window_ms);
        }

        let entry = windows
            .entry(key.to_string())
            .or_insert(WindowState { window_start_ms: now_ms, count: 0 });
        if now_ms - entry.window_start_ms > window_ms {
            *entry = WindowState { window_start_ms: now_ms, count: 0 };
        }
        entry.count = entry.count.saturating_add(1);
        Ok(*entry)
    }
}

/// Counters in the `rate_limit_windows` table, shared by every process
/// that opens the same database file.
#[derive(Debug, Clone)]
pub struct SqliteRateLimitStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteRateLimitStore {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RateLimitStore for SqliteRateLimitStore {
    async fn hit(&self, key: &str, window: Duration, now_ms: i64) -> StorageResult<WindowState> {
        let db = self
            .db
            .lock()
            .map_err(|_| StorageError::Unavailable("database lock poisoned".to_string()))?;
        // SET expressions see the row as it was before the update.
        let (window_start_ms, count): (i64, i64) = db.conn().query_row(
            "INSERT INTO rate_limit_windows (key, window_start_ms, count) VALUES (?1, ?2, 1) \
             ON CONFLICT(key) DO UPDATE SET \
             count = CASE WHEN ?2 - window_start_ms > ?3 THEN 1 ELSE count + 1 END, \
             window_start_ms = CASE WHEN ?2 - window_start_ms > ?3 THEN ?2 ELSE window_start_ms END \
             RETURNING window_start_ms, count",
            params![key, now_ms, window_ms(window)],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(WindowState { window_start_ms, count: u32::try_from(count).unwrap_or(u32::MAX) })
    }
}
