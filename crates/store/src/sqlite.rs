//! SQLite key-value backend with per-key TTL.
//!
//! Two tables:
//! - `kv` — string values with an `expires_at` unix-millis column; expired
//!   rows are treated as absent and lazily deleted on read.
//! - `kv_counters` — fixed-window counters for [`CounterStore`].
//!
//! The pool holds a single connection, so the counter's read-modify-write
//! runs inside one serialized transaction and the window increment is
//! atomic. This is the backend the rate limiter should sit on when
//! undercounting matters.

use animus_core::error::StoreError;
use animus_core::kv::{CounterStore, KvStore, WindowCount};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::info;

/// A SQLite-backed durable KV store.
pub struct SqliteKv {
    pool: SqlitePool,
}

impl SqliteKv {
    /// Open (or create) the database at `path`.
    ///
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database
    /// (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite KV store initialized at {path}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("kv table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_counters (
                key          TEXT PRIMARY KEY,
                count        INTEGER NOT NULL,
                window_start INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("kv_counters table: {e}")))?;

        Ok(())
    }

    fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)
    }
}

#[async_trait]
impl KvStore for SqliteKv {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now_ms = Utc::now().timestamp_millis();

        let row = sqlx::query("SELECT value, expires_at FROM kv WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        match row {
            None => Ok(None),
            Some(row) => {
                let expires_at: i64 = row.get("expires_at");
                if expires_at <= now_ms {
                    // Lazy expiry: the key is already dead, clean it up
                    sqlx::query("DELETE FROM kv WHERE key = ?1")
                        .bind(key)
                        .execute(&self.pool)
                        .await
                        .map_err(|e| StoreError::Storage(e.to_string()))?;
                    Ok(None)
                } else {
                    Ok(Some(row.get("value")))
                }
            }
        }
    }

    async fn put(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let expires_at = Utc::now().timestamp_millis() + (ttl_secs as i64) * 1000;

        sqlx::query("INSERT OR REPLACE INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)")
            .bind(key)
            .bind(value)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl CounterStore for SqliteKv {
    async fn incr_in_window(
        &self,
        key: &str,
        window_secs: u64,
        cap: u32,
    ) -> Result<WindowCount, StoreError> {
        let now_ms = Utc::now().timestamp_millis();
        let window_ms = (window_secs as i64) * 1000;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        let row = sqlx::query("SELECT count, window_start FROM kv_counters WHERE key = ?1")
            .bind(key)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        let outcome = match row {
            // Absent or stale window: reset
            None => WindowCount {
                admitted: true,
                count: 1,
                window_start: Self::millis_to_datetime(now_ms),
            },
            Some(row) => {
                let count: i64 = row.get("count");
                let window_start: i64 = row.get("window_start");

                if now_ms - window_start >= window_ms {
                    WindowCount {
                        admitted: true,
                        count: 1,
                        window_start: Self::millis_to_datetime(now_ms),
                    }
                } else if (count as u32) < cap {
                    WindowCount {
                        admitted: true,
                        count: count as u32 + 1,
                        window_start: Self::millis_to_datetime(window_start),
                    }
                } else {
                    WindowCount {
                        admitted: false,
                        count: count as u32,
                        window_start: Self::millis_to_datetime(window_start),
                    }
                }
            }
        };

        if outcome.admitted {
            sqlx::query(
                "INSERT OR REPLACE INTO kv_counters (key, count, window_start) VALUES (?1, ?2, ?3)",
            )
            .bind(key)
            .bind(outcome.count as i64)
            .bind(outcome.window_start.timestamp_millis())
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        Ok(outcome)
    }
}
