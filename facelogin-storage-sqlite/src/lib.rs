//! SQLite backend for the facelogin state store.
//!
//! Keeps the lockout counter, lockout deadline and session artifacts in a
//! single `client_state` table so they survive process restarts.
//!
//! # Example
//!
//! ```rust,no_run
//! use facelogin_storage_sqlite::SqliteStateStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteStateStore::connect("sqlite://facelogin.db").await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use facelogin_core::{Error, error::StorageError, repositories::StateStore};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

/// [`StateStore`] backed by a SQLite table.
///
/// Each operation is a single statement, so individual reads and writes are
/// atomic. A read-modify-write performed by a caller is not.
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `url`.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| {
                tracing::error!(error = %e, url, "Invalid SQLite connection string");
                StorageError::Backend(format!("Invalid SQLite connection string: {e}"))
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to connect to SQLite");
                StorageError::Backend("Failed to connect to SQLite".to_string())
            })?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the `client_state` table if it does not exist.
    pub async fn migrate(&self) -> Result<(), Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS client_state (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create client_state table");
            StorageError::Backend("Failed to create client_state table".to_string())
        })?;

        tracing::info!("Client state table ready");
        Ok(())
    }

    /// Close the underlying pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM client_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, key, "Failed to read client state");
                StorageError::Backend("Failed to read client state".to_string())
            })?;

        Ok(row.map(|(value,)| value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO client_state (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, key, "Failed to write client state");
            StorageError::Backend("Failed to write client state".to_string())
        })?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        sqlx::query("DELETE FROM client_state WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, key, "Failed to remove client state");
                StorageError::Backend("Failed to remove client state".to_string())
            })?;

        Ok(())
    }
}
