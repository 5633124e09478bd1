//! # Postgres store
//!
//! This module implements the data mapping between the relational model
//! (see `sql/schema.sql`) and the `domains` models.
//!
//! Case-insensitive keys are matched with `LOWER(..)` and ordered with the
//! "C" collation so that listings sort the same way as the in-memory store.

mod forums;
mod posts;
mod rows;
mod service;
mod threads;
mod users;

use std::time::Duration;

use domains::DomainError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Opens the connection pool. Nothing is created or migrated.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await?;
        info!(max_connections, "postgres pool ready");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Waits for checked-out connections to return, then closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("postgres pool closed");
    }
}

/// Converts a driver error into the domain taxonomy.
pub(crate) fn db_error(err: sqlx::Error) -> DomainError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            DomainError::Conflict(db.message().to_string())
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => DomainError::NotFound(
            db.table().unwrap_or("referenced row").to_string(),
            db.message().to_string(),
        ),
        _ => DomainError::Internal(err.to_string()),
    }
}

/// `LIMIT NULL` is `LIMIT ALL` in Postgres.
pub(crate) fn limit(size: domains::PageSize) -> Option<i64> {
    size.get().map(|n| i64::try_from(n).unwrap_or(i64::MAX))
}
