//! PostgreSQL-backed attempt store using the `login_attempts` table.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use sqlx::PgPool;
use tracing::debug;

use gatehouse_application::AttemptStore;
use gatehouse_core::{AppError, AppResult};
use gatehouse_domain::{AttemptKey, AttemptRecord};

#[cfg(test)]
mod tests;

/// PostgreSQL implementation of the attempt store port.
#[derive(Clone)]
pub struct PostgresAttemptStore {
    pool: PgPool,
}

impl PostgresAttemptStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttemptStore for PostgresAttemptStore {
    async fn find(&self, key: &AttemptKey) -> AppResult<Option<AttemptRecord>> {
        let row = sqlx::query_as::<_, AttemptRow>(
            r#"
            SELECT attempt_count, last_reset, last_attempt
            FROM login_attempts
            WHERE origin = $1 AND identifier = $2
            "#,
        )
        .bind(key.origin())
        .bind(key.identifier())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read login attempts: {error}")))?;

        row.map(|row| row.into_record(key)).transpose()
    }

    async fn increment(
        &self,
        key: &AttemptKey,
        now: DateTime<Utc>,
        window: TimeDelta,
    ) -> AppResult<AttemptRecord> {
        if window <= TimeDelta::zero() {
            return Err(AppError::Validation(
                "attempt window must be greater than zero".to_owned(),
            ));
        }

        // UPSERT: insert a new row or increment the counter under the row lock.
        // If the existing window has lapsed, restart the counter and window.
        let row = sqlx::query_as::<_, AttemptRow>(
            r#"
            INSERT INTO login_attempts (origin, identifier, attempt_count, last_reset, last_attempt)
            VALUES ($1, $2, 1, $3, $3)
            ON CONFLICT (origin, identifier) DO UPDATE
            SET
                attempt_count = CASE
                    WHEN $3 > login_attempts.last_reset + make_interval(secs => $4::float8)
                    THEN 1
                    ELSE login_attempts.attempt_count + 1
                END,
                last_reset = CASE
                    WHEN $3 > login_attempts.last_reset + make_interval(secs => $4::float8)
                    THEN $3
                    ELSE login_attempts.last_reset
                END,
                last_attempt = $3
            RETURNING attempt_count, last_reset, last_attempt
            "#,
        )
        .bind(key.origin())
        .bind(key.identifier())
        .bind(now)
        .bind(window.num_milliseconds() as f64 / 1000.0)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to record login attempt: {error}"))
        })?;

        row.into_record(key)
    }

    async fn purge_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM login_attempts
            WHERE last_reset < $1
            "#,
        )
        .bind(before)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to purge expired login attempts: {error}"))
        })?;

        let purged = result.rows_affected();
        debug!(purged, cutoff = %before, "purged expired login attempts");

        Ok(purged)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AttemptRow {
    attempt_count: i32,
    last_reset: DateTime<Utc>,
    last_attempt: DateTime<Utc>,
}

impl AttemptRow {
    fn into_record(self, key: &AttemptKey) -> AppResult<AttemptRecord> {
        let attempt_count = u32::try_from(self.attempt_count).map_err(|error| {
            AppError::Internal(format!("invalid stored attempt count: {error}"))
        })?;

        Ok(AttemptRecord::from_parts(
            key.clone(),
            attempt_count,
            self.last_reset,
            self.last_attempt,
        ))
    }
}
