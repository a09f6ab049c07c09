use async_trait::async_trait;
use sqlx::PgPool;

use gatehouse_application::{AuthEvent, AuthEventRepository};
use gatehouse_core::{AppError, AppResult};

/// PostgreSQL-backed repository for authentication events.
#[derive(Clone)]
pub struct PostgresAuthEventRepository {
    pool: PgPool,
}

impl PostgresAuthEventRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthEventRepository for PostgresAuthEventRepository {
    async fn append_event(&self, event: AuthEvent) -> AppResult<()> {
        let attempt_count = event
            .attempt_count
            .map(i32::try_from)
            .transpose()
            .map_err(|error| AppError::Internal(format!("invalid attempt count: {error}")))?;

        sqlx::query(
            r#"
            INSERT INTO auth_events (
                subject,
                event_type,
                ip_address,
                user_agent,
                attempt_count
            )
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event.subject)
        .bind(event.kind.as_str())
        .bind(event.ip_address)
        .bind(event.user_agent)
        .bind(attempt_count)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to append auth event: {error}")))?;

        Ok(())
    }
}
