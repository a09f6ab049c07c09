//! Email and password verification against the `users` table.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use gatehouse_application::{CredentialVerifier, PasswordHasher, UserRecord};
use gatehouse_core::{AppError, AppResult};
use gatehouse_domain::{EmailAddress, UserId};

/// PostgreSQL implementation of the credential verifier port.
#[derive(Clone)]
pub struct PostgresCredentialVerifier {
    pool: PgPool,
    password_hasher: Arc<dyn PasswordHasher>,
    dummy_hash: String,
}

impl PostgresCredentialVerifier {
    /// Creates a verifier. Hashes a throwaway password once so unknown
    /// emails can be checked against a real hash.
    pub fn new(pool: PgPool, password_hasher: Arc<dyn PasswordHasher>) -> AppResult<Self> {
        let dummy_hash = password_hasher.hash_password("gatehouse-timing-equalizer")?;

        Ok(Self {
            pool,
            password_hasher,
            dummy_hash,
        })
    }
}

#[async_trait]
impl CredentialVerifier for PostgresCredentialVerifier {
    async fn verify(&self, email: &EmailAddress, password: &str) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, password_hash
            FROM users
            WHERE lower(email) = $1
            "#,
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load user: {error}")))?;

        let Some(UserRow {
            id,
            email,
            password_hash: Some(password_hash),
        }) = row
        else {
            // OWASP: run a full verification even when there is nothing to match.
            // The AppResult is discarded; only the elapsed time matters here.
            let _ = self
                .password_hasher
                .verify_password(password, &self.dummy_hash);
            return Ok(None);
        };

        if !self
            .password_hasher
            .verify_password(password, &password_hash)?
        {
            return Ok(None);
        }

        Ok(Some(UserRecord {
            id: UserId::from_uuid(id),
            email,
        }))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: Option<String>,
}
