use gatehouse_application::PasswordHasher;
use gatehouse_core::{AppError, AppResult};
use gatehouse_domain::{EmailAddress, UserId};
use gatehouse_infrastructure::Argon2PasswordHasher;
use sqlx::PgPool;
use tracing::info;

/// Creates a password user, or replaces the password of an existing one.
pub async fn upsert_password_user(pool: &PgPool, email: &str, password: &str) -> AppResult<()> {
    let email = EmailAddress::new(email)?;
    let password_hash = Argon2PasswordHasher::new()?.hash_password(password)?;

    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash)
        VALUES ($1, $2, $3)
        ON CONFLICT ((lower(email))) DO UPDATE
        SET password_hash = EXCLUDED.password_hash
        "#,
    )
    .bind(UserId::new().as_uuid())
    .bind(email.as_str())
    .bind(password_hash)
    .execute(pool)
    .await
    .map_err(|error| {
        AppError::Internal(format!(
            "failed to upsert user '{}': {error}",
            email.as_str()
        ))
    })?;

    info!(email = email.as_str(), "password user saved");
    Ok(())
}
