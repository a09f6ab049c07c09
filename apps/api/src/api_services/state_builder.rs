use std::sync::Arc;
use std::time::Duration;

use gatehouse_application::{AttemptTracker, AuthEventService, LoginService, PasswordHasher};
use gatehouse_core::AppResult;
use gatehouse_infrastructure::{
    Argon2PasswordHasher, PostgresAuthEventRepository, PostgresCredentialVerifier,
};
use sqlx::PgPool;

use crate::api_config::{ApiConfig, AttemptStoreBackend};
use crate::state::AppState;

use super::{build_attempt_store, spawn_attempt_sweep};

pub fn build_app_state(
    pool: PgPool,
    redis_client: Option<redis::Client>,
    config: &ApiConfig,
) -> AppResult<AppState> {
    let attempt_store =
        build_attempt_store(config.attempt_store, pool.clone(), redis_client.clone())?;
    let attempt_tracker = AttemptTracker::new(attempt_store, config.login_policy);
    if config.attempt_store == AttemptStoreBackend::Memory {
        spawn_attempt_sweep(
            attempt_tracker.clone(),
            Duration::from_secs(config.sweep_interval_seconds),
        );
    }

    let auth_event_service =
        AuthEventService::new(Arc::new(PostgresAuthEventRepository::new(pool.clone())));

    let password_hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2PasswordHasher::new()?);
    let credential_verifier = Arc::new(PostgresCredentialVerifier::new(
        pool.clone(),
        password_hasher,
    )?);

    let login_service = LoginService::new(
        attempt_tracker,
        credential_verifier,
        auth_event_service.clone(),
    );

    Ok(AppState {
        login_service,
        auth_event_service,
        postgres_pool: pool,
        redis_client,
        redis_required: config.redis_required(),
        frontend_url: config.frontend_url.clone(),
        trust_forwarded_for: config.trust_forwarded_for,
    })
}
