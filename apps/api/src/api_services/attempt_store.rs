use std::sync::Arc;

use gatehouse_application::AttemptStore;
use gatehouse_core::AppError;
use gatehouse_infrastructure::{InMemoryAttemptStore, PostgresAttemptStore, RedisAttemptStore};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::api_config::AttemptStoreBackend;

const REDIS_ATTEMPT_KEY_PREFIX: &str = "gatehouse:login_attempts";

pub fn build_attempt_store(
    backend: AttemptStoreBackend,
    pool: PgPool,
    redis_client: Option<redis::Client>,
) -> Result<Arc<dyn AttemptStore>, AppError> {
    let store: Arc<dyn AttemptStore> = match backend {
        AttemptStoreBackend::Postgres => Arc::new(PostgresAttemptStore::new(pool)),
        AttemptStoreBackend::Redis => {
            let redis_client = redis_client.ok_or_else(|| {
                AppError::Validation("REDIS_URL is required when ATTEMPT_STORE=redis".to_owned())
            })?;
            Arc::new(RedisAttemptStore::new(redis_client, REDIS_ATTEMPT_KEY_PREFIX))
        }
        AttemptStoreBackend::Memory => {
            warn!("login attempts are kept in process memory and are not shared across instances");
            Arc::new(InMemoryAttemptStore::new())
        }
    };

    info!(backend = ?backend, "login attempt store configured");
    Ok(store)
}
