//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod argon2_password_hasher;
mod in_memory_attempt_store;
mod postgres_attempt_store;
mod postgres_auth_event_repository;
mod postgres_credential_verifier;
mod redis_attempt_store;

pub use argon2_password_hasher::Argon2PasswordHasher;
pub use in_memory_attempt_store::InMemoryAttemptStore;
pub use postgres_attempt_store::PostgresAttemptStore;
pub use postgres_auth_event_repository::PostgresAuthEventRepository;
pub use postgres_credential_verifier::PostgresCredentialVerifier;
pub use redis_attempt_store::RedisAttemptStore;

/// Embedded SQL migrations for every Postgres-backed adapter.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
