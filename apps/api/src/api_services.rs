mod attempt_store;
mod attempt_sweep;
mod database;
mod redis;
mod sessions;
mod state_builder;
mod users;

pub use attempt_store::build_attempt_store;
pub use attempt_sweep::spawn_attempt_sweep;
pub use database::connect_and_migrate;
pub use redis::build_redis_client;
pub use sessions::build_postgres_session_layer;
pub use state_builder::build_app_state;
pub use users::upsert_password_user;
