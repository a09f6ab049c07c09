//! Gatehouse maintenance worker: sweeps lapsed login attempt records.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use gatehouse_application::AttemptTracker;
use gatehouse_core::{AppError, AppResult};
use gatehouse_domain::{DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW_MINUTES, RateLimitPolicy};
use gatehouse_infrastructure::PostgresAttemptStore;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Which store the sweep would act on, from `ATTEMPT_STORE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SweepTarget {
    Postgres,
    /// Keys carry their own expiry.
    Redis,
    /// Records live in the API process, which sweeps them itself.
    Memory,
}

#[derive(Debug, Clone)]
struct WorkerConfig {
    database_url: String,
    policy: RateLimitPolicy,
    sweep_interval_seconds: u64,
    retention_hours: u32,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    match sweep_target(env::var("ATTEMPT_STORE").ok())? {
        SweepTarget::Postgres => {}
        target => {
            info!(?target, "attempt store needs no external sweep; gatehouse-worker exiting");
            return Ok(());
        }
    }

    let config = WorkerConfig::load()?;
    let pool = connect_pool(config.database_url.as_str()).await?;
    let tracker = AttemptTracker::new(Arc::new(PostgresAttemptStore::new(pool)), config.policy);
    let retention = TimeDelta::hours(i64::from(config.retention_hours));

    info!(
        sweep_interval_seconds = config.sweep_interval_seconds,
        retention_hours = config.retention_hours,
        window_minutes = config.policy.window_minutes(),
        "gatehouse-worker started"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(config.sweep_interval_seconds));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        match tracker.purge_stale(Utc::now(), retention).await {
            Ok(0) => {}
            Ok(purged) => info!(purged, "purged stale login attempt records"),
            Err(error) => warn!(error = %error, "failed to purge stale login attempt records"),
        }
    }
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

impl WorkerConfig {
    fn load() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;
        let policy = RateLimitPolicy::new(
            parse_env_u32("LOGIN_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
            parse_env_u32("LOGIN_WINDOW_MINUTES", DEFAULT_WINDOW_MINUTES)?,
        )?;
        let sweep_interval_seconds = parse_env_u64("SWEEP_INTERVAL_SECONDS", 300)?;
        let retention_hours = parse_env_u32("ATTEMPT_RETENTION_HOURS", 24)?;

        if sweep_interval_seconds == 0 {
            return Err(AppError::Validation(
                "SWEEP_INTERVAL_SECONDS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            policy,
            sweep_interval_seconds,
            retention_hours,
        })
    }
}

fn sweep_target(raw: Option<String>) -> AppResult<SweepTarget> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(SweepTarget::Postgres),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "postgres" => Ok(SweepTarget::Postgres),
            "redis" => Ok(SweepTarget::Redis),
            "memory" => Ok(SweepTarget::Memory),
            other => Err(AppError::Validation(format!(
                "ATTEMPT_STORE must be one of 'postgres', 'redis' or 'memory', got '{other}'"
            ))),
        },
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn parse_env_u32(name: &str, default: u32) -> AppResult<u32> {
    parse_number(name, env::var(name).ok(), default)
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    parse_number(name, env::var(name).ok(), default)
}

fn parse_number<T>(name: &str, raw: Option<String>, default: T) -> AppResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
    }
}
