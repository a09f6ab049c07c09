//! Redis-backed attempt store.
//!
//! Each key is a hash with `count`, `last_reset` and `last_attempt` fields
//! (epoch milliseconds). Updates run in one Lua script, so Redis serializes
//! them per key.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use gatehouse_application::AttemptStore;
use gatehouse_core::{AppError, AppResult};
use gatehouse_domain::{AttemptKey, AttemptRecord};
use redis::Script;

const RECORD_FAILURE_SCRIPT: &str = r#"
local key = KEYS[1]
local now_ms = tonumber(ARGV[1])
local window_ms = tonumber(ARGV[2])
local retention_ms = tonumber(ARGV[3])

local count = tonumber(redis.call('HGET', key, 'count'))
local last_reset = tonumber(redis.call('HGET', key, 'last_reset'))

if count == nil or last_reset == nil or now_ms > last_reset + window_ms then
  count = 1
  last_reset = now_ms
else
  count = count + 1
end

redis.call('HSET', key, 'count', count, 'last_reset', last_reset, 'last_attempt', now_ms)
redis.call('PEXPIREAT', key, last_reset + window_ms + retention_ms)
return {count, last_reset, now_ms}
"#;

/// Default time a lapsed record is kept before Redis evicts it.
const DEFAULT_RETENTION_HOURS: i64 = 24;

/// Redis implementation of the attempt store port.
#[derive(Clone)]
pub struct RedisAttemptStore {
    client: redis::Client,
    key_prefix: String,
    retention: TimeDelta,
}

impl RedisAttemptStore {
    /// Creates a store with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
            retention: TimeDelta::hours(DEFAULT_RETENTION_HOURS),
        }
    }

    /// Overrides how long records outlive their window before eviction.
    #[must_use]
    pub fn with_retention(mut self, retention: TimeDelta) -> Self {
        self.retention = retention;
        self
    }

    // Origins are IP addresses or `unknown`; neither contains `|`, so keys cannot collide.
    fn key_for(&self, key: &AttemptKey) -> String {
        format!("{}:{}|{}", self.key_prefix, key.origin(), key.identifier())
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))
    }
}

#[async_trait]
impl AttemptStore for RedisAttemptStore {
    async fn find(&self, key: &AttemptKey) -> AppResult<Option<AttemptRecord>> {
        let mut connection = self.connection().await?;

        let (count, last_reset, last_attempt): (Option<i64>, Option<i64>, Option<i64>) =
            redis::cmd("HMGET")
                .arg(self.key_for(key))
                .arg("count")
                .arg("last_reset")
                .arg("last_attempt")
                .query_async(&mut connection)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to read redis login attempts: {error}"))
                })?;

        let (Some(count), Some(last_reset), Some(last_attempt)) = (count, last_reset, last_attempt)
        else {
            return Ok(None);
        };

        record_from_millis(key, count, last_reset, last_attempt).map(Some)
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

        let mut connection = self.connection().await?;

        let script = Script::new(RECORD_FAILURE_SCRIPT);
        let (count, last_reset, last_attempt): (i64, i64, i64) = script
            .key(self.key_for(key))
            .arg(now.timestamp_millis())
            .arg(window.num_milliseconds())
            .arg(self.retention.num_milliseconds())
            .invoke_async(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to record redis login attempt: {error}"))
            })?;

        record_from_millis(key, count, last_reset, last_attempt)
    }

    async fn purge_expired(&self, _before: DateTime<Utc>) -> AppResult<u64> {
        // Redis attempt keys expire automatically via PEXPIREAT.
        Ok(0)
    }
}

fn record_from_millis(
    key: &AttemptKey,
    count: i64,
    last_reset_ms: i64,
    last_attempt_ms: i64,
) -> AppResult<AttemptRecord> {
    let attempt_count = u32::try_from(count)
        .map_err(|error| AppError::Internal(format!("invalid redis attempt count: {error}")))?;

    Ok(AttemptRecord::from_parts(
        key.clone(),
        attempt_count,
        timestamp_from_millis(last_reset_ms)?,
        timestamp_from_millis(last_attempt_ms)?,
    ))
}

fn timestamp_from_millis(value: i64) -> AppResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(value)
        .single()
        .ok_or_else(|| AppError::Internal(format!("invalid redis attempt timestamp: {value}")))
}

#[cfg(test)]
mod tests {
    use super::{RedisAttemptStore, record_from_millis};
    use gatehouse_domain::AttemptKey;

    fn key() -> AttemptKey {
        AttemptKey::new("2001:db8::1", "a@b.com").unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn key_layout_keeps_ipv6_origin_intact() {
        let client = redis::Client::open("redis://127.0.0.1/").unwrap_or_else(|_| unreachable!());
        let store = RedisAttemptStore::new(client, "gatehouse:attempts");

        assert_eq!(store.key_for(&key()), "gatehouse:attempts:2001:db8::1|a@b.com");
    }

    #[test]
    fn millis_are_decoded_into_record() {
        let record = record_from_millis(&key(), 3, 1_700_000_000_000, 1_700_000_060_000);
        assert!(record.is_ok());

        let record = record.unwrap_or_else(|_| unreachable!());
        assert_eq!(record.stored_count(), 3);
        assert_eq!(record.last_reset().timestamp(), 1_700_000_000);
        assert_eq!(record.last_attempt().timestamp(), 1_700_000_060);
    }

    #[test]
    fn negative_counts_are_rejected() {
        assert!(record_from_millis(&key(), -1, 0, 0).is_err());
    }
}
