use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use gatehouse_core::AppResult;
use gatehouse_domain::{AttemptKey, AttemptRecord};

/// Repository port for attempt counter persistence.
///
/// Implementations must serialize updates per key: concurrent `increment`
/// calls for one key must all be reflected in the stored count.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Returns the stored record for the key, without applying window expiry.
    async fn find(&self, key: &AttemptKey) -> AppResult<Option<AttemptRecord>>;

    /// Records one failure for the key in a single atomic step.
    ///
    /// Uses an UPSERT pattern: a missing record, or one whose window ended
    /// before `now`, is (re)started at one with `last_reset = now`; otherwise
    /// the counter is incremented. `last_attempt` is always set to `now`.
    /// Returns the record as stored after the update.
    async fn increment(
        &self,
        key: &AttemptKey,
        now: DateTime<Utc>,
        window: TimeDelta,
    ) -> AppResult<AttemptRecord>;

    /// Removes records whose window started before the given cutoff.
    async fn purge_expired(&self, before: DateTime<Utc>) -> AppResult<u64>;
}
