use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, warn};

use gatehouse_core::AppResult;
use gatehouse_domain::{AttemptKey, RateLimitDecision, RateLimitPolicy};

use super::error::RateLimitError;
use super::ports::AttemptStore;

/// Application service deciding whether a login may be attempted and
/// recording failed logins.
///
/// Storage failures never block a login: reads fall back to a count of zero
/// and writes report zero, each with a logged warning. The `attempt_count`
/// and `try_increment_attempt` variants surface the error instead.
#[derive(Clone)]
pub struct AttemptTracker {
    store: Arc<dyn AttemptStore>,
    policy: RateLimitPolicy,
}

impl AttemptTracker {
    /// Creates a tracker over the given store and policy.
    #[must_use]
    pub fn new(store: Arc<dyn AttemptStore>, policy: RateLimitPolicy) -> Self {
        Self { store, policy }
    }

    /// Returns the active policy.
    #[must_use]
    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Checks the key against the policy at the current time.
    pub async fn check_rate_limit(&self, key: &AttemptKey) -> Result<(), RateLimitError> {
        self.check_rate_limit_at(key, Utc::now()).await
    }

    /// Checks the key against the policy at `now`. Read-only.
    ///
    /// Returns `TooManyAttempts` when the allowance is used up and
    /// `AttemptsRemainingWarning` when at most two attempts are left.
    pub async fn check_rate_limit_at(
        &self,
        key: &AttemptKey,
        now: DateTime<Utc>,
    ) -> Result<(), RateLimitError> {
        let effective_count = match self.attempt_count(key, now).await {
            Ok(count) => count,
            Err(error) => {
                warn!(
                    origin = key.origin(),
                    identifier = key.identifier(),
                    error = %error,
                    "attempt store read failed, allowing login attempt"
                );
                0
            }
        };

        match self.policy.evaluate(effective_count) {
            RateLimitDecision::Allow => Ok(()),
            RateLimitDecision::Warn { remaining } => {
                Err(RateLimitError::AttemptsRemainingWarning { remaining })
            }
            RateLimitDecision::Blocked { window_minutes } => {
                debug!(
                    origin = key.origin(),
                    identifier = key.identifier(),
                    attempt_count = effective_count,
                    "login attempt blocked by rate limit"
                );
                Err(RateLimitError::TooManyAttempts { window_minutes })
            }
        }
    }

    /// Returns the failures counting against the key at `now`.
    pub async fn attempt_count(&self, key: &AttemptKey, now: DateTime<Utc>) -> AppResult<u32> {
        let record = self.store.find(key).await?;

        Ok(record
            .map(|record| record.effective_count(now, self.policy.window()))
            .unwrap_or(0))
    }

    /// Records one failed credential check and returns the new count.
    ///
    /// Returns zero when the store is unavailable.
    pub async fn increment_attempt(&self, key: &AttemptKey, now: DateTime<Utc>) -> u32 {
        match self.try_increment_attempt(key, now).await {
            Ok(attempt_count) => attempt_count,
            Err(error) => {
                warn!(
                    origin = key.origin(),
                    identifier = key.identifier(),
                    error = %error,
                    "failed to record login attempt, failing open"
                );
                0
            }
        }
    }

    /// Records one failed credential check, surfacing storage errors.
    pub async fn try_increment_attempt(
        &self,
        key: &AttemptKey,
        now: DateTime<Utc>,
    ) -> AppResult<u32> {
        let record = self.store.increment(key, now, self.policy.window()).await?;

        debug!(
            origin = key.origin(),
            identifier = key.identifier(),
            attempt_count = record.stored_count(),
            "recorded failed login attempt"
        );

        Ok(record.stored_count())
    }

    /// Removes records whose window ended more than `retention` before `now`.
    ///
    /// Expired records already read as zero, so this only bounds storage.
    pub async fn purge_stale(&self, now: DateTime<Utc>, retention: TimeDelta) -> AppResult<u64> {
        let cutoff = now - self.policy.window() - retention;
        self.store.purge_expired(cutoff).await
    }
}
