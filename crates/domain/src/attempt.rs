//! Failed login accounting per `(origin, identifier)` pair.
//!
//! Window expiry is lazy: a record whose window has lapsed is never swept
//! by the domain, it simply reads as zero until the next failure restarts it.

use chrono::{DateTime, TimeDelta, Utc};
use gatehouse_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Composite key identifying one attempt counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptKey {
    origin: NonEmptyString,
    identifier: NonEmptyString,
}

impl AttemptKey {
    /// Creates a key from the caller origin and the claimed identity.
    ///
    /// The origin is trimmed. The identifier is trimmed and lower-cased so
    /// `Alice@Example.com` and `alice@example.com` share one counter.
    pub fn new(origin: impl AsRef<str>, identifier: impl AsRef<str>) -> AppResult<Self> {
        let origin = NonEmptyString::new(origin.as_ref().trim())
            .map_err(|_| AppError::Validation("attempt origin must not be empty".to_owned()))?;
        let identifier = NonEmptyString::new(identifier.as_ref().trim().to_lowercase())
            .map_err(|_| AppError::Validation("attempt identifier must not be empty".to_owned()))?;

        Ok(Self { origin, identifier })
    }

    /// Returns the caller origin (typically an IP address).
    #[must_use]
    pub fn origin(&self) -> &str {
        self.origin.as_str()
    }

    /// Returns the normalized identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        self.identifier.as_str()
    }
}

impl std::fmt::Display for AttemptKey {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}:{}", self.origin, self.identifier)
    }
}

/// Stored failure counter for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    key: AttemptKey,
    attempt_count: u32,
    last_reset: DateTime<Utc>,
    last_attempt: DateTime<Utc>,
}

impl AttemptRecord {
    /// Creates the record for the first failure of a fresh window.
    #[must_use]
    pub fn first_failure(key: AttemptKey, now: DateTime<Utc>) -> Self {
        Self {
            key,
            attempt_count: 1,
            last_reset: now,
            last_attempt: now,
        }
    }

    /// Rebuilds a record from persisted values.
    #[must_use]
    pub fn from_parts(
        key: AttemptKey,
        attempt_count: u32,
        last_reset: DateTime<Utc>,
        last_attempt: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            attempt_count,
            last_reset,
            last_attempt,
        }
    }

    /// Returns the record key.
    #[must_use]
    pub fn key(&self) -> &AttemptKey {
        &self.key
    }

    /// Returns the stored counter, without applying window expiry.
    #[must_use]
    pub fn stored_count(&self) -> u32 {
        self.attempt_count
    }

    /// Returns the start of the current counting window.
    #[must_use]
    pub fn last_reset(&self) -> DateTime<Utc> {
        self.last_reset
    }

    /// Returns the time of the most recent recorded failure.
    #[must_use]
    pub fn last_attempt(&self) -> DateTime<Utc> {
        self.last_attempt
    }

    /// Returns when the current window lapses.
    #[must_use]
    pub fn window_expires_at(&self, window: TimeDelta) -> DateTime<Utc> {
        self.last_reset + window
    }

    /// Returns whether the window has lapsed at `now`.
    ///
    /// The boundary instant itself still belongs to the window.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, window: TimeDelta) -> bool {
        now > self.window_expires_at(window)
    }

    /// Returns the number of failures that count against the key at `now`.
    #[must_use]
    pub fn effective_count(&self, now: DateTime<Utc>, window: TimeDelta) -> u32 {
        if self.is_expired(now, window) {
            return 0;
        }

        self.attempt_count
    }

    /// Applies one more failure at `now`.
    ///
    /// An expired record restarts at one with a new window; otherwise the
    /// counter accumulates and the window start is kept.
    #[must_use]
    pub fn record_failure(self, now: DateTime<Utc>, window: TimeDelta) -> Self {
        if self.is_expired(now, window) {
            return Self::first_failure(self.key, now);
        }

        Self {
            attempt_count: self.attempt_count.saturating_add(1),
            last_attempt: now,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone, Utc};
    use proptest::prelude::*;

    use super::{AttemptKey, AttemptRecord};

    fn key() -> AttemptKey {
        AttemptKey::new("1.2.3.4", "a@b.com").unwrap_or_else(|_| unreachable!())
    }

    fn window() -> TimeDelta {
        TimeDelta::minutes(15)
    }

    #[test]
    fn key_normalizes_identifier_case_and_whitespace() {
        let key = AttemptKey::new(" 1.2.3.4 ", "  Alice@Example.COM ");
        assert!(key.is_ok());
        let key = key.unwrap_or_else(|_| unreachable!());
        assert_eq!(key.origin(), "1.2.3.4");
        assert_eq!(key.identifier(), "alice@example.com");
        assert_eq!(key.to_string(), "1.2.3.4:alice@example.com");
    }

    #[test]
    fn key_rejects_blank_parts() {
        assert!(AttemptKey::new("", "a@b.com").is_err());
        assert!(AttemptKey::new("1.2.3.4", "   ").is_err());
    }

    #[test]
    fn first_failure_starts_window_at_one() {
        let now = Utc::now();
        let record = AttemptRecord::first_failure(key(), now);
        assert_eq!(record.stored_count(), 1);
        assert_eq!(record.last_reset(), now);
        assert_eq!(record.last_attempt(), now);
    }

    #[test]
    fn window_boundary_still_counts() {
        let start = Utc
            .with_ymd_and_hms(2026, 1, 1, 12, 0, 0)
            .single()
            .unwrap_or_else(|| unreachable!());
        let record = AttemptRecord::from_parts(key(), 4, start, start);

        assert_eq!(record.effective_count(start + window(), window()), 4);
        assert_eq!(
            record.effective_count(start + window() + TimeDelta::seconds(1), window()),
            0
        );
    }

    #[test]
    fn failure_after_expiry_restarts_window() {
        let start = Utc::now();
        let later = start + TimeDelta::minutes(16);
        let record = AttemptRecord::from_parts(key(), 5, start, start).record_failure(later, window());

        assert_eq!(record.stored_count(), 1);
        assert_eq!(record.last_reset(), later);
        assert_eq!(record.last_attempt(), later);
    }

    #[test]
    fn failure_within_window_keeps_window_start() {
        let start = Utc::now();
        let later = start + TimeDelta::minutes(3);
        let record = AttemptRecord::first_failure(key(), start).record_failure(later, window());

        assert_eq!(record.stored_count(), 2);
        assert_eq!(record.last_reset(), start);
        assert_eq!(record.last_attempt(), later);
    }

    proptest! {
        #[test]
        fn expired_records_always_read_as_zero(
            stored in 0_u32..10_000,
            window_minutes in 1_i64..10_080,
            overshoot_seconds in 1_i64..1_000_000,
        ) {
            let window = TimeDelta::minutes(window_minutes);
            let start = Utc::now();
            let record = AttemptRecord::from_parts(key(), stored, start, start);
            let now = start + window + TimeDelta::seconds(overshoot_seconds);

            prop_assert_eq!(record.effective_count(now, window), 0);
        }

        #[test]
        fn live_records_read_their_stored_count(
            stored in 0_u32..10_000,
            window_minutes in 1_i64..10_080,
            elapsed_fraction in 0.0_f64..=1.0,
        ) {
            let window = TimeDelta::minutes(window_minutes);
            let start = Utc::now();
            let record = AttemptRecord::from_parts(key(), stored, start, start);
            let elapsed_seconds = (window.num_seconds() as f64 * elapsed_fraction) as i64;
            let now = start + TimeDelta::seconds(elapsed_seconds);

            prop_assert_eq!(record.effective_count(now, window), stored);
        }

        #[test]
        fn failures_within_one_window_accumulate(failures in 1_u32..200) {
            let start = Utc::now();
            let mut record = AttemptRecord::first_failure(key(), start);
            for step in 1..failures {
                record = record.record_failure(start + TimeDelta::seconds(i64::from(step)), TimeDelta::minutes(15));
            }

            prop_assert_eq!(record.stored_count(), failures);
            prop_assert_eq!(record.last_reset(), start);
        }
    }
}
