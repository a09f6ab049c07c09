use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use gatehouse_application::AttemptTracker;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Periodically evicts lapsed records from a process-local attempt store.
pub fn spawn_attempt_sweep(tracker: AttemptTracker, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            sweep_once(&tracker, Utc::now()).await;
        }
    });
}

// Lapsed in-memory records carry nothing worth keeping, so retention is zero.
async fn sweep_once(tracker: &AttemptTracker, now: DateTime<Utc>) -> u64 {
    match tracker.purge_stale(now, TimeDelta::zero()).await {
        Ok(0) => 0,
        Ok(purged) => {
            info!(purged, "purged lapsed in-memory login attempt records");
            purged
        }
        Err(error) => {
            warn!(error = %error, "failed to purge in-memory login attempt records");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeDelta, Utc};
    use gatehouse_application::AttemptTracker;
    use gatehouse_domain::{AttemptKey, RateLimitPolicy};
    use gatehouse_infrastructure::InMemoryAttemptStore;

    use super::sweep_once;

    fn key(identifier: &str) -> AttemptKey {
        AttemptKey::new("203.0.113.9", identifier).unwrap_or_else(|_| unreachable!())
    }

    #[tokio::test]
    async fn sweep_evicts_only_lapsed_records() {
        let tracker = AttemptTracker::new(
            Arc::new(InMemoryAttemptStore::new()),
            RateLimitPolicy::default(),
        );
        let now = Utc::now();

        for n in 0..50 {
            let stale = key(&format!("user{n}@example.com"));
            tracker
                .increment_attempt(&stale, now - TimeDelta::hours(1))
                .await;
        }
        tracker.increment_attempt(&key("live@example.com"), now).await;

        assert_eq!(sweep_once(&tracker, now).await, 50);
        assert_eq!(sweep_once(&tracker, now).await, 0);
        assert_eq!(
            tracker.attempt_count(&key("live@example.com"), now).await.ok(),
            Some(1)
        );
    }
}
