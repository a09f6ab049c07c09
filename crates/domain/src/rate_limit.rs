//! Login rate limit policy and threshold decisions.

use chrono::TimeDelta;
use gatehouse_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Default number of failed attempts allowed per window.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default window length in minutes.
pub const DEFAULT_WINDOW_MINUTES: u32 = 15;

/// Remaining-attempt count at or below which callers are warned.
pub const WARNING_THRESHOLD: u32 = 2;

/// Process-wide login rate limit settings, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    max_attempts: u32,
    window_minutes: u32,
}

impl RateLimitPolicy {
    /// Creates a policy. Both values must be positive.
    pub fn new(max_attempts: u32, window_minutes: u32) -> AppResult<Self> {
        if max_attempts == 0 {
            return Err(AppError::Validation(
                "max_attempts must be greater than zero".to_owned(),
            ));
        }

        if window_minutes == 0 {
            return Err(AppError::Validation(
                "window_minutes must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            max_attempts,
            window_minutes,
        })
    }

    /// Maximum failures allowed inside one window.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Window length in minutes.
    #[must_use]
    pub fn window_minutes(&self) -> u32 {
        self.window_minutes
    }

    /// Window length as a duration.
    #[must_use]
    pub fn window(&self) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.window_minutes))
    }

    /// Classifies an effective failure count before a login attempt.
    ///
    /// A key with no failures is always allowed without a warning, even
    /// when `max_attempts` is at or below the warning threshold.
    #[must_use]
    pub fn evaluate(&self, effective_count: u32) -> RateLimitDecision {
        if effective_count >= self.max_attempts {
            return RateLimitDecision::Blocked {
                window_minutes: self.window_minutes,
            };
        }

        let remaining = self.max_attempts - effective_count;
        if effective_count > 0 && remaining <= WARNING_THRESHOLD {
            return RateLimitDecision::Warn { remaining };
        }

        RateLimitDecision::Allow
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            window_minutes: DEFAULT_WINDOW_MINUTES,
        }
    }
}

/// Pre-check outcome for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Proceed silently.
    Allow,
    /// Proceed, but tell the user how many attempts are left.
    Warn {
        /// Attempts left before the key is blocked.
        remaining: u32,
    },
    /// Deny without consulting the credential store.
    Blocked {
        /// Window length to quote to the user.
        window_minutes: u32,
    },
}

/// Standing of a key right after a failed login was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureStanding {
    /// No special messaging.
    Normal,
    /// Few attempts are left.
    Warning {
        /// Attempts left before the key is blocked.
        remaining: u32,
    },
    /// The allowance for this window is used up.
    Locked {
        /// Window length to quote to the user.
        window_minutes: u32,
    },
}

impl FailureStanding {
    /// Derives the standing from the post-increment attempt count.
    ///
    /// A count of zero means the counter store could not be updated; no
    /// standing can be derived from it so it reads as `Normal`.
    #[must_use]
    pub fn from_attempts(policy: &RateLimitPolicy, attempts: u32) -> Self {
        if attempts == 0 {
            return Self::Normal;
        }

        match policy.max_attempts().checked_sub(attempts) {
            None | Some(0) => Self::Locked {
                window_minutes: policy.window_minutes(),
            },
            Some(remaining) if remaining <= WARNING_THRESHOLD => Self::Warning { remaining },
            Some(_) => Self::Normal,
        }
    }

    /// User-facing notice for this standing, if any.
    #[must_use]
    pub fn notice(&self) -> Option<String> {
        match self {
            Self::Normal => None,
            Self::Warning { remaining } => Some(remaining_attempts_notice(*remaining)),
            Self::Locked { window_minutes } => Some(lockout_notice(*window_minutes)),
        }
    }
}

/// Message quoting the exact number of attempts left.
#[must_use]
pub fn remaining_attempts_notice(remaining: u32) -> String {
    let noun = if remaining == 1 { "attempt" } else { "attempts" };
    format!("{remaining} login {noun} remaining before sign-in is temporarily blocked")
}

/// Message quoting the window length, never an unlock time.
#[must_use]
pub fn lockout_notice(window_minutes: u32) -> String {
    format!(
        "too many failed login attempts, please try again after the {window_minutes} minute window expires"
    )
}
