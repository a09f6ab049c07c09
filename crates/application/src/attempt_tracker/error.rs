use gatehouse_domain::{lockout_notice, remaining_attempts_notice};
use thiserror::Error;

/// Typed outcome of a rate limit pre-check that is not a plain "allowed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RateLimitError {
    /// The key used up its allowance for the window. Deny without checking
    /// credentials.
    #[error("{}", lockout_notice(*.window_minutes))]
    TooManyAttempts {
        /// Window length to quote to the user.
        window_minutes: u32,
    },

    /// Soft outcome: the login may proceed, but the user should be told how
    /// many attempts are left.
    #[error("{}", remaining_attempts_notice(*.remaining))]
    AttemptsRemainingWarning {
        /// Attempts left before the key is blocked.
        remaining: u32,
    },
}

impl RateLimitError {
    /// Returns whether the caller must stop before verifying credentials.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::TooManyAttempts { .. })
    }
}
