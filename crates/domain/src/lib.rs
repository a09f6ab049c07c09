//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod attempt;
mod rate_limit;
mod user;

pub use attempt::{AttemptKey, AttemptRecord};
pub use rate_limit::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW_MINUTES, FailureStanding, RateLimitDecision,
    RateLimitPolicy, WARNING_THRESHOLD, lockout_notice, remaining_attempts_notice,
};
pub use user::{EmailAddress, UserId};
