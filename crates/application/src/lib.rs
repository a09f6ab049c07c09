//! Application services and ports.

#![forbid(unsafe_code)]

mod attempt_tracker;
mod auth_event_service;
mod login_service;

#[cfg(test)]
mod test_support;

pub use attempt_tracker::{AttemptStore, AttemptTracker, RateLimitError};
pub use auth_event_service::{AuthEvent, AuthEventKind, AuthEventRepository, AuthEventService};
pub use login_service::{
    CredentialVerifier, LoginAttempt, LoginOutcome, LoginService, PasswordHasher, UserRecord,
};
