//! Login orchestration: rate limit pre-check, credential verification,
//! failure accounting and audit events.
//!
//! Follows OWASP guidance: failures return one generic outcome whether the
//! email is unknown or the password is wrong.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use gatehouse_core::AppResult;
use gatehouse_domain::{AttemptKey, EmailAddress, FailureStanding, UserId};

use crate::{AttemptTracker, AuthEvent, AuthEventKind, AuthEventService, RateLimitError};


// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// User returned by a successful credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Unique user identifier.
    pub id: UserId,
    /// Canonical email address.
    pub email: String,
}

/// Port for checking an email and password pair.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Returns the user when the credentials match, `None` otherwise.
    ///
    /// Must take comparable time whether or not the email is known.
    async fn verify(&self, email: &EmailAddress, password: &str) -> AppResult<Option<UserRecord>>;
}

/// Port for password hashing operations. Keeps application free of direct
/// cryptographic library coupling.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plaintext password.
    fn hash_password(&self, password: &str) -> AppResult<String>;

    /// Verifies a plaintext password against a stored hash.
    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool>;
}

// ---------------------------------------------------------------------------
// Request and outcome types
// ---------------------------------------------------------------------------

/// One login request.
#[derive(Debug, Clone)]
pub struct LoginAttempt {
    /// Email as typed by the user.
    pub email: String,
    /// Plaintext password.
    pub password: String,
    /// Caller network origin, typically the client IP.
    pub origin: String,
    /// User-Agent header from the request (for audit logging).
    pub user_agent: Option<String>,
}

/// Result of a login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Credentials matched. A session can be established.
    Authenticated {
        /// The verified user.
        user: UserRecord,
        /// Attempts that were left before this login, when few remained.
        attempts_remaining: Option<u32>,
    },
    /// Credentials did not match. The failure has been counted.
    Failed {
        /// Standing of the key after counting this failure.
        standing: FailureStanding,
    },
    /// Rejected before credentials were checked.
    Blocked {
        /// Window length to quote to the user.
        window_minutes: u32,
    },
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Application service for password login.
#[derive(Clone)]
pub struct LoginService {
    attempt_tracker: AttemptTracker,
    credential_verifier: Arc<dyn CredentialVerifier>,
    auth_event_service: AuthEventService,
}

impl LoginService {
    /// Creates a new login service.
    #[must_use]
    pub fn new(
        attempt_tracker: AttemptTracker,
        credential_verifier: Arc<dyn CredentialVerifier>,
        auth_event_service: AuthEventService,
    ) -> Self {
        Self {
            attempt_tracker,
            credential_verifier,
            auth_event_service,
        }
    }

    /// Returns the attempt tracker used by this service.
    #[must_use]
    pub fn attempt_tracker(&self) -> &AttemptTracker {
        &self.attempt_tracker
    }

    /// Authenticates a user with email and password at the current time.
    pub async fn login(&self, attempt: LoginAttempt) -> AppResult<LoginOutcome> {
        self.login_at(attempt, Utc::now()).await
    }

    /// Authenticates a user with email and password at `now`.
    ///
    /// Blocked keys never reach the credential verifier. Every credential
    /// mismatch increments the attempt counter exactly once; successes never
    /// do.
    pub async fn login_at(
        &self,
        attempt: LoginAttempt,
        now: DateTime<Utc>,
    ) -> AppResult<LoginOutcome> {
        let key = AttemptKey::new(&attempt.origin, &attempt.email)?;

        let attempts_remaining = match self.attempt_tracker.check_rate_limit_at(&key, now).await {
            Ok(()) => None,
            Err(RateLimitError::AttemptsRemainingWarning { remaining }) => Some(remaining),
            Err(RateLimitError::TooManyAttempts { window_minutes }) => {
                info!(origin = key.origin(), "login attempt rejected by rate limit");
                self.audit(&key, &attempt, AuthEventKind::LoginBlocked, None)
                    .await;

                return Ok(LoginOutcome::Blocked { window_minutes });
            }
        };

        let user = match EmailAddress::new(attempt.email.as_str()) {
            Ok(email) => {
                self.credential_verifier
                    .verify(&email, &attempt.password)
                    .await?
            }
            Err(_) => None,
        };

        let Some(user) = user else {
            let attempt_count = self.attempt_tracker.increment_attempt(&key, now).await;
            let standing =
                FailureStanding::from_attempts(self.attempt_tracker.policy(), attempt_count);

            self.audit(
                &key,
                &attempt,
                AuthEventKind::LoginFailed,
                Some(attempt_count),
            )
            .await;

            return Ok(LoginOutcome::Failed { standing });
        };

        self.audit(&key, &attempt, AuthEventKind::LoginSucceeded, None)
            .await;

        Ok(LoginOutcome::Authenticated {
            user,
            attempts_remaining,
        })
    }

    async fn audit(
        &self,
        key: &AttemptKey,
        attempt: &LoginAttempt,
        kind: AuthEventKind,
        attempt_count: Option<u32>,
    ) {
        self.auth_event_service
            .record_event_best_effort(AuthEvent {
                subject: Some(key.identifier().to_owned()),
                kind,
                ip_address: Some(key.origin().to_owned()),
                user_agent: attempt.user_agent.clone(),
                attempt_count,
            })
            .await;
    }
}
