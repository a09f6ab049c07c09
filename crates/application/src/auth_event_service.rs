use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use gatehouse_core::AppResult;

/// Stable auth event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEventKind {
    /// Credentials matched.
    LoginSucceeded,
    /// Credentials did not match and the failure was counted.
    LoginFailed,
    /// Rejected by the rate limit before credentials were checked.
    LoginBlocked,
    /// Session ended by the user.
    Logout,
}

impl AuthEventKind {
    /// Returns the stable storage label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoginSucceeded => "login_succeeded",
            Self::LoginFailed => "login_failed",
            Self::LoginBlocked => "login_blocked",
            Self::Logout => "logout",
        }
    }
}

/// Authentication event payload for security analytics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    /// Claimed or verified identity, if available.
    pub subject: Option<String>,
    /// Event type.
    pub kind: AuthEventKind,
    /// Caller IP address if available.
    pub ip_address: Option<String>,
    /// Caller user-agent if available.
    pub user_agent: Option<String>,
    /// Failed attempts in the current window at the time of the event.
    pub attempt_count: Option<u32>,
}

/// Repository port for auth event persistence.
#[async_trait]
pub trait AuthEventRepository: Send + Sync {
    /// Appends an auth event entry.
    async fn append_event(&self, event: AuthEvent) -> AppResult<()>;
}

/// Application service for auth event recording.
#[derive(Clone)]
pub struct AuthEventService {
    repository: Arc<dyn AuthEventRepository>,
}

impl AuthEventService {
    /// Creates a service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn AuthEventRepository>) -> Self {
        Self { repository }
    }

    /// Persists an auth event.
    pub async fn record_event(&self, event: AuthEvent) -> AppResult<()> {
        self.repository.append_event(event).await
    }

    /// Persists an auth event, logging and dropping any failure.
    pub async fn record_event_best_effort(&self, event: AuthEvent) {
        let kind = event.kind;
        if let Err(error) = self.repository.append_event(event).await {
            warn!(
                event_type = kind.as_str(),
                error = %error,
                "failed to record auth event"
            );
        }
    }
}
