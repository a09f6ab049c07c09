use serde::{Deserialize, Serialize};

/// User information persisted in the authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    subject: String,
    email: String,
}

impl UserIdentity {
    /// Creates a user identity from a verified login.
    #[must_use]
    pub fn new(subject: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            email: email.into(),
        }
    }

    /// Returns the stable subject (the user identifier).
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the canonical email the user logged in with.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }
}
