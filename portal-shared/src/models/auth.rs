use serde::{Deserialize, Serialize};

/// Response of `GET /auth/status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether the request carried a valid teacher session.
    pub authenticated: bool,

    /// Username bound to the session, `null` when logged out.
    #[serde(default)]
    pub username: Option<String>,
}

impl AuthStatus {
    /// Username of an authenticated session.
    ///
    /// Returns `None` when the backend reports `authenticated=false` or omits
    /// the username, since a session without a user cannot be represented.
    #[must_use]
    pub fn authenticated_user(&self) -> Option<&str> {
        if self.authenticated {
            self.username.as_deref().filter(|name| !name.is_empty())
        } else {
            None
        }
    }
}

/// Response body of `POST /login` and `POST /logout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResponse {
    /// Human-readable confirmation.
    #[serde(default)]
    pub message: String,

    /// Session state after the call.
    #[serde(default)]
    pub authenticated: bool,
}

/// Success body of the roster mutation endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Confirmation text shown to the user verbatim.
    pub message: String,
}

impl MessageResponse {
    /// Creates a response carrying `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
