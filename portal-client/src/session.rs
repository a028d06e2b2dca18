//! Teacher session state machine.

use shared::models::AuthStatus;
use tracing::info;

/// Client view of the teacher session.
///
/// A user name exists only in [`SessionState::LoggedIn`], so "current user
/// is present iff authenticated" holds by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No teacher session. Also the fallback when the status query fails.
    #[default]
    LoggedOut,
    /// A teacher session bound to `username`.
    LoggedIn {
        /// Name the teacher logged in with.
        username: String,
    },
}

impl SessionState {
    /// Whether a teacher session is active.
    #[must_use]
    pub fn authenticated(&self) -> bool {
        matches!(self, Self::LoggedIn { .. })
    }

    /// Name of the logged-in teacher.
    #[must_use]
    pub fn current_user(&self) -> Option<&str> {
        match self {
            Self::LoggedIn { username } => Some(username),
            Self::LoggedOut => None,
        }
    }

    /// Initial state from the startup status query.
    ///
    /// A failed query or an authenticated answer without a user name both
    /// yield [`SessionState::LoggedOut`].
    #[must_use]
    pub fn from_status(status: Option<&AuthStatus>) -> Self {
        match status.and_then(AuthStatus::authenticated_user) {
            Some(username) => Self::LoggedIn {
                username: username.to_owned(),
            },
            None => Self::LoggedOut,
        }
    }

    /// The backend accepted a login for `username`.
    pub fn login_succeeded(&mut self, username: impl Into<String>) {
        let username = username.into();
        info!(%username, "teacher logged in");
        *self = Self::LoggedIn { username };
    }

    /// The backend confirmed the logout.
    pub fn logout_confirmed(&mut self) {
        if let Self::LoggedIn { username } = self {
            info!(%username, "teacher logged out");
        }
        *self = Self::LoggedOut;
    }

    /// A mutating call came back 401: the backend no longer recognises the
    /// session, whatever the client believed.
    pub fn unauthorized(&mut self) {
        if let Self::LoggedIn { username } = self {
            info!(%username, "session rejected by backend, forcing logout");
        }
        *self = Self::LoggedOut;
    }
}
