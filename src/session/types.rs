// Session types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the current session was established
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Email and password against our own API
    Default,
    Google,
    Facebook,
    Github,
}

impl AuthMethod {
    /// Whether signing out also needs the third-party identity provider
    pub fn is_vendor(&self) -> bool {
        !matches!(self, AuthMethod::Default)
    }
}

/// Account tier reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    #[default]
    User,
    Admin,
    Superuser,
}

/// User profile attached to an authenticated session
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub country: String,
    pub region: String,
    pub profile_image: String,
    pub date_created: String,
    pub date_expires: String,
    pub account_type: AccountType,
    pub num_rows_generated: u64,
}

/// Everything needed to move a session into the authenticated state
#[derive(Debug, Clone, PartialEq)]
pub struct AuthPayload {
    pub auth_method: Option<AuthMethod>,
    pub token: String,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub profile: Profile,
}

/// Which lifecycle operation an in-flight marker belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptKind {
    Login,
    Refresh,
    Logout,
}

/// Ticket handed out when an operation starts; results carry it back to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    pub kind: AttemptKind,
    pub(crate) generation: u64,
}

/// Discrete state transitions accepted by the session store
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    AuthStarted(AttemptKind),
    AuthSucceeded {
        attempt: Attempt,
        payload: AuthPayload,
    },
    AuthFailed {
        attempt: Attempt,
    },
    LoggedOut,
    TokenRefreshed {
        attempt: Attempt,
        token: String,
        token_expires_at: Option<DateTime<Utc>>,
        profile: Option<Profile>,
    },
    AuthResolved,
}

impl SessionEvent {
    /// Stable name for logging
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::AuthStarted(_) => "auth_started",
            SessionEvent::AuthSucceeded { .. } => "auth_succeeded",
            SessionEvent::AuthFailed { .. } => "auth_failed",
            SessionEvent::LoggedOut => "logged_out",
            SessionEvent::TokenRefreshed { .. } => "token_refreshed",
            SessionEvent::AuthResolved => "auth_resolved",
        }
    }

    pub(crate) fn attempt(&self) -> Option<&Attempt> {
        match self {
            SessionEvent::AuthSucceeded { attempt, .. }
            | SessionEvent::AuthFailed { attempt }
            | SessionEvent::TokenRefreshed { attempt, .. } => Some(attempt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct InFlight {
    pub login: u32,
    pub refresh: u32,
    pub logout: u32,
}

impl InFlight {
    pub(crate) fn slot(&mut self, kind: AttemptKind) -> &mut u32 {
        match kind {
            AttemptKind::Login => &mut self.login,
            AttemptKind::Refresh => &mut self.refresh,
            AttemptKind::Logout => &mut self.logout,
        }
    }
}

/// In-memory authentication state for the lifetime of the process
///
/// Fields are only written by [`SessionStore`](super::SessionStore), which keeps
/// `authenticated` consistent with `token` and `profile`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Session {
    pub(crate) authenticated: bool,
    pub(crate) auth_method: Option<AuthMethod>,
    pub(crate) token: Option<String>,
    pub(crate) token_expires_at: Option<DateTime<Utc>>,
    pub(crate) profile: Option<Profile>,
    pub(crate) auth_resolved: bool,
    pub(crate) in_flight: InFlight,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn auth_method(&self) -> Option<AuthMethod> {
        self.auth_method
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.token_expires_at
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// True once the initial refresh attempt has settled
    pub fn is_auth_resolved(&self) -> bool {
        self.auth_resolved
    }

    pub fn is_logging_in(&self) -> bool {
        self.in_flight.login > 0
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_flight.refresh > 0
    }

    pub fn is_logging_out(&self) -> bool {
        self.in_flight.logout > 0
    }

    pub(crate) fn clear_credentials(&mut self) {
        self.authenticated = false;
        self.auth_method = None;
        self.token = None;
        self.token_expires_at = None;
        self.profile = None;
    }
}
