// Authentication types

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::AuthError;
use crate::session::{AccountType, AuthMethod, AuthPayload, Profile};

/// Why a login reached the success handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOrigin {
    /// A still-valid session was picked up while the page loaded; no toast, no resume
    PageLoad,
    /// The user actively authenticated
    User,
}

/// Result of a login attempt that reached the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    LoggedIn,
    /// Bad credentials; the caller's error callback has been invoked
    Rejected,
    /// A logout completed while the request was in flight
    Superseded,
}

/// Result of a silent refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed,
    /// No valid session; the session is now anonymous
    Denied,
    /// A logout completed while the request was in flight
    Stale,
}

/// `login` / `refreshToken` mutation result
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(default)]
    pub success: bool,
    pub token: Option<String>,
    /// Unix timestamp in seconds
    pub token_expiry: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub profile_image: Option<String>,
    pub date_created: Option<String>,
    pub date_expires: Option<String>,
    pub account_type: Option<AccountType>,
    pub num_rows_generated: Option<u64>,
}

impl AuthResponse {
    /// Token expiry, if the server sent one. Zero means "never expires".
    pub fn expires_at(&self) -> Result<Option<DateTime<Utc>>, AuthError> {
        match self.token_expiry {
            None | Some(0) => Ok(None),
            Some(secs) if secs < 0 => Err(AuthError::MalformedResponse(format!(
                "tokenExpiry must be positive: {}",
                secs
            ))),
            Some(secs) => DateTime::from_timestamp(secs, 0).map(Some).ok_or_else(|| {
                AuthError::MalformedResponse(format!("tokenExpiry out of range: {}", secs))
            }),
        }
    }

    /// Build the session payload for a successful response
    pub fn into_payload(self, auth_method: Option<AuthMethod>) -> Result<AuthPayload, AuthError> {
        let token_expires_at = self.expires_at()?;
        let token = self
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::MalformedResponse("missing token".to_string()))?;

        Ok(AuthPayload {
            auth_method,
            token,
            token_expires_at,
            profile: Profile {
                first_name: self.first_name.unwrap_or_default(),
                last_name: self.last_name.unwrap_or_default(),
                email: self.email.unwrap_or_default(),
                country: self.country.unwrap_or_default(),
                region: self.region.unwrap_or_default(),
                profile_image: self.profile_image.unwrap_or_default(),
                date_created: self.date_created.unwrap_or_default(),
                date_expires: self.date_expires.unwrap_or_default(),
                account_type: self.account_type.unwrap_or_default(),
                num_rows_generated: self.num_rows_generated.unwrap_or_default(),
            },
        })
    }
}

/// `logout` mutation result
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogoutResponse {
    #[serde(default)]
    pub success: bool,
}
