use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use super::flow::FlowCoordinator;
use super::scheduler::RefreshScheduler;
use super::types::{AuthResponse, LoginOrigin, LoginOutcome, LogoutResponse, RefreshOutcome};
use crate::error::AuthError;
use crate::session::{Attempt, AttemptKind, AuthMethod, AuthPayload, Outcome, SessionEvent, SessionStore};
use crate::sinks::{Notice, Sinks, StringKey};
use crate::transport::{Operation, Transport};

/// Authentication gateway
/// Runs login, logout and silent refresh against the transport and keeps the
/// session store and refresh timer in step with the results
pub struct AuthGateway {
    /// Request layer
    transport: Arc<dyn Transport>,

    /// Session owner
    store: Arc<SessionStore>,

    /// Pending refresh timer
    scheduler: RefreshScheduler,

    /// Post-login UI sequencing
    flow: Arc<FlowCoordinator>,

    sinks: Sinks,

    /// How long before token expiry the silent refresh fires
    refresh_lead: Duration,
}

impl AuthGateway {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<SessionStore>,
        flow: Arc<FlowCoordinator>,
        sinks: Sinks,
    ) -> Self {
        Self {
            transport,
            store,
            scheduler: RefreshScheduler::new(),
            flow,
            sinks,
            refresh_lead: Duration::zero(),
        }
    }

    /// Fire the silent refresh `seconds` ahead of token expiry
    pub fn with_refresh_lead(mut self, seconds: u64) -> Self {
        self.refresh_lead = Duration::seconds(seconds as i64);
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn flow(&self) -> &Arc<FlowCoordinator> {
        &self.flow
    }

    /// When the next silent refresh is due
    pub fn next_refresh_at(&self) -> Option<DateTime<Utc>> {
        self.scheduler.deadline()
    }

    /// Email/password login. `on_error` is invoked once on any failure.
    pub async fn login<F>(
        self: &Arc<Self>,
        email: &str,
        password: &str,
        on_error: F,
    ) -> Result<LoginOutcome, AuthError>
    where
        F: FnOnce(&AuthError),
    {
        tracing::info!("Logging in as {}...", email);
        let attempt = self.store.begin(AttemptKind::Login);

        let operation = Operation::Login {
            email: email.to_string(),
            password: password.to_string(),
        };
        let payload = match self.call(operation).await {
            Ok(response) if response.success => response.into_payload(Some(AuthMethod::Default)),
            Ok(_) => {
                tracing::info!("Login rejected for {}", email);
                self.store.apply(SessionEvent::AuthFailed { attempt });
                on_error(&AuthError::Rejected);
                return Ok(LoginOutcome::Rejected);
            }
            Err(e) => Err(e),
        };

        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Login failed: {}", e);
                self.store.apply(SessionEvent::AuthFailed { attempt });
                on_error(&e);
                return Err(e);
            }
        };

        let expires_at = payload.token_expires_at;
        match self.store.apply(SessionEvent::AuthSucceeded { attempt, payload }) {
            Outcome::Applied { .. } => {
                tracing::info!("✅ Logged in as {}", email);
                self.on_login_success(expires_at, LoginOrigin::User);
                Ok(LoginOutcome::LoggedIn)
            }
            Outcome::Ignored(reason) => {
                tracing::warn!(reason = ?reason, "Login result arrived after logout, dropping");
                Ok(LoginOutcome::Superseded)
            }
        }
    }

    /// Finish a login obtained elsewhere (Google, Facebook, GitHub sign-in)
    pub fn complete_login(self: &Arc<Self>, payload: AuthPayload, origin: LoginOrigin) -> Outcome {
        let attempt = self.store.begin(AttemptKind::Login);
        let expires_at = payload.token_expires_at;
        let method = payload.auth_method;

        let outcome = self.store.apply(SessionEvent::AuthSucceeded { attempt, payload });
        if outcome.is_applied() {
            tracing::info!(method = ?method, origin = ?origin, "Login completed");
            self.on_login_success(expires_at, origin);
        }
        outcome
    }

    /// Arm the refresh chain and run the post-login UI
    pub fn on_login_success(self: &Arc<Self>, expires_at: Option<DateTime<Utc>>, origin: LoginOrigin) {
        self.rearm(expires_at);
        self.flow.on_login_success(origin);
    }

    /// Log out locally, then tell the server. The local logout always wins;
    /// the server call's outcome is only logged.
    pub async fn logout(&self) {
        self.store.begin(AttemptKind::Logout);

        if let Some(method) = self.store.snapshot().auth_method() {
            self.sinks.identity.sign_out(method);
        }

        self.store.apply(SessionEvent::LoggedOut);
        self.scheduler.cancel();
        self.flow.clear();
        self.sinks.workspace.reset();
        self.sinks
            .notifier
            .notify(Notice::success(self.sinks.strings.get(StringKey::NowLoggedOut)));
        tracing::info!("Logged out");

        match self.transport.execute(Operation::Logout).await {
            Ok(value) => {
                let response: LogoutResponse = serde_json::from_value(value).unwrap_or_default();
                tracing::debug!(success = response.success, "Server logout finished");
            }
            Err(e) => tracing::warn!("Server logout failed (ignored): {}", e),
        }
    }

    /// Silent token refresh.
    ///
    /// A denied refresh is the normal "not logged in" outcome and is returned as
    /// `Ok(RefreshOutcome::Denied)`. Transport failures also leave the session
    /// anonymous but are returned as errors. Auth resolution is marked either way.
    pub async fn refresh(self: &Arc<Self>) -> Result<RefreshOutcome, AuthError> {
        tracing::debug!("Refreshing session token...");
        let attempt = self.store.begin(AttemptKind::Refresh);

        let result = match self.call(Operation::RefreshToken).await {
            Ok(response) if response.success => self.apply_refresh(attempt, response),
            Ok(_) => Err(AuthError::RefreshDenied),
            Err(e) => Err(e),
        };

        let result = match result {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if self.store.apply(SessionEvent::AuthFailed { attempt }).is_applied() {
                    self.scheduler.cancel();
                }
                match e {
                    AuthError::RefreshDenied => {
                        tracing::info!("Token not refreshed: no valid session");
                        Ok(RefreshOutcome::Denied)
                    }
                    e => {
                        tracing::warn!("Token refresh failed: {}", e);
                        Err(e)
                    }
                }
            }
        };

        if self.store.apply(SessionEvent::AuthResolved).is_applied() {
            tracing::info!("Initial authentication state determined");
        }

        result
    }

    fn apply_refresh(
        self: &Arc<Self>,
        attempt: Attempt,
        response: AuthResponse,
    ) -> Result<RefreshOutcome, AuthError> {
        let current = self.store.snapshot();

        if current.is_authenticated() {
            let payload = response.into_payload(current.auth_method())?;
            let expires_at = payload.token_expires_at;
            let outcome = self.store.apply(SessionEvent::TokenRefreshed {
                attempt,
                token: payload.token,
                token_expires_at: expires_at,
                profile: Some(payload.profile),
            });
            if !outcome.is_applied() {
                // The session went anonymous meanwhile; close the attempt so the
                // in-flight marker clears. A stale attempt is ignored again.
                self.store.apply(SessionEvent::AuthFailed { attempt });
                return Ok(RefreshOutcome::Stale);
            }

            tracing::info!(
                "Token refreshed, expires: {}",
                expires_at.map(|t| t.to_rfc3339()).unwrap_or_else(|| "never".to_string())
            );
            self.rearm(expires_at);
            Ok(RefreshOutcome::Refreshed)
        } else {
            // Refresh on an anonymous session restores a still-valid login
            let payload = response.into_payload(None)?;
            let expires_at = payload.token_expires_at;
            let outcome = self.store.apply(SessionEvent::AuthSucceeded { attempt, payload });
            if !outcome.is_applied() {
                return Ok(RefreshOutcome::Stale);
            }

            tracing::info!("Existing session restored");
            self.on_login_success(expires_at, LoginOrigin::PageLoad);
            Ok(RefreshOutcome::Refreshed)
        }
    }

    /// Point the refresh timer at `expires_at`, or drop it when there is no expiry
    fn rearm(self: &Arc<Self>, expires_at: Option<DateTime<Utc>>) {
        let Some(expires_at) = expires_at else {
            self.scheduler.cancel();
            return;
        };

        let fire_at = expires_at
            .checked_sub_signed(self.refresh_lead)
            .unwrap_or_else(Utc::now);

        // The timer lives inside the gateway, so it must not keep the gateway alive
        let this = Arc::downgrade(self);
        self.scheduler.arm(fire_at, async move {
            let Some(this) = this.upgrade() else {
                return;
            };
            // Refresh success re-arms; the chain ends on logout or a failed refresh
            if let Err(e) = this.refresh().await {
                tracing::error!("Scheduled token refresh failed: {}", e);
            }
        });
    }

    async fn call(&self, operation: Operation) -> Result<AuthResponse, AuthError> {
        let value = self.transport.execute(operation).await?;
        serde_json::from_value(value)
            .map_err(|e| AuthError::MalformedResponse(format!("Failed to parse auth response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct Scripted(Mutex<VecDeque<Result<Value, TransportError>>>);

    #[async_trait]
    impl Transport for Scripted {
        async fn execute(&self, _operation: Operation) -> Result<Value, TransportError> {
            self.0
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(json!({"success": false})))
        }
    }

    fn gateway(responses: Vec<Result<Value, TransportError>>) -> Arc<AuthGateway> {
        let sinks = Sinks::default();
        Arc::new(AuthGateway::new(
            Arc::new(Scripted(Mutex::new(responses.into()))),
            Arc::new(SessionStore::new()),
            Arc::new(FlowCoordinator::new(sinks.clone())),
            sinks,
        ))
    }

    fn success(token: &str, expiry: i64) -> Result<Value, TransportError> {
        Ok(json!({
            "success": true,
            "token": token,
            "tokenExpiry": expiry,
            "email": "a@b.com"
        }))
    }

    #[tokio::test]
    async fn test_refresh_restores_session_and_resolves() {
        let expiry = Utc::now().timestamp() + 3600;
        let gateway = gateway(vec![success("tok1", expiry)]);

        let outcome = gateway.refresh().await.unwrap();

        assert_eq!(outcome, RefreshOutcome::Refreshed);
        let session = gateway.store().snapshot();
        assert!(session.is_authenticated());
        assert!(session.is_auth_resolved());
        assert_eq!(session.auth_method(), None);
        assert_eq!(gateway.next_refresh_at().unwrap().timestamp(), expiry);
    }

    #[tokio::test]
    async fn test_refresh_transport_failure_is_error_but_resolves() {
        let gateway = gateway(vec![Err(TransportError::Status {
            status: 500,
            message: "down".to_string(),
        })]);

        let err = gateway.refresh().await.unwrap_err();

        assert!(matches!(err, AuthError::Transport(_)));
        let session = gateway.store().snapshot();
        assert!(!session.is_authenticated());
        assert!(session.is_auth_resolved());
        assert!(!session.is_refreshing());
    }

    #[tokio::test]
    async fn test_refresh_lead_moves_deadline() {
        let expiry = Utc::now().timestamp() + 3600;
        let sinks = Sinks::default();
        let gateway = Arc::new(
            AuthGateway::new(
                Arc::new(Scripted(Mutex::new(vec![success("tok1", expiry)].into()))),
                Arc::new(SessionStore::new()),
                Arc::new(FlowCoordinator::new(sinks.clone())),
                sinks,
            )
            .with_refresh_lead(60),
        );

        gateway.refresh().await.unwrap();
        assert_eq!(gateway.next_refresh_at().unwrap().timestamp(), expiry - 60);
    }

    #[tokio::test]
    async fn test_success_without_expiry_arms_nothing() {
        let gateway = gateway(vec![Ok(json!({"success": true, "token": "tok1"}))]);

        gateway.login("a@b.com", "pw", |_| {}).await.unwrap();

        assert!(gateway.store().snapshot().is_authenticated());
        assert_eq!(gateway.next_refresh_at(), None);
    }

    #[tokio::test]
    async fn test_malformed_login_response_reports_error() {
        let gateway = gateway(vec![Ok(json!({"success": true}))]);
        let mut seen = None;

        let result = gateway
            .login("a@b.com", "pw", |e| seen = Some(e.clone()))
            .await;

        assert!(matches!(result, Err(AuthError::MalformedResponse(_))));
        assert!(matches!(seen, Some(AuthError::MalformedResponse(_))));
        assert!(!gateway.store().snapshot().is_logging_in());
    }

    #[tokio::test]
    async fn test_negative_expiry_is_rejected_without_panic() {
        let sinks = Sinks::default();
        let gateway = Arc::new(
            AuthGateway::new(
                Arc::new(Scripted(Mutex::new(
                    vec![Ok(json!({
                        "success": true,
                        "token": "t",
                        "tokenExpiry": -8_334_601_228_800_i64
                    }))]
                    .into(),
                ))),
                Arc::new(SessionStore::new()),
                Arc::new(FlowCoordinator::new(sinks.clone())),
                sinks,
            )
            .with_refresh_lead(60),
        );

        let result = gateway.login("a@b.com", "pw", |_| {}).await;

        assert!(matches!(result, Err(AuthError::MalformedResponse(_))));
        assert!(!gateway.store().snapshot().is_authenticated());
        assert_eq!(gateway.next_refresh_at(), None);
    }

    #[tokio::test]
    async fn test_earliest_expiry_with_lead_fires_now() {
        let sinks = Sinks::default();
        let gateway = Arc::new(
            AuthGateway::new(
                Arc::new(Scripted(Mutex::new(VecDeque::new()))),
                Arc::new(SessionStore::new()),
                Arc::new(FlowCoordinator::new(sinks.clone())),
                sinks,
            )
            .with_refresh_lead(60),
        );
        let before = Utc::now();

        gateway.complete_login(
            AuthPayload {
                auth_method: Some(AuthMethod::Github),
                token: "gh".to_string(),
                token_expires_at: Some(DateTime::<Utc>::MIN_UTC),
                profile: Default::default(),
            },
            LoginOrigin::User,
        );

        assert!(gateway.store().snapshot().is_authenticated());
        assert!(gateway.next_refresh_at().unwrap() >= before);
    }
}
