// Session store
// Applies lifecycle events to the single Session and fans transitions out to subscribers

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::types::{Attempt, AttemptKind, Session, SessionEvent};

/// A transition as seen by subscribers
#[derive(Debug, Clone, Copy)]
pub struct Transition<'a> {
    pub event: &'a SessionEvent,
    pub session: &'a Session,
    /// Increases by one for every applied event
    pub revision: u64,
}

/// Why an event was dropped without a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The attempt started before a logout that has since completed
    Stale,
    /// The event does not fit the current state (e.g. token refresh while anonymous)
    Incompatible,
    /// Auth resolution already happened during this process lifetime
    AlreadyResolved,
}

/// Result of handing an event to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied { revision: u64 },
    Ignored(IgnoreReason),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied { .. })
    }
}

/// Handle returned by [`SessionStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Arc<dyn Fn(&Transition<'_>) + Send + Sync>;

struct StoreState {
    session: Session,
    revision: u64,
    /// Bumped on every logout; results from older attempts are stale
    generation: u64,
}

/// Owner of the process-wide [`Session`]
pub struct SessionStore {
    state: Mutex<StoreState>,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
    next_subscription: AtomicU64,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState {
                session: Session::default(),
                revision: 0,
                generation: 0,
            }),
            subscribers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
        }
    }

    /// Current session snapshot
    pub fn snapshot(&self) -> Session {
        self.lock_state().session.clone()
    }

    /// Number of transitions applied so far
    pub fn revision(&self) -> u64 {
        self.lock_state().revision
    }

    /// Register a callback invoked synchronously after every applied event.
    /// Callbacks may read the store but must not subscribe or unsubscribe.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Transition<'_>) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        let subscriber: Subscriber = Arc::new(callback);
        self.lock_subscribers().push((id, subscriber));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.lock_subscribers();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Mark an operation as in flight and hand out the ticket its result must carry
    pub fn begin(&self, kind: AttemptKind) -> Attempt {
        let (attempt, _) = self.apply_inner(SessionEvent::AuthStarted(kind));
        attempt.unwrap_or(Attempt {
            kind,
            generation: 0,
        })
    }

    /// Apply a single event
    pub fn apply(&self, event: SessionEvent) -> Outcome {
        self.apply_inner(event).1
    }

    fn apply_inner(&self, event: SessionEvent) -> (Option<Attempt>, Outcome) {
        let (attempt, outcome, snapshot) = {
            let mut state = self.lock_state();
            let mut started = None;
            let outcome = match transition(&mut state, &event) {
                Ok(()) => {
                    state.revision += 1;
                    if let SessionEvent::AuthStarted(kind) = event {
                        started = Some(Attempt {
                            kind,
                            generation: state.generation,
                        });
                    }
                    Outcome::Applied {
                        revision: state.revision,
                    }
                }
                Err(reason) => Outcome::Ignored(reason),
            };
            (started, outcome, state.session.clone())
        };

        match outcome {
            Outcome::Applied { revision } => {
                tracing::debug!(event = event.name(), revision, "Session transition");
                let transition = Transition {
                    event: &event,
                    session: &snapshot,
                    revision,
                };
                let subscribers: Vec<Subscriber> = self
                    .lock_subscribers()
                    .iter()
                    .map(|(_, s)| Arc::clone(s))
                    .collect();
                for subscriber in subscribers {
                    subscriber(&transition);
                }
            }
            Outcome::Ignored(reason) => {
                tracing::debug!(event = event.name(), reason = ?reason, "Session event ignored");
            }
        }

        (attempt, outcome)
    }

    fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Subscriber)>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Apply `event` to `state`, or reject it without touching anything
fn transition(state: &mut StoreState, event: &SessionEvent) -> Result<(), IgnoreReason> {
    if let Some(attempt) = event.attempt() {
        if attempt.generation != state.generation {
            return Err(IgnoreReason::Stale);
        }
    }

    match event {
        SessionEvent::TokenRefreshed { .. } if !state.session.authenticated => {
            return Err(IgnoreReason::Incompatible);
        }
        SessionEvent::AuthResolved if state.session.auth_resolved => {
            return Err(IgnoreReason::AlreadyResolved);
        }
        _ => {}
    }

    if let Some(attempt) = event.attempt() {
        let slot = state.session.in_flight.slot(attempt.kind);
        *slot = slot.saturating_sub(1);
    }

    let session = &mut state.session;
    match event {
        SessionEvent::AuthStarted(kind) => {
            *session.in_flight.slot(*kind) += 1;
        }
        SessionEvent::AuthSucceeded { payload, .. } => {
            session.authenticated = true;
            session.auth_method = payload.auth_method;
            session.token = Some(payload.token.clone());
            session.token_expires_at = payload.token_expires_at;
            session.profile = Some(payload.profile.clone());
        }
        SessionEvent::AuthFailed { attempt } => {
            // A rejected login leaves an existing session alone
            if attempt.kind == AttemptKind::Refresh {
                session.clear_credentials();
            }
        }
        SessionEvent::TokenRefreshed {
            token,
            token_expires_at,
            profile,
            ..
        } => {
            session.token = Some(token.clone());
            session.token_expires_at = *token_expires_at;
            if let Some(profile) = profile {
                session.profile = Some(profile.clone());
            }
        }
        SessionEvent::LoggedOut => {
            session.clear_credentials();
            session.in_flight.login = 0;
            session.in_flight.refresh = 0;
            session.in_flight.logout = session.in_flight.logout.saturating_sub(1);
            state.generation += 1;
        }
        SessionEvent::AuthResolved => {
            session.auth_resolved = true;
        }
    }

    Ok(())
}
