// Session module
// Process-wide authentication state and the store that owns it

mod store;
mod types;

pub use store::{IgnoreReason, Outcome, SessionStore, SubscriptionId, Transition};
pub use types::{
    AccountType, Attempt, AttemptKind, AuthMethod, AuthPayload, Profile, Session, SessionEvent,
};
