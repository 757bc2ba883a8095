// Authentication module
// Login, logout and the silent refresh chain

mod flow;
mod gateway;
mod scheduler;
mod types;

pub use flow::{FlowCoordinator, RESUME_SAVE_DATA_SET};
pub use gateway::AuthGateway;
pub use scheduler::RefreshScheduler;
pub use types::{AuthResponse, LoginOrigin, LoginOutcome, LogoutResponse, RefreshOutcome};
