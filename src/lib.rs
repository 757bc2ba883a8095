// gd-session - Library root

pub mod auth;
pub mod config;
pub mod error;
pub mod locale;
pub mod session;
pub mod sinks;
pub mod tour;
pub mod transport;
