// UI-facing collaborators
// Capabilities the session lifecycle drives but does not own: notices, dialogs,
// workspace state, third-party identity providers and localized strings

use std::sync::Arc;

use crate::session::AuthMethod;

/// Notice severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

/// A toast-style notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

/// Fire-and-forget notification sink
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Show/hide signal for the login prompt
pub trait LoginDialog: Send + Sync {
    fn set_visible(&self, visible: bool);
}

/// Show/hide signal for the tour intro dialog
pub trait TourDialog: Send + Sync {
    fn set_visible(&self, visible: bool);
}

/// Clears feature state (the generator grid) when the user logs out
pub trait Workspace: Send + Sync {
    fn reset(&self);
}

/// Vendor-specific sign-out (Google, Facebook, ...)
pub trait IdentityProvider: Send + Sync {
    fn sign_out(&self, method: AuthMethod);
}

/// Keys of the user-facing strings the lifecycle needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringKey {
    NowLoggedIn,
    NowLoggedOut,
    TourLoadFailed,
}

impl StringKey {
    /// Identifier used in locale files
    pub fn id(&self) -> &'static str {
        match self {
            StringKey::NowLoggedIn => "nowLoggedIn",
            StringKey::NowLoggedOut => "nowLoggedOut",
            StringKey::TourLoadFailed => "tourLoadFailed",
        }
    }

    /// English text used when a locale does not provide the key
    pub fn fallback(&self) -> &'static str {
        match self {
            StringKey::NowLoggedIn => "You are now logged in.",
            StringKey::NowLoggedOut => "You have been logged out.",
            StringKey::TourLoadFailed => "Sorry, there was a problem loading the tour.",
        }
    }
}

/// Localized-string provider
pub trait Strings: Send + Sync {
    fn get(&self, key: StringKey) -> String;
}

/// English strings
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStrings;

impl Strings for DefaultStrings {
    fn get(&self, key: StringKey) -> String {
        key.fallback().to_string()
    }
}

/// Writes notices to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.severity {
            Severity::Error => tracing::error!("{}", notice.message),
            Severity::Warning => tracing::warn!("{}", notice.message),
            Severity::Success | Severity::Info => tracing::info!("{}", notice.message),
        }
    }
}

/// Headless stand-in for the UI pieces
#[derive(Debug, Clone, Copy, Default)]
pub struct Headless;

impl LoginDialog for Headless {
    fn set_visible(&self, visible: bool) {
        tracing::debug!(visible, "Login dialog visibility changed");
    }
}

impl TourDialog for Headless {
    fn set_visible(&self, visible: bool) {
        tracing::debug!(visible, "Tour intro dialog visibility changed");
    }
}

impl Workspace for Headless {
    fn reset(&self) {
        tracing::debug!("Workspace cleared");
    }
}

impl IdentityProvider for Headless {
    fn sign_out(&self, method: AuthMethod) {
        if method.is_vendor() {
            tracing::info!(method = ?method, "Signed out of identity provider");
        }
    }
}

/// Bundle of collaborators handed to the gateway and coordinator
#[derive(Clone)]
pub struct Sinks {
    pub notifier: Arc<dyn Notifier>,
    pub dialog: Arc<dyn LoginDialog>,
    pub tour_dialog: Arc<dyn TourDialog>,
    pub workspace: Arc<dyn Workspace>,
    pub identity: Arc<dyn IdentityProvider>,
    pub strings: Arc<dyn Strings>,
}

impl Default for Sinks {
    fn default() -> Self {
        Self {
            notifier: Arc::new(LogNotifier),
            dialog: Arc::new(Headless),
            tour_dialog: Arc::new(Headless),
            workspace: Arc::new(Headless),
            identity: Arc::new(Headless),
            strings: Arc::new(DefaultStrings),
        }
    }
}

impl Sinks {
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_dialog(mut self, dialog: Arc<dyn LoginDialog>) -> Self {
        self.dialog = dialog;
        self
    }

    pub fn with_tour_dialog(mut self, tour_dialog: Arc<dyn TourDialog>) -> Self {
        self.tour_dialog = tour_dialog;
        self
    }

    pub fn with_workspace(mut self, workspace: Arc<dyn Workspace>) -> Self {
        self.workspace = workspace;
        self
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_strings(mut self, strings: Arc<dyn Strings>) -> Self {
        self.strings = strings;
        self
    }
}
