// Guided tour
// The tour bundle loads in the background; a failed load withdraws the intro
// dialog and tells the user

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::sinks::{Notice, Sinks, StringKey};

/// Intro dialog and background bundle loading for the guided tour
pub struct Tour {
    sinks: Sinks,
    loaded: AtomicBool,
}

impl Tour {
    pub fn new(sinks: Sinks) -> Self {
        Self {
            sinks,
            loaded: AtomicBool::new(false),
        }
    }

    pub fn show_intro(&self) {
        self.sinks.tour_dialog.set_visible(true);
    }

    pub fn hide_intro(&self) {
        self.sinks.tour_dialog.set_visible(false);
    }

    /// True once a bundle load has succeeded
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Run `loader` as its own task. Callers need not await the handle.
    pub fn load_bundle<F, E>(self: &Arc<Self>, loader: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            match loader.await {
                Ok(()) => {
                    this.loaded.store(true, Ordering::SeqCst);
                    tracing::info!("Tour bundle loaded");
                }
                Err(e) => {
                    tracing::warn!("Failed to load tour bundle: {}", e);
                    this.hide_intro();
                    this.sinks
                        .notifier
                        .notify(Notice::error(this.sinks.strings.get(StringKey::TourLoadFailed)));
                }
            }
        })
    }
}
