// Post-login flow coordination
// Remembers why a login was started and resumes that action once it succeeds

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::types::LoginOrigin;
use crate::sinks::{Notice, Sinks, StringKey};

/// Return the user to the save-data-set dialog after logging in
pub const RESUME_SAVE_DATA_SET: &str = "fromSaveDataSet";

type ResumeAction = Arc<dyn Fn() + Send + Sync>;

/// Owner of the pending-flow tag and the post-login UI sequence
pub struct FlowCoordinator {
    pending: Mutex<Option<String>>,
    resumes: Mutex<HashMap<String, ResumeAction>>,
    sinks: Sinks,
}

impl FlowCoordinator {
    pub fn new(sinks: Sinks) -> Self {
        Self {
            pending: Mutex::new(None),
            resumes: Mutex::new(HashMap::new()),
            sinks,
        }
    }

    /// Register the action run when a login completes with `tag` pending
    pub fn register_resume<F>(&self, tag: impl Into<String>, action: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.lock_resumes().insert(tag.into(), Arc::new(action));
    }

    /// Record intent before sending the user to authenticate
    pub fn mark_pending(&self, tag: impl Into<String>) {
        let tag = tag.into();
        tracing::debug!(tag = %tag, "Pending login flow set");
        *self.lock_pending() = Some(tag);
    }

    /// Show the login prompt, optionally remembering what to resume afterwards
    pub fn prompt_login(&self, resume: Option<&str>) {
        if let Some(tag) = resume {
            self.mark_pending(tag);
        }
        self.sinks.dialog.set_visible(true);
    }

    pub fn pending(&self) -> Option<String> {
        self.lock_pending().clone()
    }

    /// Read and clear the pending tag in one step
    pub fn take_pending(&self) -> Option<String> {
        self.lock_pending().take()
    }

    pub fn clear(&self) {
        self.lock_pending().take();
    }

    /// Post-login UI: dismiss the prompt, and for user-initiated logins show the
    /// confirmation and resume the pending flow
    pub fn on_login_success(&self, origin: LoginOrigin) {
        self.sinks.dialog.set_visible(false);

        if origin == LoginOrigin::PageLoad {
            return;
        }

        self.sinks
            .notifier
            .notify(Notice::success(self.sinks.strings.get(StringKey::NowLoggedIn)));

        let Some(tag) = self.take_pending() else {
            return;
        };

        let action = self.lock_resumes().get(&tag).cloned();
        match action {
            Some(action) => {
                tracing::info!(tag = %tag, "Resuming pending flow after login");
                action();
            }
            None => tracing::warn!(tag = %tag, "No resume action registered for pending flow"),
        }
    }

    fn lock_pending(&self) -> MutexGuard<'_, Option<String>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_resumes(&self) -> MutexGuard<'_, HashMap<String, ResumeAction>> {
        self.resumes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::{LoginDialog, Notifier};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Recorder {
        notices: Mutex<Vec<Notice>>,
        dialog: Mutex<Vec<bool>>,
    }

    impl Notifier for Recorder {
        fn notify(&self, notice: Notice) {
            self.notices.lock().unwrap().push(notice);
        }
    }

    impl LoginDialog for Recorder {
        fn set_visible(&self, visible: bool) {
            self.dialog.lock().unwrap().push(visible);
        }
    }

    fn coordinator() -> (FlowCoordinator, Arc<Recorder>, Arc<AtomicUsize>) {
        let recorder = Arc::new(Recorder::default());
        let sinks = Sinks::default()
            .with_notifier(recorder.clone())
            .with_dialog(recorder.clone());
        let flow = FlowCoordinator::new(sinks);

        let resumed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&resumed);
        flow.register_resume(RESUME_SAVE_DATA_SET, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        (flow, recorder, resumed)
    }

    #[test]
    fn test_user_login_resumes_once() {
        let (flow, recorder, resumed) = coordinator();
        flow.mark_pending(RESUME_SAVE_DATA_SET);

        flow.on_login_success(LoginOrigin::User);
        flow.on_login_success(LoginOrigin::User);

        assert_eq!(resumed.load(Ordering::SeqCst), 1);
        assert_eq!(flow.pending(), None);
        assert_eq!(recorder.notices.lock().unwrap().len(), 2);
        assert_eq!(
            recorder.notices.lock().unwrap()[0].message,
            "You are now logged in."
        );
    }

    #[test]
    fn test_page_load_login_is_silent() {
        let (flow, recorder, resumed) = coordinator();
        flow.mark_pending(RESUME_SAVE_DATA_SET);

        flow.on_login_success(LoginOrigin::PageLoad);

        assert_eq!(resumed.load(Ordering::SeqCst), 0);
        assert!(recorder.notices.lock().unwrap().is_empty());
        assert_eq!(*recorder.dialog.lock().unwrap(), vec![false]);
        // The tag survives for a later interactive login
        assert_eq!(flow.pending().as_deref(), Some(RESUME_SAVE_DATA_SET));
    }

    #[test]
    fn test_no_tag_no_resume() {
        let (flow, _recorder, resumed) = coordinator();
        flow.on_login_success(LoginOrigin::User);
        assert_eq!(resumed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unknown_tag_is_dropped() {
        let (flow, _recorder, resumed) = coordinator();
        flow.mark_pending("fromSomewhereElse");
        flow.on_login_success(LoginOrigin::User);
        assert_eq!(resumed.load(Ordering::SeqCst), 0);
        assert_eq!(flow.pending(), None);
    }

    #[test]
    fn test_prompt_login_marks_and_shows() {
        let (flow, recorder, _resumed) = coordinator();
        flow.prompt_login(Some(RESUME_SAVE_DATA_SET));

        assert_eq!(flow.pending().as_deref(), Some(RESUME_SAVE_DATA_SET));
        assert_eq!(*recorder.dialog.lock().unwrap(), vec![true]);

        flow.clear();
        assert_eq!(flow.take_pending(), None);
    }
}
