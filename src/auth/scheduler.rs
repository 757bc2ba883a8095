// Refresh timer
// Holds at most one pending refresh; arming replaces whatever was armed before

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

struct Armed {
    deadline: DateTime<Utc>,
    handle: JoinHandle<()>,
}

/// Single-slot timer for the silent refresh chain
#[derive(Default)]
pub struct RefreshScheduler {
    slot: Mutex<Option<Armed>>,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `on_fire` for `at`, cancelling any timer armed earlier.
    ///
    /// `on_fire` runs as its own task, so it may re-arm this scheduler without
    /// cancelling itself. A deadline in the past fires immediately.
    pub fn arm<F>(&self, at: DateTime<Utc>, on_fire: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        tracing::debug!(
            deadline = %at.to_rfc3339(),
            delay_secs = delay.as_secs(),
            "Arming refresh timer"
        );

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::debug!("Refresh timer fired");
            tokio::spawn(on_fire);
        });

        let previous = self.lock().replace(Armed {
            deadline: at,
            handle,
        });
        if let Some(previous) = previous {
            previous.handle.abort();
        }
    }

    /// Drop the pending timer, if any. Returns whether one was still waiting.
    pub fn cancel(&self) -> bool {
        match self.lock().take() {
            Some(armed) => {
                let pending = !armed.handle.is_finished();
                armed.handle.abort();
                if pending {
                    tracing::debug!("Refresh timer cancelled");
                }
                pending
            }
            None => false,
        }
    }

    /// Deadline of the timer that has not fired yet
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.lock()
            .as_ref()
            .filter(|armed| !armed.handle.is_finished())
            .map(|armed| armed.deadline)
    }

    pub fn is_armed(&self) -> bool {
        self.deadline().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Armed>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Some(armed) = self.lock().take() {
            armed.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::Instant;

    type Fires = Arc<Mutex<Vec<(&'static str, Duration)>>>;

    fn record(fires: &Fires, label: &'static str, start: Instant) -> impl Future<Output = ()> {
        let fires = Arc::clone(fires);
        async move {
            fires.lock().unwrap().push((label, start.elapsed()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_at_deadline() {
        let scheduler = RefreshScheduler::new();
        let fires: Fires = Arc::default();
        let start = Instant::now();

        scheduler.arm(
            Utc::now() + chrono::Duration::seconds(3600),
            record(&fires, "only", start),
        );
        assert!(scheduler.is_armed());

        tokio::time::sleep(Duration::from_secs(3601)).await;

        let fires = fires.lock().unwrap();
        assert_eq!(fires.len(), 1);
        assert!(fires[0].1 >= Duration::from_secs(3599));
        assert!(fires[0].1 <= Duration::from_secs(3601));
        assert!(!scheduler.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_pending_timer() {
        let scheduler = RefreshScheduler::new();
        let fires: Fires = Arc::default();
        let start = Instant::now();
        let now = Utc::now();

        scheduler.arm(now + chrono::Duration::seconds(100), record(&fires, "first", start));
        let second = now + chrono::Duration::seconds(200);
        scheduler.arm(second, record(&fires, "second", start));
        assert_eq!(scheduler.deadline(), Some(second));

        tokio::time::sleep(Duration::from_secs(300)).await;

        let fires = fires.lock().unwrap();
        assert_eq!(fires.len(), 1);
        assert_eq!(fires[0].0, "second");
        assert!(fires[0].1 >= Duration::from_secs(199));
        assert!(fires[0].1 <= Duration::from_secs(201));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_fire() {
        let scheduler = RefreshScheduler::new();
        let fires: Fires = Arc::default();
        let start = Instant::now();

        scheduler.arm(Utc::now() + chrono::Duration::seconds(10), record(&fires, "x", start));
        assert!(scheduler.cancel());
        assert!(!scheduler.cancel());

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(fires.lock().unwrap().is_empty());
        assert_eq!(scheduler.deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_past_deadline_fires_immediately() {
        let scheduler = RefreshScheduler::new();
        let fires: Fires = Arc::default();
        let start = Instant::now();

        scheduler.arm(Utc::now() - chrono::Duration::seconds(5), record(&fires, "late", start));
        tokio::time::sleep(Duration::from_millis(1)).await;

        let fires = fires.lock().unwrap();
        assert_eq!(fires.len(), 1);
        assert!(fires[0].1 <= Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fired_callback_can_rearm() {
        let scheduler = Arc::new(RefreshScheduler::new());
        let fires: Fires = Arc::default();
        let start = Instant::now();

        let chained = Arc::clone(&scheduler);
        let next = record(&fires, "chained", start);
        scheduler.arm(Utc::now() + chrono::Duration::seconds(10), async move {
            chained.arm(Utc::now() + chrono::Duration::seconds(10), next);
        });

        tokio::time::sleep(Duration::from_secs(30)).await;

        let fires = fires.lock().unwrap();
        assert_eq!(fires.len(), 1);
        assert_eq!(fires[0].0, "chained");
    }
}
