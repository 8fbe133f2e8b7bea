//! Single-shot inactivity reminders, at most one pending per session.
//!
//! Scheduling is cancel-and-replace: a new reminder for a key cancels the
//! pending one. Any inbound activity cancels outright. Firing removes the
//! reminder before running its callback and never reschedules.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use {
    dashmap::DashMap,
    futures::future::BoxFuture,
    tokio::time::Duration,
    tokio_util::sync::CancellationToken,
    tracing::{debug, warn},
};

/// Callback run when a reminder fires.
pub type ReminderFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

struct Pending {
    id: u64,
    token: CancellationToken,
}

/// Per-session reminder timers.
pub struct ReminderScheduler {
    pending: DashMap<String, Pending>,
    next_id: AtomicU64,
}

impl ReminderScheduler {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pending: DashMap::new(),
            next_id: AtomicU64::new(0),
        })
    }

    /// Schedule a reminder for `key`, replacing any pending one.
    ///
    /// After `delay` the reminder removes itself and runs `on_fire`, unless
    /// it was cancelled or replaced first.
    pub fn schedule(self: &Arc<Self>, key: &str, delay: Duration, on_fire: ReminderFn) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let token = CancellationToken::new();

        if let Some(previous) = self.pending.insert(key.to_string(), Pending {
            id,
            token: token.clone(),
        }) {
            previous.token.cancel();
            debug!(session = key, "replaced pending reminder");
        }

        let scheduler = Arc::clone(self);
        let key = key.to_string();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    // Remove only if this timer is still the registered one;
                    // a replacement may have raced ahead of the cancel.
                    let owned = scheduler
                        .pending
                        .remove_if(&key, |_, pending| pending.id == id)
                        .is_some();
                    if owned {
                        debug!(session = %key, "reminder fired");
                        on_fire().await;
                    }
                }
            }
        });
    }

    /// Cancel the pending reminder for `key`, if any. Idempotent.
    pub fn cancel(&self, key: &str) {
        if let Some((_, pending)) = self.pending.remove(key) {
            pending.token.cancel();
            debug!(session = key, "cancelled pending reminder");
        }
    }

    /// Cancel everything. Used on shutdown.
    pub fn cancel_all(&self) {
        let count = self.pending.len();
        self.pending.retain(|_, pending| {
            pending.token.cancel();
            false
        });
        if count > 0 {
            warn!(count, "cancelled all pending reminders");
        }
    }

    #[must_use]
    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn counting_fire(counter: Arc<AtomicUsize>) -> ReminderFn {
        Arc::new(move || {
            let c = Arc::clone(&counter);
            Box::pin(async move {
                c.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    #[tokio::test]
    async fn fires_once_and_clears_itself() {
        let scheduler = ReminderScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));
        scheduler.schedule("k", Duration::from_millis(20), counting_fire(fired.clone()));
        assert!(scheduler.is_pending("k"));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_pending("k"));
    }

    #[tokio::test]
    async fn cancel_prevents_firing() {
        let scheduler = ReminderScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));
        scheduler.schedule("k", Duration::from_millis(30), counting_fire(fired.clone()));
        scheduler.cancel("k");

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(scheduler.is_empty());
    }

    #[tokio::test]
    async fn cancel_without_pending_is_a_noop() {
        let scheduler = ReminderScheduler::new();
        scheduler.cancel("nope");
        assert!(scheduler.is_empty());
    }

    #[tokio::test]
    async fn reschedule_replaces_the_pending_timer() {
        let scheduler = ReminderScheduler::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        scheduler.schedule("k", Duration::from_millis(30), counting_fire(first.clone()));
        scheduler.schedule("k", Duration::from_millis(30), counting_fire(second.clone()));
        assert_eq!(scheduler.len(), 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_are_independent() {
        let scheduler = ReminderScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));
        scheduler.schedule("a", Duration::from_millis(20), counting_fire(fired.clone()));
        scheduler.schedule("b", Duration::from_millis(20), counting_fire(fired.clone()));
        scheduler.cancel("a");

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_all_clears_everything() {
        let scheduler = ReminderScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));
        scheduler.schedule("a", Duration::from_millis(30), counting_fire(fired.clone()));
        scheduler.schedule("b", Duration::from_millis(30), counting_fire(fired.clone()));
        scheduler.cancel_all();
        assert!(scheduler.is_empty());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
