//! Debounced "data changed" notification
//!
//! The first change after a quiet period arms a single-shot deadline; changes
//! arriving while armed are absorbed. When the deadline passes the pending flag
//! is cleared under the same lock the update path uses and exactly one
//! notification fires.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Coalesces cache changes into at most one notification per interval
pub struct ChangeNotifier {
    pending: Mutex<bool>,
    armed: Notify,
    interval: Duration,
    fired: AtomicU64,
}

impl ChangeNotifier {
    pub fn new(interval: Duration) -> Self {
        Self {
            pending: Mutex::new(false),
            armed: Notify::new(),
            interval,
            fired: AtomicU64::new(0),
        }
    }

    /// Record a change. Returns true when this call armed the deadline.
    #[inline]
    pub fn mark_changed(&self) -> bool {
        let mut pending = self.pending.lock();
        if *pending {
            return false;
        }
        *pending = true;
        // Stores a permit if the timer task is not waiting yet
        self.armed.notify_one();
        true
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        *self.pending.lock()
    }

    /// Notifications fired so far
    pub fn fired(&self) -> u64 {
        self.fired.load(Ordering::Relaxed)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Timer loop; calls `on_fire` once per armed interval
    ///
    /// Runs until the task is aborted.
    pub async fn run<F>(&self, on_fire: F)
    where
        F: Fn(),
    {
        loop {
            self.armed.notified().await;
            tokio::time::sleep(self.interval).await;
            {
                let mut pending = self.pending.lock();
                if !*pending {
                    continue;
                }
                *pending = false;
            }
            self.fired.fetch_add(1, Ordering::Relaxed);
            on_fire();
        }
    }
}
