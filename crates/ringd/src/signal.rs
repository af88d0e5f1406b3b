//! "Token is mine" signal between the receive task and the logic task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

/// One-shot, level-triggered signal.
///
/// The flag is the source of truth: a raise that happens while the logic
/// task is busy stays set until the next `wait` consumes it. `Notify` only
/// shortens the wait and never stores a permit, so a raise consumed on the
/// fast path leaves nothing behind to cut the next wait short.
#[derive(Debug, Default)]
pub struct TokenSignal {
    raised: AtomicBool,
    notify: Notify,
}

impl TokenSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Test-and-clear. True at most once per raise.
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::SeqCst)
    }

    /// Wait up to `timeout` for a raise and consume it.
    pub async fn wait(&self, timeout: Duration) -> bool {
        // Register before checking the flag so a raise in between still wakes us.
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.take() {
            return true;
        }
        let _ = tokio::time::timeout(timeout, notified).await;
        self.take()
    }
}
