// src/sync/waitgroup.rs

//! Plain join: "all finished" with a bounded wait, no error aggregation.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{info, warn};

#[derive(Debug, Default)]
struct Inner {
    pending: AtomicUsize,
    zero: Notify,
}

/// Counter of outstanding tasks that can be awaited with a deadline.
///
/// Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct WaitGroup {
    inner: Arc<Inner>,
}

impl WaitGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, n: usize) {
        self.inner.pending.fetch_add(n, Ordering::AcqRel);
    }

    /// Mark one task as finished.
    ///
    /// Calling `done` more often than `add` saturates at zero.
    pub fn done(&self) {
        let prev = self
            .inner
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        match prev {
            Ok(1) => self.inner.zero.notify_waiters(),
            Ok(_) => {}
            Err(_) => warn!("wait group: done() called with no pending tasks"),
        }
    }

    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Spawn a counted task; it is marked done however it ends.
    pub fn spawn<F>(&self, fut: F) -> tokio::task::JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.add(1);
        let guard = DoneGuard(self.clone());
        tokio::spawn(async move {
            let _guard = guard;
            fut.await
        })
    }

    /// Wait until the count reaches zero.
    ///
    /// `None` or a zero duration waits without bound. Returns `false` if the
    /// deadline passed first; outstanding tasks keep running.
    pub async fn wait(&self, timeout: Option<Duration>) -> bool {
        match timeout.filter(|limit| !limit.is_zero()) {
            None => {
                self.wait_zero().await;
                true
            }
            Some(limit) => match tokio::time::timeout(limit, self.wait_zero()).await {
                Ok(()) => {
                    info!("wait group all finished");
                    true
                }
                Err(_) => {
                    warn!(
                        timeout_ms = limit.as_millis() as u64,
                        pending = self.pending(),
                        "wait group timeout"
                    );
                    false
                }
            },
        }
    }

    async fn wait_zero(&self) {
        loop {
            let notified = self.inner.zero.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent last `done` is not missed.
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

struct DoneGuard(WaitGroup);

impl Drop for DoneGuard {
    fn drop(&mut self) {
        self.0.done();
    }
}
