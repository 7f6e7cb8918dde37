// src/sync/signal.rs

//! One-shot, multi-listener completion signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Completion signal of a single job for a single invocation.
///
/// The signal starts *armed* with zero available slots. [`fire`](Self::fire)
/// releases exactly `listeners` slots, once; each downstream job consumes one
/// slot through [`wait`](Self::wait). Listeners that arrive after the signal
/// fired still find their slot waiting for them.
#[derive(Debug)]
pub struct CompletionSignal {
    slots: Semaphore,
    listeners: usize,
    fired: AtomicBool,
}

impl CompletionSignal {
    pub fn new(listeners: usize) -> Self {
        Self {
            slots: Semaphore::new(0),
            listeners,
            fired: AtomicBool::new(false),
        }
    }

    /// Number of listener slots released when the signal fires.
    pub fn listeners(&self) -> usize {
        self.listeners
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Release one slot per listener. Only the first call has any effect.
    pub fn fire(&self) {
        if !self.fired.swap(true, Ordering::AcqRel) {
            self.slots.add_permits(self.listeners);
        }
    }

    /// Wait for one slot, or for `token` to be cancelled.
    ///
    /// Returns `true` if a real completion was observed and `false` if the
    /// wait ended because of cancellation.
    pub async fn wait(&self, token: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            acquired = self.slots.acquire() => match acquired {
                Ok(permit) => {
                    permit.forget();
                    true
                }
                Err(_) => false,
            },
            _ = token.cancelled() => false,
        }
    }

    /// Guard that fires the signal when dropped.
    pub fn fire_on_drop(self: &Arc<Self>) -> FireGuard {
        FireGuard {
            signal: Arc::clone(self),
        }
    }
}

/// Fires its [`CompletionSignal`] on drop, whichever way the owning task ends.
#[derive(Debug)]
pub struct FireGuard {
    signal: Arc<CompletionSignal>,
}

impl Drop for FireGuard {
    fn drop(&mut self) {
        self.signal.fire();
    }
}
