// src/sync/errgroup.rs

//! Error-propagating join with first-error-wins cancellation.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{CollabError, Result};
use crate::fault::{describe_panic, install_panic_capture};

type ErrorSlot = Arc<Mutex<Option<CollabError>>>;

/// A group of concurrently running tasks sharing one cancellation token.
///
/// - The first task to return `Err` stores its error and cancels the token,
///   so every sibling observing the token can stop early.
/// - Later errors are dropped; [`wait`](Self::wait) returns the first one.
/// - Waiting can be bounded by a wall-clock deadline.
#[derive(Debug)]
pub struct ErrGroup {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
    first_error: ErrorSlot,
}

impl Default for ErrGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrGroup {
    /// Group with a fresh, unparented token.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            handles: Vec::new(),
            first_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Group whose token is a child of `parent`.
    ///
    /// Cancelling `parent` cancels the group; a failure inside the group never
    /// cancels `parent`. The returned token is the one tasks should observe.
    pub fn with_token(parent: &CancellationToken) -> (Self, CancellationToken) {
        let token = parent.child_token();
        let group = Self {
            token: token.clone(),
            handles: Vec::new(),
            first_error: Arc::new(Mutex::new(None)),
        };
        (group, token)
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Number of tasks spawned so far.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn spawn<F>(&mut self, fut: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.spawn_guarded(fut, ());
    }

    /// Spawn `fut`, keeping `guard` alive until its result has been recorded.
    ///
    /// Anything `guard` does on drop happens strictly after a failure of this
    /// task has cancelled the group token. A panic in `fut` counts as a
    /// failure ([`CollabError::TaskPanicked`]) and is recorded the same way.
    pub fn spawn_guarded<F, G>(&mut self, fut: F, guard: G)
    where
        F: Future<Output = Result<()>> + Send + 'static,
        G: Send + 'static,
    {
        install_panic_capture();

        let token = self.token.clone();
        let slot = Arc::clone(&self.first_error);

        self.handles.push(tokio::spawn(async move {
            let outcome = match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => {
                    let (message, trace) = describe_panic(panic.as_ref());
                    Err(CollabError::TaskPanicked { message, trace })
                }
            };
            if let Err(err) = outcome {
                record(&slot, &token, err);
            }
            drop(guard);
        }));
    }

    /// Wait for every task, or until `timeout` elapses.
    ///
    /// `None` or a zero duration waits without bound. On timeout the group
    /// token is cancelled and [`CollabError::Timeout`] is returned at once;
    /// tasks still running are detached, not aborted.
    pub async fn wait(self, timeout: Option<Duration>) -> Result<()> {
        let ErrGroup {
            token,
            handles,
            first_error,
        } = self;

        let all_done = join_all(handles, &first_error, &token);

        match timeout.filter(|limit| !limit.is_zero()) {
            None => all_done.await,
            Some(limit) => {
                if tokio::time::timeout(limit, all_done).await.is_err() {
                    warn!(timeout_ms = limit.as_millis() as u64, "error group timeout");
                    token.cancel();
                    return Err(CollabError::Timeout);
                }
            }
        }

        info!("error group all finished");
        token.cancel();

        let mut slot = first_error.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

async fn join_all(handles: Vec<JoinHandle<()>>, slot: &ErrorSlot, token: &CancellationToken) {
    for handle in handles {
        if let Err(join_err) = handle.await {
            record(slot, token, CollabError::Join(join_err));
        }
    }
}

fn record(slot: &ErrorSlot, token: &CancellationToken, err: CollabError) {
    let mut first = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if first.is_none() {
        debug!(error = %err, "error group: first failure, cancelling siblings");
        *first = Some(err);
        // Cancel while holding the slot so no later error can be stored first.
        token.cancel();
    } else {
        debug!(error = %err, "error group: dropping later failure");
    }
}
