// src/dag/orchestrator.rs

use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::dag::job::{Job, JobFn, JobHandle};
use crate::errors::{CollabError, Result};
use crate::fault::{describe_panic, install_panic_capture};
use crate::sink::{DiagnosticSink, NoopSink};
use crate::sync::{CompletionSignal, ErrGroup};

static NEXT_ORCHESTRATOR_ID: AtomicU64 = AtomicU64::new(1);

/// Runs a graph of jobs over a shared payload of type `P`.
///
/// Jobs are registered with [`add_job`](Self::add_job), naming previously
/// returned handles as dependencies. [`run`](Self::run) then spawns one task
/// per job; each task waits for its dependencies' completion signals before
/// calling its function. The first failure cancels the whole invocation.
///
/// Because a job can only depend on jobs registered before it, every graph
/// built through this API is acyclic.
pub struct Orchestrator<P> {
    id: u64,
    jobs: Vec<Job<P>>,
    timeout: Option<Duration>,
    sink: Arc<dyn DiagnosticSink>,
}

impl<P> fmt::Debug for Orchestrator<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("id", &self.id)
            .field("jobs", &self.jobs)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<P: Send + Sync + 'static> Default for Orchestrator<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Send + Sync + 'static> Orchestrator<P> {
    pub fn new() -> Self {
        Self {
            id: NEXT_ORCHESTRATOR_ID.fetch_add(1, Ordering::Relaxed),
            jobs: Vec::new(),
            timeout: None,
            sink: Arc::new(NoopSink),
        }
    }

    /// Global wall-clock budget for one invocation. Zero means unbounded.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Register a job that runs after every job in `deps` has finished.
    pub fn add_job<F, Fut>(
        &mut self,
        name: impl Into<String>,
        func: F,
        deps: &[JobHandle],
    ) -> Result<JobHandle>
    where
        F: Fn(CancellationToken, Arc<P>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        for dep in deps {
            self.check_handle(*dep)?;
        }

        let name = name.into();
        let handle = JobHandle {
            owner: self.id,
            index: self.jobs.len(),
        };

        for dep in deps {
            self.jobs[dep.index].ntfs.push(handle);
        }

        let func: JobFn<P> = Arc::new(move |token, payload| func(token, payload).boxed());

        debug!(
            job = %name,
            index = handle.index,
            deps = deps.len(),
            "orchestrator: registered job"
        );

        self.jobs.push(Job::new(name, func, deps.to_vec()));
        Ok(handle)
    }

    /// Record a per-job timeout. The value is kept for callers to read back;
    /// the orchestrator does not enforce it.
    pub fn set_job_timeout(&mut self, job: JobHandle, timeout: Duration) -> Result<()> {
        self.check_handle(job)?;
        self.jobs[job.index].timeout = Some(timeout);
        Ok(())
    }

    pub fn job(&self, job: JobHandle) -> Option<&Job<P>> {
        if job.owner != self.id {
            return None;
        }
        self.jobs.get(job.index)
    }

    /// All jobs in declaration order.
    pub fn jobs(&self) -> impl Iterator<Item = (JobHandle, &Job<P>)> {
        let owner = self.id;
        self.jobs
            .iter()
            .enumerate()
            .map(move |(index, job)| (JobHandle { owner, index }, job))
    }

    /// Immediate dependencies of a job.
    pub fn dependencies_of(&self, job: JobHandle) -> &[JobHandle] {
        self.job(job).map(|j| j.deps.as_slice()).unwrap_or(&[])
    }

    /// Immediate dependents of a job (the jobs it notifies on completion).
    pub fn dependents_of(&self, job: JobHandle) -> &[JobHandle] {
        self.job(job).map(|j| j.ntfs.as_slice()).unwrap_or(&[])
    }

    /// Run every job once against `payload`.
    ///
    /// Cancelling `ctx` cancels the invocation. Returns the first error any
    /// job produced, or [`CollabError::Timeout`] if the global deadline
    /// passed first; in the latter case jobs that already started keep
    /// running in the background.
    ///
    /// Completion signals are created per call, so an orchestrator can be
    /// run any number of times.
    pub async fn run(&self, ctx: &CancellationToken, payload: Arc<P>) -> Result<()> {
        install_panic_capture();

        // Arm every signal before any task can wait on one.
        let signals: Vec<Arc<CompletionSignal>> = self
            .jobs
            .iter()
            .map(|job| Arc::new(CompletionSignal::new(job.ntfs.len())))
            .collect();

        let (mut group, token) = ErrGroup::with_token(ctx);

        debug!(
            orchestrator = self.id,
            jobs = self.jobs.len(),
            timeout_ms = self.timeout.map(|t| t.as_millis() as u64),
            "orchestrator: starting invocation"
        );

        for (index, job) in self.jobs.iter().enumerate() {
            let task = JobTask {
                name: job.name.clone(),
                func: Arc::clone(&job.func),
                upstream: job
                    .deps
                    .iter()
                    .map(|dep| Arc::clone(&signals[dep.index]))
                    .collect(),
                token: token.clone(),
                payload: Arc::clone(&payload),
                sink: Arc::clone(&self.sink),
            };

            // Fired after the group has recorded this task's result, so a
            // failure cancels the token before any dependent is released.
            let release = signals[index].fire_on_drop();
            group.spawn_guarded(task.run(), release);
        }

        group.wait(self.timeout).await
    }

    fn check_handle(&self, job: JobHandle) -> Result<()> {
        if job.owner != self.id || job.index >= self.jobs.len() {
            return Err(CollabError::UnknownJob(job.to_string()));
        }
        Ok(())
    }
}

/// Everything one job's task needs, detached from the orchestrator borrow.
struct JobTask<P> {
    name: String,
    func: JobFn<P>,
    upstream: Vec<Arc<CompletionSignal>>,
    token: CancellationToken,
    payload: Arc<P>,
    sink: Arc<dyn DiagnosticSink>,
}

impl<P: Send + Sync + 'static> JobTask<P> {
    async fn run(self) -> Result<()> {
        let JobTask {
            name,
            func,
            upstream,
            token,
            payload,
            sink,
        } = self;

        for signal in &upstream {
            if !signal.wait(&token).await {
                break;
            }
        }

        if token.is_cancelled() {
            report(&name, || sink.job_canceled(&name));
            return Err(CollabError::Canceled { name });
        }

        debug!(job = %name, "dependencies satisfied; running job");

        let call = {
            let token = token.clone();
            // The call itself sits inside the boundary so a panic while
            // building the future is contained as well.
            async move { (*func)(token, payload).await }
        };

        let result = match AssertUnwindSafe(call).catch_unwind().await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(CollabError::Job {
                name: name.clone(),
                source,
            }),
            Err(panic) => {
                let (message, trace) = describe_panic(panic.as_ref());
                Err(CollabError::Panicked {
                    name: name.clone(),
                    message,
                    trace,
                })
            }
        };

        match &result {
            Ok(()) => report(&name, || sink.job_succeeded(&name)),
            Err(err) => report(&name, || sink.job_failed(&name, err)),
        }

        result
    }
}

/// Deliver one sink report. A panicking sink is logged and otherwise ignored;
/// it never alters the job's outcome.
fn report(job: &str, deliver: impl FnOnce()) {
    if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(deliver)) {
        let (message, trace) = describe_panic(panic.as_ref());
        warn!(
            job = %job,
            panic = %message,
            trace = %trace,
            "diagnostic sink panicked; report dropped"
        );
    }
}
