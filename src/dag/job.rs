// src/dag/job.rs

//! Job nodes of the dependency graph.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

/// Future returned by a job function.
pub type JobFuture = BoxFuture<'static, anyhow::Result<()>>;

/// Type-erased job function: receives the invocation's cancellation token
/// and the shared payload.
pub type JobFn<P> = Arc<dyn Fn(CancellationToken, Arc<P>) -> JobFuture + Send + Sync>;

/// Handle to a registered job, usable as a dependency of later jobs.
///
/// A handle is only meaningful for the orchestrator that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobHandle {
    pub(crate) owner: u64,
    pub(crate) index: usize,
}

impl JobHandle {
    /// Position of the job in declaration order.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@{}", self.index, self.owner)
    }
}

/// A unit of work plus its place in the graph.
pub struct Job<P> {
    pub(crate) name: String,
    pub(crate) func: JobFn<P>,
    /// Recorded but not enforced by the orchestrator.
    pub(crate) timeout: Option<Duration>,
    /// Upstream jobs; fixed at registration.
    pub(crate) deps: Vec<JobHandle>,
    /// Downstream jobs to notify; grows as later jobs name this one.
    pub(crate) ntfs: Vec<JobHandle>,
}

impl<P> Job<P> {
    pub(crate) fn new(name: String, func: JobFn<P>, deps: Vec<JobHandle>) -> Self {
        Self {
            name,
            func,
            timeout: None,
            deps,
            ntfs: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn dependencies(&self) -> &[JobHandle] {
        &self.deps
    }

    pub fn dependents(&self) -> &[JobHandle] {
        &self.ntfs
    }
}

impl<P> fmt::Debug for Job<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .field("deps", &self.deps)
            .field("ntfs", &self.ntfs)
            .finish_non_exhaustive()
    }
}
