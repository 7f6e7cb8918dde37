// src/dag/mod.rs

//! Dependency-graph job runner.
//!
//! - [`job`] holds the job node: function, upstream dependencies and the
//!   downstream jobs it notifies on completion.
//! - [`orchestrator`] owns the registered jobs, wires their edges at
//!   registration time and runs them concurrently, one task per job.

pub mod job;
pub mod orchestrator;

pub use job::{Job, JobFn, JobFuture, JobHandle};
pub use orchestrator::Orchestrator;
