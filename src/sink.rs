// src/sink.rs

//! Diagnostic sink for per-job outcomes.
//!
//! The orchestrator reports every job outcome to an injected
//! [`DiagnosticSink`]. The sink is purely observational: replacing it, or
//! leaving the default [`NoopSink`] in place, never changes control flow.

use tracing::{error, info, warn};

use crate::errors::CollabError;

pub trait DiagnosticSink: Send + Sync {
    /// The job's function returned successfully.
    fn job_succeeded(&self, _job: &str) {}

    /// The job was skipped because the invocation had been cancelled.
    fn job_canceled(&self, _job: &str) {}

    /// The job's function returned an error or panicked.
    fn job_failed(&self, _job: &str, _error: &CollabError) {}
}

/// Discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {}

/// Forwards reports to `tracing` at info / warn / error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn job_succeeded(&self, job: &str) {
        info!(job = %job, "job done");
    }

    fn job_canceled(&self, job: &str) {
        warn!(job = %job, "job canceled because of an upstream error or cancellation");
    }

    fn job_failed(&self, job: &str, error: &CollabError) {
        error!(job = %job, error = %error, "job error");
    }
}
