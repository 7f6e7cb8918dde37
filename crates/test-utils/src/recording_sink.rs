use std::sync::{Arc, Mutex};

use collab::errors::CollabError;
use collab::sink::DiagnosticSink;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Succeeded(String),
    Canceled(String),
    Failed { job: String, error: String },
}

/// A sink that remembers every report, in arrival order.
///
/// Clones share the same event list, so a test can keep one clone and hand
/// the other to the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn canceled(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Canceled(job) => Some(job),
                _ => None,
            })
            .collect()
    }

    /// `(job, error text)` of every failure report.
    pub fn failed(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Failed { job, error } => Some((job, error)),
                _ => None,
            })
            .collect()
    }

    pub fn succeeded(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Succeeded(job) => Some(job),
                _ => None,
            })
            .collect()
    }
}

impl DiagnosticSink for RecordingSink {
    fn job_succeeded(&self, job: &str) {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Succeeded(job.to_string()));
    }

    fn job_canceled(&self, job: &str) {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Canceled(job.to_string()));
    }

    fn job_failed(&self, job: &str, error: &CollabError) {
        self.events.lock().unwrap().push(SinkEvent::Failed {
            job: job.to_string(),
            error: error.to_string(),
        });
    }
}

/// A sink that panics on every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanickingSink;

impl DiagnosticSink for PanickingSink {
    fn job_succeeded(&self, job: &str) {
        panic!("sink blew up on {job}");
    }

    fn job_canceled(&self, job: &str) {
        panic!("sink blew up on canceled {job}");
    }

    fn job_failed(&self, job: &str, _error: &CollabError) {
        panic!("sink blew up on failed {job}");
    }
}
