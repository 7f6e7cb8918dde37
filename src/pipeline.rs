// src/pipeline.rs

//! Simulated multi-stage pipelines built on the orchestrator.
//!
//! Each stage sleeps for its configured duration, appends its name to the
//! shared [`StageLog`], then optionally fails or panics. The built-in
//! [`diamond`] pipeline is the canonical four-stage example:
//!
//! ```text
//!     A
//!    / \
//!   B   C
//!    \ /
//!     D
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::{PipelineConfig, RawPipelineConfig, StageConfig};
use crate::dag::{JobHandle, Orchestrator};
use crate::errors::{CollabError, Result};

/// Shared payload of a simulated pipeline: names of finished stages, in
/// completion order.
#[derive(Debug, Default)]
pub struct StageLog {
    finished: Mutex<Vec<String>>,
}

impl StageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, stage: &str) {
        self.finished
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(stage.to_string());
    }

    pub fn finished(&self) -> Vec<String> {
        self.finished
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Finished stage names concatenated, e.g. `"ABCD"`.
    pub fn joined(&self) -> String {
        self.finished().concat()
    }
}

/// Build an orchestrator running every stage of `cfg`.
pub fn build_pipeline(cfg: &PipelineConfig) -> Result<Orchestrator<StageLog>> {
    let mut co: Orchestrator<StageLog> = Orchestrator::new();
    if let Some(timeout) = cfg.runner.timeout() {
        co = co.with_timeout(timeout);
    }

    let mut handles: HashMap<&str, JobHandle> = HashMap::new();

    for (name, stage) in cfg.stages_in_order() {
        let deps = stage
            .after
            .iter()
            .map(|dep| {
                handles
                    .get(dep.as_str())
                    .copied()
                    .ok_or_else(|| CollabError::UnknownStage(dep.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let stage_name = name.to_string();
        let stage_cfg = stage.clone();
        let handle = co.add_job(
            name,
            move |token, log| run_stage(stage_name.clone(), stage_cfg.clone(), token, log),
            &deps,
        )?;

        if let Some(ms) = stage.timeout_ms {
            co.set_job_timeout(handle, std::time::Duration::from_millis(ms))?;
        }

        handles.insert(name, handle);
    }

    debug!(stages = co.len(), "pipeline built");
    Ok(co)
}

/// The four-stage diamond: A(100ms) -> B(50ms), C(100ms) -> D(20ms).
pub fn diamond() -> Result<PipelineConfig> {
    let stage = |sleep_ms: u64, after: &[&str]| StageConfig {
        sleep_ms,
        after: after.iter().map(|s| s.to_string()).collect(),
        ..StageConfig::default()
    };

    let mut raw = RawPipelineConfig::default();
    raw.stage.insert("A".to_string(), stage(100, &[]));
    raw.stage.insert("B".to_string(), stage(50, &["A"]));
    raw.stage.insert("C".to_string(), stage(100, &["A"]));
    raw.stage.insert("D".to_string(), stage(20, &["B", "C"]));

    PipelineConfig::try_from(raw)
}

async fn run_stage(
    name: String,
    stage: StageConfig,
    token: CancellationToken,
    log: Arc<StageLog>,
) -> anyhow::Result<()> {
    tokio::select! {
        _ = tokio::time::sleep(stage.sleep()) => {}
        _ = token.cancelled() => anyhow::bail!("stage {name} interrupted"),
    }

    log.record(&name);

    if stage.panic {
        panic!("stage {name} panicked");
    }
    if stage.fail {
        anyhow::bail!("stage {name} reported failure");
    }
    Ok(())
}
