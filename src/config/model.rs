// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

/// Pipeline description as read from a TOML file, before validation.
///
/// ```toml
/// [runner]
/// timeout_ms = 1000
///
/// [stage.A]
/// sleep_ms = 100
///
/// [stage.B]
/// sleep_ms = 50
/// after = ["A"]
/// ```
///
/// All sections are optional at the parsing level; validation requires at
/// least one stage.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPipelineConfig {
    #[serde(default)]
    pub runner: RunnerSection,

    /// Stages keyed by name.
    #[serde(default)]
    pub stage: BTreeMap<String, StageConfig>,
}

/// `[runner]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerSection {
    /// Global budget for one invocation, in milliseconds. Absent or `0`
    /// means unbounded.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl RunnerSection {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

/// `[stage.<name>]` section: one simulated stage.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    /// Simulated work, in milliseconds.
    #[serde(default)]
    pub sleep_ms: u64,

    /// Stages that must finish before this one starts.
    #[serde(default)]
    pub after: Vec<String>,

    /// Return an error once the work is done.
    #[serde(default)]
    pub fail: bool,

    /// Panic once the work is done.
    #[serde(default)]
    pub panic: bool,

    /// Per-stage timeout; recorded on the job, not enforced.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl StageConfig {
    pub fn sleep(&self) -> Duration {
        Duration::from_millis(self.sleep_ms)
    }
}

/// A validated pipeline.
///
/// Only obtainable through `TryFrom<RawPipelineConfig>`, so holding one
/// means stage references resolve and the stages form a DAG.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub runner: RunnerSection,
    pub stage: BTreeMap<String, StageConfig>,
    /// Stage names in a dependency-respecting order.
    order: Vec<String>,
}

impl PipelineConfig {
    pub(crate) fn new_unchecked(
        runner: RunnerSection,
        stage: BTreeMap<String, StageConfig>,
        order: Vec<String>,
    ) -> Self {
        Self {
            runner,
            stage,
            order,
        }
    }

    /// Stages in topological order: every stage comes after all of its `after` entries.
    pub fn stages_in_order(&self) -> impl Iterator<Item = (&str, &StageConfig)> {
        self.order
            .iter()
            .filter_map(|name| self.stage.get(name).map(|cfg| (name.as_str(), cfg)))
    }
}
