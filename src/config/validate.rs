// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{PipelineConfig, RawPipelineConfig};
use crate::errors::{CollabError, Result};

impl TryFrom<RawPipelineConfig> for PipelineConfig {
    type Error = CollabError;

    fn try_from(raw: RawPipelineConfig) -> std::result::Result<Self, Self::Error> {
        let order = validate_config(&raw)?;
        Ok(PipelineConfig::new_unchecked(raw.runner, raw.stage, order))
    }
}

/// Check a raw pipeline and return its stages in topological order.
pub fn validate_config(cfg: &RawPipelineConfig) -> Result<Vec<String>> {
    ensure_has_stages(cfg)?;
    validate_stage_flags(cfg)?;
    validate_stage_dependencies(cfg)?;
    stage_order(cfg)
}

fn ensure_has_stages(cfg: &RawPipelineConfig) -> Result<()> {
    if cfg.stage.is_empty() {
        return Err(CollabError::ConfigError(
            "pipeline must contain at least one [stage.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_stage_flags(cfg: &RawPipelineConfig) -> Result<()> {
    for (name, stage) in cfg.stage.iter() {
        if stage.fail && stage.panic {
            return Err(CollabError::ConfigError(format!(
                "stage '{}' sets both `fail` and `panic`",
                name
            )));
        }
    }
    Ok(())
}

fn validate_stage_dependencies(cfg: &RawPipelineConfig) -> Result<()> {
    for (name, stage) in cfg.stage.iter() {
        for dep in stage.after.iter() {
            if dep == name {
                return Err(CollabError::ConfigError(format!(
                    "stage '{}' cannot depend on itself in `after`",
                    name
                )));
            }
            if !cfg.stage.contains_key(dep) {
                return Err(CollabError::UnknownStage(format!(
                    "'{}' (referenced in `after` of stage '{}')",
                    dep, name
                )));
            }
        }
    }
    Ok(())
}

fn stage_order(cfg: &RawPipelineConfig) -> Result<Vec<String>> {
    // Edge direction: dep -> stage, so `after = ["A"]` on B adds A -> B.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.stage.keys() {
        graph.add_node(name.as_str());
    }

    for (name, stage) in cfg.stage.iter() {
        for dep in stage.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => Err(CollabError::DagCycle(format!(
            "cycle detected in stage DAG involving stage '{}'",
            cycle.node_id()
        ))),
    }
}
