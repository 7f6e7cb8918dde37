// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{PipelineConfig, RawPipelineConfig};
use crate::errors::Result;

/// Read and deserialize a pipeline file without semantic validation.
///
/// Use [`load_and_validate`] to also check references and acyclicity.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPipelineConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    parse_str(&contents)
}

/// Deserialize a pipeline from TOML text.
pub fn parse_str(contents: &str) -> Result<RawPipelineConfig> {
    let config: RawPipelineConfig = toml::from_str(contents)?;
    Ok(config)
}

/// Load a pipeline file and validate it.
///
/// - Reads TOML.
/// - Applies defaults (`serde` + `Default` impls).
/// - Checks for unknown `after` references, self-dependencies, cycles and
///   conflicting stage flags.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let raw = load_from_path(&path)?;
    let config = PipelineConfig::try_from(raw)?;
    debug!(
        path = %path.as_ref().display(),
        stages = config.stage.len(),
        "loaded pipeline config"
    );
    Ok(config)
}
