// src/config/mod.rs

//! Pipeline configuration for the demo runner.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a pipeline file from disk (`loader.rs`).
//! - Validate references and acyclicity (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, parse_str};
pub use model::{PipelineConfig, RawPipelineConfig, RunnerSection, StageConfig};
pub use validate::validate_config;
