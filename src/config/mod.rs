//! Configuration loading and validation

mod schema;

pub use schema::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Example configuration written by `soma init`
pub const EXAMPLE_CONFIG: &str = include_str!("../../soma.example.yaml");

/// Load configuration from a YAML file
pub fn load_config(path: &Path) -> Result<SomaConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {:?}", path))?;
    let config: SomaConfig = serde_yaml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}
