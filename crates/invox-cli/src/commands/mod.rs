//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod process;

use std::path::Path;

use invox_core::models::config::InvoxConfig;

/// Load the pipeline configuration from an explicit path, or fall back to
/// defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<InvoxConfig> {
    match config_path {
        Some(path) => Ok(InvoxConfig::from_file(Path::new(path))?),
        None => Ok(InvoxConfig::default()),
    }
}
