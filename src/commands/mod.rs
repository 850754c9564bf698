//! # CLI Command Implementations
//!
//! One module per `mpc` subcommand. Each module defines an `Args` struct
//! (derived with `clap`) and an `execute` function that performs the
//! command's logic by calling into the `mpc` library.
//!
//! The lifecycle trio (start, suspend, stop) share a single module since
//! they differ only in the action passed to the orchestrator.

pub mod completions;
pub mod delete;
pub mod lifecycle;
pub mod provision;
pub mod status;

use std::path::{Path, PathBuf};

use anyhow::Result;
use mpc::config::{self, CommonConfig, DEFAULT_COMMON_CONFIG};
use mpc::registry::NodeRegistry;

/// Resolve the common-config path, load it, and build the registry.
///
/// Shared by every command that needs the resolved cluster. Inventory
/// documents are read relative to the common document's directory.
pub(crate) fn load_registry(config_arg: Option<PathBuf>) -> Result<(CommonConfig, NodeRegistry)> {
    let config_path = config_arg.unwrap_or_else(|| PathBuf::from(DEFAULT_COMMON_CONFIG));
    if !config_path.exists() {
        anyhow::bail!("Configuration file not found: {}", config_path.display());
    }

    let config = config::from_file(&config_path)?;
    let base_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let registry = NodeRegistry::load(&config, &base_dir)?;
    Ok((config, registry))
}
