//! Status command implementation
//!
//! Queries every node's run state through the hypervisor capability and
//! prints a per-node table plus the derived cluster summary. `--main` and
//! `--worker` restrict the view to one role.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use mpc::node::Role;
use mpc::output::{emoji, OutputConfig};
use mpc::status::cluster_status;
use mpc::vm::{MultipassController, RunState};

use super::load_registry;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Path to the common configuration document
    #[arg(short, long, value_name = "PATH", env = "MPC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Show only main (controller) nodes
    #[arg(short, long, conflicts_with = "worker")]
    pub main: bool,

    /// Show only worker nodes
    #[arg(short, long)]
    pub worker: bool,
}

/// Execute the status command.
pub fn execute(args: StatusArgs, output: &OutputConfig) -> Result<()> {
    let role_filter = if args.main {
        Some(Role::Controller)
    } else if args.worker {
        Some(Role::Worker)
    } else {
        None
    };

    let (config, registry) = load_registry(args.config)?;

    if registry.is_empty() {
        println!("No nodes defined in configuration");
        return Ok(());
    }

    let controller = MultipassController::new();
    let status = cluster_status(&registry, role_filter, &controller);

    if status.per_node.is_empty() {
        println!("No matching nodes");
        return Ok(());
    }

    let title = match role_filter {
        Some(Role::Controller) => "MAIN NODES",
        Some(Role::Worker) => "WORKER NODES",
        None => "CLUSTER NODES",
    };
    println!("{} ({})", title, config.cluster.name);
    println!("{:-<50}", "");
    println!("{:<24} {:<10} {:<12}", "Name", "Role", "State");
    println!("{:-<50}", "");
    for node in &status.per_node {
        println!("{:<24} {:<10} {:<12}", node.name, node.role, node.state);
    }
    println!("{:-<50}", "");

    let totals = registry.total_resources();
    println!(
        "Total: {} node(s), {} cpus, {} memory, {} disk",
        registry.len(),
        totals.cpus,
        totals.memory,
        totals.disk
    );
    println!(
        "{} Cluster status: {}",
        emoji(output, "📊", "::"),
        status.summary
    );

    let unknown = status
        .per_node
        .iter()
        .filter(|n| n.state == RunState::Unknown)
        .count();
    if unknown > 0 {
        anyhow::bail!("state of {} node(s) could not be determined", unknown);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_missing_config() {
        let args = StatusArgs {
            config: Some(PathBuf::from("/nonexistent/common.yaml")),
            main: false,
            worker: false,
        };
        let result = execute(args, &OutputConfig { use_color: false });
        assert!(result.is_err());
    }

    #[test]
    fn test_execute_empty_inventory_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("common.yaml");
        std::fs::write(&config_path, "inventory: []\n").unwrap();

        let args = StatusArgs {
            config: Some(config_path),
            main: false,
            worker: false,
        };
        assert!(execute(args, &OutputConfig { use_color: false }).is_ok());
    }
}
