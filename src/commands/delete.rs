//! Delete command implementation
//!
//! Deletes (stops and purges) a single node. The node must appear in the
//! resolved registry so a typo cannot take out an unrelated VM, and the
//! command asks for confirmation unless `--force` is given.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use dialoguer::Confirm;

use mpc::output::{emoji, OutputConfig};
use mpc::vm::{MultipassController, VmProvisioner};

use super::load_registry;

/// Arguments for the delete command
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Name of the node to delete
    pub node: String,

    /// Path to the common configuration document
    #[arg(short, long, value_name = "PATH", env = "MPC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Delete without confirmation
    #[arg(short, long)]
    pub force: bool,
}

/// Execute the delete command.
pub fn execute(args: DeleteArgs, output: &OutputConfig) -> Result<()> {
    let (_, registry) = load_registry(args.config)?;

    if registry.get(&args.node).is_none() {
        anyhow::bail!("node '{}' is not part of this cluster", args.node);
    }

    if !args.force {
        let proceed = Confirm::new()
            .with_prompt(format!("Delete node '{}'?", args.node))
            .default(false)
            .interact()?;
        if !proceed {
            println!("Deletion cancelled");
            return Ok(());
        }
    }

    let provisioner = MultipassController::new();
    provisioner.delete(&args.node)?;
    println!(
        "{} deleted node '{}'",
        emoji(output, "✓", "[ok]"),
        args.node
    );
    Ok(())
}
