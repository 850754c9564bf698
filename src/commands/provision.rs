//! Provision command implementation
//!
//! Resolves the full configuration and creates the cluster VMs with
//! `multipass launch`. Supports a dry run (print the commands only) and a
//! generate mode that writes each resolved spec to a YAML file instead of
//! touching the hypervisor.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use dialoguer::Confirm;

use mpc::node::Role;
use mpc::output::{emoji, OutputConfig};
use mpc::provision::{format_command, launch_command, provision_all, write_rendered};
use mpc::vm::MultipassController;

use super::load_registry;

/// Arguments for the provision command
#[derive(Args, Debug)]
pub struct ProvisionArgs {
    /// Path to the common configuration document
    #[arg(short, long, value_name = "PATH", env = "MPC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Show the launch commands without executing them
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Write resolved per-node YAML files instead of creating VMs
    #[arg(short, long)]
    pub generate: bool,

    /// Output directory for generated config files
    #[arg(short, long, value_name = "PATH", default_value = "generated")]
    pub output_dir: PathBuf,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Execute the provision command.
pub fn execute(args: ProvisionArgs, output: &OutputConfig) -> Result<()> {
    let (config, registry) = load_registry(args.config)?;

    if registry.is_empty() {
        println!("No nodes defined in configuration");
        return Ok(());
    }

    let mains = registry.by_role(Role::Controller).len();
    let workers = registry.by_role(Role::Worker).len();
    println!(
        "{} {}: {} node(s): {} main, {} worker",
        emoji(output, "🔍", "::"),
        config.cluster.name,
        registry.len(),
        mains,
        workers
    );

    if args.generate {
        let written = write_rendered(&registry, &args.output_dir)?;
        for path in &written {
            println!(
                "{} generated {}",
                emoji(output, "✓", "[ok]"),
                path.display()
            );
        }
        return Ok(());
    }

    if args.dry_run {
        println!("DRY RUN - commands will not be executed");
        for node in registry.iter() {
            println!("  {}", format_command(&launch_command(node)));
        }
        return Ok(());
    }

    if !args.yes {
        let proceed = Confirm::new()
            .with_prompt(format!("Create {} virtual machine(s)?", registry.len()))
            .default(true)
            .interact()?;
        if !proceed {
            println!("Provisioning cancelled");
            return Ok(());
        }
    }

    let provisioner = MultipassController::new();
    let outcomes = provision_all(&registry, &provisioner);

    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(()) => println!(
                "{} created {}",
                emoji(output, "✓", "[ok]"),
                outcome.name
            ),
            Err(err) => {
                failed += 1;
                println!("{} {}", emoji(output, "✗", "[failed]"), err);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} node(s) failed to provision", failed, outcomes.len());
    }
    println!(
        "{} all {} node(s) created",
        emoji(output, "✅", "[done]"),
        outcomes.len()
    );
    Ok(())
}
