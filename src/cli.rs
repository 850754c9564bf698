//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;

use mpc::output::OutputConfig;
use mpc::vm::VmAction;

use crate::commands;

/// Multipass Control Tool - manage a local k3s cluster of Multipass VMs
#[derive(Parser, Debug)]
#[command(name = "mpc")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start all cluster nodes (main nodes first, then workers)
    Start(commands::lifecycle::LifecycleArgs),

    /// Suspend all cluster nodes (workers first, then main nodes)
    Suspend(commands::lifecycle::LifecycleArgs),

    /// Stop all cluster nodes (workers first, then main nodes)
    Stop(commands::lifecycle::LifecycleArgs),

    /// Show per-node and cluster-wide status
    Status(commands::status::StatusArgs),

    /// Create the cluster VMs from the resolved configuration
    Provision(commands::provision::ProvisionArgs),

    /// Delete a single node
    Delete(commands::delete::DeleteArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        env_logger::Builder::from_env(Env::default().default_filter_or(&self.log_level)).init();
        let output = OutputConfig::from_env_and_flag(&self.color);

        match self.command {
            Commands::Start(args) => {
                commands::lifecycle::execute(VmAction::Start, args, &output)
            }
            Commands::Suspend(args) => {
                commands::lifecycle::execute(VmAction::Suspend, args, &output)
            }
            Commands::Stop(args) => commands::lifecycle::execute(VmAction::Stop, args, &output),
            Commands::Status(args) => commands::status::execute(args, &output),
            Commands::Provision(args) => commands::provision::execute(args, &output),
            Commands::Delete(args) => commands::delete::execute(args, &output),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}
