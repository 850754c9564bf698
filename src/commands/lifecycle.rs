//! Lifecycle commands: start, suspend, stop
//!
//! All three load the resolved registry and hand it to the orchestrator;
//! they differ only in the action and therefore in the role ordering the
//! orchestrator picks (controllers first on start, workers first on
//! suspend and stop).

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use mpc::orchestrator;
use mpc::output::{emoji, OutputConfig};
use mpc::vm::{MultipassController, VmAction};

use super::load_registry;

/// Arguments shared by the start, suspend, and stop commands
#[derive(Args, Debug)]
pub struct LifecycleArgs {
    /// Path to the common configuration document
    #[arg(short, long, value_name = "PATH", env = "MPC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// Execute one lifecycle action across the whole cluster.
pub fn execute(action: VmAction, args: LifecycleArgs, output: &OutputConfig) -> Result<()> {
    let (config, registry) = load_registry(args.config)?;

    if registry.is_empty() {
        if !args.quiet {
            println!("No nodes defined in configuration");
        }
        return Ok(());
    }

    if !args.quiet {
        println!(
            "{} {} cluster '{}' ({} node(s))...",
            emoji(output, "🚀", "::"),
            action.gerund(),
            config.cluster.name,
            registry.len()
        );
    }

    let controller = MultipassController::new();
    let report = orchestrator::apply(action, &registry, &controller);

    if !args.quiet {
        for outcome in &report.outcomes {
            match &outcome.result {
                Ok(()) => println!(
                    "{} {} ({}) {}",
                    emoji(output, "✓", "[ok]"),
                    outcome.name,
                    outcome.role,
                    report.action.past_tense()
                ),
                Err(err) => println!(
                    "{} {} ({}) failed: {}",
                    emoji(output, "✗", "[failed]"),
                    outcome.name,
                    outcome.role,
                    err
                ),
            }
        }
    }

    if !report.succeeded() {
        let failed = report.failures().count();
        anyhow::bail!(
            "{} failed for {} of {} node(s)",
            report.action.verb(),
            failed,
            report.outcomes.len()
        );
    }

    if !args.quiet {
        println!(
            "{} {} operation completed",
            emoji(output, "✅", "[done]"),
            report.action.verb()
        );
    }
    Ok(())
}
