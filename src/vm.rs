//! # Hypervisor Capability
//!
//! The narrow interface between the cluster logic and the Multipass
//! hypervisor. The orchestrator and status aggregator only ever see the
//! [`VmController`] trait, so tests can inject a deterministic double and
//! the real implementation can shell out to the `multipass` binary.

use std::fmt;
use std::process::Command;

use log::debug;

use crate::error::{Error, Result};

/// A lifecycle action on a single VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VmAction {
    Start,
    Suspend,
    Stop,
}

impl VmAction {
    /// The multipass subcommand for this action.
    pub fn verb(&self) -> &'static str {
        match self {
            VmAction::Start => "start",
            VmAction::Suspend => "suspend",
            VmAction::Stop => "stop",
        }
    }

    /// Progressive form for headers ("Starting ...").
    pub fn gerund(&self) -> &'static str {
        match self {
            VmAction::Start => "Starting",
            VmAction::Suspend => "Suspending",
            VmAction::Stop => "Stopping",
        }
    }

    /// Past-tense form for report output.
    pub fn past_tense(&self) -> &'static str {
        match self {
            VmAction::Start => "started",
            VmAction::Suspend => "suspended",
            VmAction::Stop => "stopped",
        }
    }
}

impl fmt::Display for VmAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// Power/run state of a VM as reported by the hypervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Running,
    Stopped,
    Suspended,
    Starting,
    Deleted,
    /// The hypervisor reported a state we do not model, or the query for
    /// this node failed.
    Unknown,
}

impl RunState {
    /// Map a multipass state string onto the modeled states.
    pub fn from_multipass(state: &str) -> RunState {
        match state.to_lowercase().as_str() {
            "running" => RunState::Running,
            "stopped" => RunState::Stopped,
            "suspended" => RunState::Suspended,
            "starting" | "restarting" => RunState::Starting,
            "deleted" => RunState::Deleted,
            _ => RunState::Unknown,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunState::Running => "Running",
            RunState::Stopped => "Stopped",
            RunState::Suspended => "Suspended",
            RunState::Starting => "Starting",
            RunState::Deleted => "Deleted",
            RunState::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

/// Lifecycle capability consumed by the orchestrator and aggregator.
pub trait VmController {
    /// Execute one lifecycle action on one node.
    fn perform_action(&self, node: &str, action: VmAction) -> Result<()>;

    /// Query the current run state of one node.
    fn query_state(&self, node: &str) -> Result<RunState>;
}

/// Provisioning capability: creating and destroying VMs.
///
/// Split from [`VmController`] so the lifecycle core stays as narrow as the
/// orchestration contract requires.
pub trait VmProvisioner {
    /// Run a prepared `multipass launch` argument vector.
    fn launch(&self, argv: &[String]) -> Result<()>;

    /// Stop and purge one node.
    fn delete(&self, node: &str) -> Result<()>;
}

/// Controls VMs by invoking the system `multipass` binary.
///
/// Authentication, retries, and timeouts are multipass's concern; a failed
/// or timed-out invocation surfaces here as a per-node error.
#[derive(Debug, Clone)]
pub struct MultipassController {
    binary: String,
}

impl MultipassController {
    pub fn new() -> Self {
        MultipassController {
            binary: "multipass".to_string(),
        }
    }

    /// Use an alternative binary, e.g. a stub in integration tests.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        MultipassController {
            binary: binary.into(),
        }
    }

    fn run(&self, args: &[&str]) -> std::io::Result<std::process::Output> {
        debug!("exec: {} {}", self.binary, args.join(" "));
        Command::new(&self.binary).args(args).output()
    }
}

impl Default for MultipassController {
    fn default() -> Self {
        Self::new()
    }
}

impl VmController for MultipassController {
    fn perform_action(&self, node: &str, action: VmAction) -> Result<()> {
        let output = self
            .run(&[action.verb(), node])
            .map_err(|err| Error::Action {
                node: node.to_string(),
                message: err.to_string(),
            })?;

        if !output.status.success() {
            return Err(Error::Action {
                node: node.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    fn query_state(&self, node: &str) -> Result<RunState> {
        let output = self
            .run(&["info", node, "--format", "json"])
            .map_err(|err| Error::Query {
                node: node.to_string(),
                message: err.to_string(),
            })?;

        if !output.status.success() {
            return Err(Error::Query {
                node: node.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let info: serde_json::Value =
            serde_json::from_slice(&output.stdout).map_err(|err| Error::Query {
                node: node.to_string(),
                message: format!("unparseable multipass info output: {}", err),
            })?;

        let state = info["info"][node]["state"]
            .as_str()
            .ok_or_else(|| Error::Query {
                node: node.to_string(),
                message: "multipass info output has no state field".to_string(),
            })?;

        Ok(RunState::from_multipass(state))
    }
}

impl VmProvisioner for MultipassController {
    fn launch(&self, argv: &[String]) -> Result<()> {
        let args: Vec<&str> = argv.iter().map(String::as_str).collect();
        let node = argv
            .iter()
            .position(|a| a == "--name")
            .and_then(|i| argv.get(i + 1))
            .cloned()
            .unwrap_or_else(|| "unnamed".to_string());

        let output = self.run(&args).map_err(|err| Error::Action {
            node: node.clone(),
            message: err.to_string(),
        })?;

        if !output.status.success() {
            return Err(Error::Action {
                node,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    fn delete(&self, node: &str) -> Result<()> {
        // Multipass refuses to delete a running instance; stop first and
        // ignore the outcome (the node may already be stopped).
        let _ = self.run(&["stop", node]);

        let output = self
            .run(&["delete", "--purge", node])
            .map_err(|err| Error::Action {
                node: node.to_string(),
                message: err.to_string(),
            })?;

        if !output.status.success() {
            return Err(Error::Action {
                node: node.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
pub mod fake {
    //! Deterministic controller double used across the crate's tests.

    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;

    #[derive(Default)]
    pub struct FakeController {
        /// Actions in invocation order.
        pub actions: RefCell<Vec<(String, VmAction)>>,
        /// Nodes whose actions should fail.
        pub failing_actions: Vec<String>,
        /// Reported state per node; missing nodes fail the query.
        pub states: HashMap<String, RunState>,
    }

    impl FakeController {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_states(states: &[(&str, RunState)]) -> Self {
            FakeController {
                states: states
                    .iter()
                    .map(|(n, s)| (n.to_string(), *s))
                    .collect(),
                ..Self::default()
            }
        }

        pub fn fail_action_for(mut self, node: &str) -> Self {
            self.failing_actions.push(node.to_string());
            self
        }

        pub fn visited(&self) -> Vec<String> {
            self.actions
                .borrow()
                .iter()
                .map(|(n, _)| n.clone())
                .collect()
        }
    }

    impl VmController for FakeController {
        fn perform_action(&self, node: &str, action: VmAction) -> Result<()> {
            self.actions
                .borrow_mut()
                .push((node.to_string(), action));
            if self.failing_actions.iter().any(|n| n == node) {
                return Err(Error::Action {
                    node: node.to_string(),
                    message: "injected failure".to_string(),
                });
            }
            Ok(())
        }

        fn query_state(&self, node: &str) -> Result<RunState> {
            self.states
                .get(node)
                .copied()
                .ok_or_else(|| Error::Query {
                    node: node.to_string(),
                    message: "injected query failure".to_string(),
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_verbs() {
        assert_eq!(VmAction::Start.verb(), "start");
        assert_eq!(VmAction::Suspend.verb(), "suspend");
        assert_eq!(VmAction::Stop.verb(), "stop");
    }

    #[test]
    fn test_run_state_from_multipass_strings() {
        assert_eq!(RunState::from_multipass("Running"), RunState::Running);
        assert_eq!(RunState::from_multipass("stopped"), RunState::Stopped);
        assert_eq!(RunState::from_multipass("Suspended"), RunState::Suspended);
        assert_eq!(RunState::from_multipass("Restarting"), RunState::Starting);
        assert_eq!(RunState::from_multipass("weird"), RunState::Unknown);
    }

    #[test]
    fn test_missing_binary_is_node_scoped_error() {
        let controller = MultipassController::with_binary("/nonexistent/multipass");
        let err = controller
            .perform_action("k3s-main-01", VmAction::Start)
            .unwrap_err();
        match err {
            Error::Action { node, .. } => assert_eq!(node, "k3s-main-01"),
            other => panic!("expected Action error, got {:?}", other),
        }

        let err = controller.query_state("k3s-main-01").unwrap_err();
        assert!(matches!(err, Error::Query { .. }));
    }
}
