//! # Lifecycle Orchestrator
//!
//! Drives one lifecycle operation across the whole registry in an order
//! that respects the control-plane/worker dependency:
//!
//! - **start**: controllers first, then workers, because workers joining
//!   the cluster need a reachable control plane.
//! - **suspend** / **stop**: workers first, then controllers, so workers
//!   are never left calling an already-stopped control plane.
//!
//! The ordering between the two role groups is total: every node of the
//! first group is attempted before any node of the second. Within a group
//! nodes are independent; they are visited name-ascending so output is
//! reproducible.
//!
//! A failed node never aborts the batch. Every node in the computed order
//! is attempted and the report carries each outcome; the operation as a
//! whole failed iff any node failed.

use log::{info, warn};

use crate::error::Result;
use crate::node::Role;
use crate::registry::NodeRegistry;
use crate::vm::{VmAction, VmController};

/// The recorded outcome for one node in a batch.
#[derive(Debug)]
pub struct NodeOutcome {
    pub name: String,
    pub role: Role,
    pub result: Result<()>,
}

impl NodeOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-node outcomes of one lifecycle batch, in visitation order.
#[derive(Debug)]
pub struct OperationReport {
    pub action: VmAction,
    pub outcomes: Vec<NodeOutcome>,
}

impl OperationReport {
    /// True iff every node's action succeeded.
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().all(NodeOutcome::is_success)
    }

    /// Outcomes that failed, in visitation order.
    pub fn failures(&self) -> impl Iterator<Item = &NodeOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Node names in the order they were visited.
    pub fn visited(&self) -> Vec<&str> {
        self.outcomes.iter().map(|o| o.name.as_str()).collect()
    }
}

/// Role groups in execution order for an action.
fn role_order(action: VmAction) -> [Role; 2] {
    match action {
        VmAction::Start => [Role::Controller, Role::Worker],
        VmAction::Suspend | VmAction::Stop => [Role::Worker, Role::Controller],
    }
}

/// Apply one lifecycle action to every node in the registry.
///
/// Delegates each per-node action to the injected [`VmController`] and
/// records the outcome; see the module docs for the ordering contract.
pub fn apply(
    action: VmAction,
    registry: &NodeRegistry,
    controller: &dyn VmController,
) -> OperationReport {
    let mut outcomes = Vec::with_capacity(registry.len());

    for role in role_order(action) {
        for node in registry.by_role(role) {
            info!("{} {} node '{}'", action.verb(), role, node.name);
            let result = controller.perform_action(&node.name, action);
            if let Err(err) = &result {
                warn!("node '{}' failed: {}", node.name, err);
            }
            outcomes.push(NodeOutcome {
                name: node.name.clone(),
                role,
                result,
            });
        }
    }

    OperationReport { action, outcomes }
}
