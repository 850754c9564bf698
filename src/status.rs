//! # Status Aggregation
//!
//! Queries each node's run state through the hypervisor capability and
//! classifies overall cluster health. A failed per-node query degrades that
//! node to `Unknown` instead of failing the whole status call.

use log::warn;

use crate::node::Role;
use crate::registry::NodeRegistry;
use crate::vm::{RunState, VmController};

/// Overall cluster health classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterSummary {
    /// Every queried node reports a running state.
    AllRunning,
    /// States are mixed (including suspended nodes).
    Partial,
    /// Every queried node reports a stopped state.
    AllStopped,
    /// At least one node's state could not be determined, or there were no
    /// nodes to query.
    Unknown,
}

impl std::fmt::Display for ClusterSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ClusterSummary::AllRunning => "running",
            ClusterSummary::Partial => "partial",
            ClusterSummary::AllStopped => "stopped",
            ClusterSummary::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// One node's reported state.
#[derive(Debug, Clone)]
pub struct NodeState {
    pub name: String,
    pub role: Role,
    pub state: RunState,
}

/// Per-node states plus the derived summary.
#[derive(Debug)]
pub struct ClusterStatus {
    /// In registry (inventory) order, restricted by the role filter.
    pub per_node: Vec<NodeState>,
    pub summary: ClusterSummary,
}

/// Query the state of every node matching the filter and summarize.
///
/// `role_filter` restricts both the query set and the summary computation;
/// `None` covers the whole registry.
pub fn cluster_status(
    registry: &NodeRegistry,
    role_filter: Option<Role>,
    controller: &dyn VmController,
) -> ClusterStatus {
    let mut per_node = Vec::new();

    for node in registry.iter() {
        if role_filter.is_some_and(|role| node.role != role) {
            continue;
        }
        let state = match controller.query_state(&node.name) {
            Ok(state) => state,
            Err(err) => {
                warn!("{}", err);
                RunState::Unknown
            }
        };
        per_node.push(NodeState {
            name: node.name.clone(),
            role: node.role,
            state,
        });
    }

    let summary = summarize(&per_node);
    ClusterStatus { per_node, summary }
}

fn summarize(per_node: &[NodeState]) -> ClusterSummary {
    if per_node.is_empty() || per_node.iter().any(|n| n.state == RunState::Unknown) {
        return ClusterSummary::Unknown;
    }
    if per_node.iter().all(|n| n.state == RunState::Running) {
        return ClusterSummary::AllRunning;
    }
    if per_node.iter().all(|n| n.state == RunState::Stopped) {
        return ClusterSummary::AllStopped;
    }
    ClusterSummary::Partial
}
