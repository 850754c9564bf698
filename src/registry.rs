//! # Node Registry
//!
//! The in-memory collection of resolved node specifications. Built fresh on
//! every invocation from the merged configuration and read-only afterward;
//! a configuration change means constructing a new registry, never mutating
//! one in place.
//!
//! Resolution failures are collected across the whole inventory and
//! reported together, so one bad node does not hide the others. Any
//! failure aborts the run before a single lifecycle action is attempted.

use std::collections::HashSet;
use std::path::Path;

use log::debug;
use serde_yaml::Value as YamlValue;

use crate::config::{CommonConfig, NodeDocument};
use crate::error::{Error, Result};
use crate::merge::resolve_layers;
use crate::node::{NodeSpec, Role, SizeValue};

/// Aggregate resources across the whole registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterResources {
    pub cpus: u64,
    pub memory: SizeValue,
    pub disk: SizeValue,
}

/// Resolved node specifications, indexed by name, in inventory order.
#[derive(Debug, Clone)]
pub struct NodeRegistry {
    nodes: Vec<NodeSpec>,
}

impl NodeRegistry {
    /// Resolve a registry from the common configuration and the per-node
    /// override trees, one per inventory entry, in inventory order.
    ///
    /// Pure with respect to the filesystem; [`NodeRegistry::load`] is the
    /// file-reading wrapper.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolution`] carrying every per-node failure
    /// (merge conflicts, role resolution, validation, duplicate names).
    pub fn resolve(config: &CommonConfig, overrides: Vec<(String, YamlValue)>) -> Result<Self> {
        let global_layer = config.global.to_layer();
        let mut nodes = Vec::with_capacity(overrides.len());
        let mut seen: HashSet<String> = HashSet::new();
        let mut failures = Vec::new();

        for (name, node_override) in overrides {
            if !seen.insert(name.clone()) {
                failures.push(Error::ConfigParse {
                    document: "inventory".to_string(),
                    message: format!("duplicate node name '{}'", name),
                });
                continue;
            }

            let resolved = resolve_layers(
                &global_layer,
                &config.node_defaults,
                &node_override,
                &name,
            )
            .and_then(|merged| NodeSpec::from_value(&name, &merged));

            match resolved {
                Ok(spec) => {
                    debug!("resolved node '{}' as {}", spec.name, spec.role);
                    nodes.push(spec);
                }
                Err(err) => failures.push(err),
            }
        }

        if !failures.is_empty() {
            return Err(Error::Resolution { failures });
        }

        Ok(NodeRegistry { nodes })
    }

    /// Load per-node documents listed in the inventory (relative to
    /// `base_dir`) and resolve the registry.
    pub fn load(config: &CommonConfig, base_dir: &Path) -> Result<Self> {
        let mut overrides = Vec::with_capacity(config.inventory.len());
        let mut failures = Vec::new();

        for entry in &config.inventory {
            let path = base_dir.join(&entry.document);
            match NodeDocument::from_file(&path)
                .and_then(|doc| doc.override_for(&entry.name))
            {
                Ok(node_override) => overrides.push((entry.name.clone(), node_override)),
                Err(err) => failures.push(err),
            }
        }

        if !failures.is_empty() {
            return Err(Error::Resolution { failures });
        }

        Self::resolve(config, overrides)
    }

    /// Look up a node by name.
    pub fn get(&self, name: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// All nodes in inventory order.
    pub fn iter(&self) -> impl Iterator<Item = &NodeSpec> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes of one role, name-ascending for reproducible ordering.
    pub fn by_role(&self, role: Role) -> Vec<&NodeSpec> {
        let mut selected: Vec<&NodeSpec> =
            self.nodes.iter().filter(|n| n.role == role).collect();
        selected.sort_by(|a, b| a.name.cmp(&b.name));
        selected
    }

    /// Sum of resources across all nodes.
    pub fn total_resources(&self) -> ClusterResources {
        self.nodes
            .iter()
            .fold(ClusterResources::default(), |acc, node| ClusterResources {
                cpus: acc.cpus + u64::from(node.resources.cpus),
                memory: acc.memory.saturating_add(node.resources.memory),
                disk: acc.disk.saturating_add(node.resources.disk),
            })
    }
}
