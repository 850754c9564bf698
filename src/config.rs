//! # Configuration Schema and Parsing
//!
//! Defines the on-disk configuration contract and the parsing entry points.
//!
//! Two kinds of document exist:
//!
//! - The **common document** (`config/common.yaml`): cluster metadata, the
//!   `global` defaults (base image, resources), the `node_defaults` layer,
//!   and the ordered `inventory` mapping node names to per-node documents.
//! - **Per-node documents**: a `nodes:` list of partial specs; any field may
//!   be omitted to inherit from the lower layers.
//!
//! The layers that participate in the deep merge (`global` resources,
//! `node_defaults`, per-node overrides) are deliberately kept as untyped
//! `serde_yaml::Value` trees here. Typed validation happens once, after the
//! merge, in [`crate::node::NodeSpec::from_value`]; internal components
//! never operate on raw key-value trees.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value as YamlValue;

use crate::error::{Error, Result};

/// Default location of the common configuration document.
pub const DEFAULT_COMMON_CONFIG: &str = "config/common.yaml";

/// Cluster-level metadata from the common document.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterMeta {
    #[serde(default = "default_cluster_name")]
    pub name: String,
    #[serde(default = "default_cluster_description")]
    pub description: String,
}

fn default_cluster_name() -> String {
    "k3s-cluster".to_string()
}

fn default_cluster_description() -> String {
    "K3s Kubernetes Cluster".to_string()
}

impl Default for ClusterMeta {
    fn default() -> Self {
        ClusterMeta {
            name: default_cluster_name(),
            description: default_cluster_description(),
        }
    }
}

/// Global defaults: the lowest-precedence layer.
///
/// `base_image` maps onto the node `image` field; `resources` stays untyped
/// so a node override of a single sub-field still merges against it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlobalDefaults {
    pub base_image: Option<String>,
    #[serde(default)]
    pub resources: Option<YamlValue>,
}

impl GlobalDefaults {
    /// Project the global defaults into node-override shape so all three
    /// layers merge uniformly.
    pub fn to_layer(&self) -> YamlValue {
        let mut map = serde_yaml::Mapping::new();
        if let Some(image) = &self.base_image {
            map.insert(
                YamlValue::String("image".to_string()),
                YamlValue::String(image.clone()),
            );
        }
        if let Some(resources) = &self.resources {
            map.insert(
                YamlValue::String("resources".to_string()),
                resources.clone(),
            );
        }
        YamlValue::Mapping(map)
    }
}

/// One inventory entry: a node name and the per-node document it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    pub name: String,
    pub document: String,
}

/// The parsed common document.
#[derive(Debug, Clone)]
pub struct CommonConfig {
    pub cluster: ClusterMeta,
    pub global: GlobalDefaults,
    /// The node-type defaults layer, untyped until after the merge.
    pub node_defaults: YamlValue,
    /// Inventory in document order. Ordering is preserved for deterministic
    /// listing output; lifecycle execution order is derived from roles, not
    /// from this list.
    pub inventory: Vec<InventoryEntry>,
}

#[derive(Debug, Deserialize)]
struct RawCommonConfig {
    #[serde(default)]
    cluster: ClusterMeta,
    #[serde(default)]
    global: GlobalDefaults,
    #[serde(default)]
    node_defaults: YamlValue,
    #[serde(default)]
    inventory: Vec<YamlValue>,
}

/// Parse the common document from a YAML string.
///
/// `document` identifies the source (usually a path) for error reporting.
pub fn parse(content: &str, document: &str) -> Result<CommonConfig> {
    let raw: RawCommonConfig =
        serde_yaml::from_str(content).map_err(|err| Error::ConfigParse {
            document: document.to_string(),
            message: err.to_string(),
        })?;

    let mut inventory = Vec::new();
    for entry in &raw.inventory {
        let map = entry.as_mapping().ok_or_else(|| Error::ConfigParse {
            document: document.to_string(),
            message: "inventory entries must be 'name: document' mappings".to_string(),
        })?;
        for (key, value) in map {
            let name = key.as_str().ok_or_else(|| Error::ConfigParse {
                document: document.to_string(),
                message: "inventory node names must be strings".to_string(),
            })?;
            let doc = value.as_str().ok_or_else(|| Error::ConfigParse {
                document: document.to_string(),
                message: format!("inventory entry '{}' must point at a document path", name),
            })?;
            inventory.push(InventoryEntry {
                name: name.to_string(),
                document: doc.to_string(),
            });
        }
    }

    Ok(CommonConfig {
        cluster: raw.cluster,
        global: raw.global,
        node_defaults: raw.node_defaults,
        inventory,
    })
}

/// Load and parse the common document from a file.
pub fn from_file(path: &Path) -> Result<CommonConfig> {
    let content = fs::read_to_string(path).map_err(|err| Error::ConfigParse {
        document: path.display().to_string(),
        message: err.to_string(),
    })?;
    parse(&content, &path.display().to_string())
}

/// A parsed per-node document: a list of partial node specs.
#[derive(Debug, Clone)]
pub struct NodeDocument {
    document: String,
    nodes: Vec<YamlValue>,
}

#[derive(Debug, Deserialize)]
struct RawNodeDocument {
    #[serde(default)]
    nodes: Vec<YamlValue>,
}

impl NodeDocument {
    /// Parse a per-node document from a YAML string.
    pub fn parse(content: &str, document: &str) -> Result<NodeDocument> {
        let raw: RawNodeDocument =
            serde_yaml::from_str(content).map_err(|err| Error::ConfigParse {
                document: document.to_string(),
                message: err.to_string(),
            })?;
        Ok(NodeDocument {
            document: document.to_string(),
            nodes: raw.nodes,
        })
    }

    /// Load and parse a per-node document from a file.
    pub fn from_file(path: &Path) -> Result<NodeDocument> {
        let content = fs::read_to_string(path).map_err(|err| Error::ConfigParse {
            document: path.display().to_string(),
            message: err.to_string(),
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Find the override tree for a named node.
    ///
    /// Prefers the entry whose `name` matches; a single anonymous entry is
    /// taken to describe the inventory node it was listed under.
    pub fn override_for(&self, name: &str) -> Result<YamlValue> {
        for entry in &self.nodes {
            if entry.get("name").and_then(YamlValue::as_str) == Some(name) {
                return Ok(entry.clone());
            }
        }
        if self.nodes.len() == 1 && self.nodes[0].get("name").is_none() {
            return Ok(self.nodes[0].clone());
        }
        Err(Error::ConfigParse {
            document: self.document.clone(),
            message: format!("no entry found for node '{}'", name),
        })
    }
}
