//! # Resolved Node Model
//!
//! Typed representation of a cluster node after the configuration layers
//! have been merged. The raw YAML tree is validated and converted here, at
//! the loader/merger boundary; everything downstream (registry,
//! orchestrator, status) works only with these types and never re-inspects
//! untyped key-value trees.
//!
//! Role classification happens exactly once, at conversion time. An
//! explicit `type` field in the merged configuration is authoritative;
//! otherwise the node name is classified by case-insensitive substring
//! match against `"main"` (controller) and `"worker"`. A name matching both
//! or neither patterns is a configuration error, never a silent default.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::Value as YamlValue;

use crate::error::{Error, Result};

/// The role a node plays in the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Hosts the Kubernetes control plane.
    Controller,
    /// Joins an existing control plane to run workloads.
    Worker,
}

impl Role {
    /// Resolve a node's role from its name and optional explicit `type`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RoleResolution`] when the explicit type literal is
    /// unknown, or when the name matches both or neither role pattern.
    pub fn resolve(name: &str, explicit: Option<&str>) -> Result<Role> {
        if let Some(literal) = explicit {
            return match literal {
                "controller" => Ok(Role::Controller),
                "worker" => Ok(Role::Worker),
                other => Err(Error::RoleResolution {
                    node: name.to_string(),
                    message: format!(
                        "unknown type '{}' (expected 'controller' or 'worker')",
                        other
                    ),
                }),
            };
        }

        let lowered = name.to_lowercase();
        let is_main = lowered.contains("main");
        let is_worker = lowered.contains("worker");
        match (is_main, is_worker) {
            (true, false) => Ok(Role::Controller),
            (false, true) => Ok(Role::Worker),
            (true, true) => Err(Error::RoleResolution {
                node: name.to_string(),
                message: "name matches both 'main' and 'worker'; add an explicit 'type'"
                    .to_string(),
            }),
            (false, false) => Err(Error::RoleResolution {
                node: name.to_string(),
                message: "name matches neither 'main' nor 'worker'; add an explicit 'type'"
                    .to_string(),
            }),
        }
    }

    /// Human-readable label used in CLI output.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Controller => "main",
            Role::Worker => "worker",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A size with unit suffix, e.g. `2G` or `512M`.
///
/// Stored internally in kibibytes so sizes with different units sum
/// exactly. Accepted suffixes are `K`, `M`, and `G`; the quantity must be a
/// positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct SizeValue {
    kib: u64,
}

impl SizeValue {
    const KIB_PER_MIB: u64 = 1024;
    const KIB_PER_GIB: u64 = 1024 * 1024;

    /// Construct from a quantity in gibibytes, saturating at `u64::MAX` KiB.
    pub fn gib(amount: u64) -> Self {
        SizeValue {
            kib: amount.saturating_mul(Self::KIB_PER_GIB),
        }
    }

    /// Construct from a quantity in mebibytes, saturating at `u64::MAX` KiB.
    pub fn mib(amount: u64) -> Self {
        SizeValue {
            kib: amount.saturating_mul(Self::KIB_PER_MIB),
        }
    }

    /// Sum of two sizes.
    pub fn saturating_add(self, other: SizeValue) -> SizeValue {
        SizeValue {
            kib: self.kib.saturating_add(other.kib),
        }
    }
}

impl FromStr for SizeValue {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let unit = chars
            .next_back()
            .ok_or_else(|| "size must not be empty".to_string())?;
        let digits = chars.as_str();
        let amount: u64 = digits
            .parse()
            .map_err(|_| format!("'{}' is not a positive integer quantity", digits))?;
        if amount == 0 {
            return Err(format!("size '{}' must be positive", s));
        }
        let kib = match unit {
            'K' | 'k' => Some(amount),
            'M' | 'm' => amount.checked_mul(Self::KIB_PER_MIB),
            'G' | 'g' => amount.checked_mul(Self::KIB_PER_GIB),
            other => {
                return Err(format!(
                    "unknown size unit '{}' (expected K, M, or G)",
                    other
                ))
            }
        };
        let kib = kib.ok_or_else(|| format!("size '{}' is too large", s))?;
        Ok(SizeValue { kib })
    }
}

impl fmt::Display for SizeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Render with the largest unit that divides exactly.
        if self.kib % Self::KIB_PER_GIB == 0 {
            write!(f, "{}G", self.kib / Self::KIB_PER_GIB)
        } else if self.kib % Self::KIB_PER_MIB == 0 {
            write!(f, "{}M", self.kib / Self::KIB_PER_MIB)
        } else {
            write!(f, "{}K", self.kib)
        }
    }
}

impl Serialize for SizeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SizeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Compute resources assigned to one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// CPU count; must be positive.
    #[serde(default = "default_cpus")]
    pub cpus: u32,
    /// Memory size, e.g. "2G".
    #[serde(default = "default_memory")]
    pub memory: SizeValue,
    /// Disk size, e.g. "10G".
    #[serde(default = "default_disk")]
    pub disk: SizeValue,
}

fn default_cpus() -> u32 {
    2
}

fn default_memory() -> SizeValue {
    SizeValue::gib(2)
}

fn default_disk() -> SizeValue {
    SizeValue::gib(10)
}

impl Default for ResourceSpec {
    fn default() -> Self {
        ResourceSpec {
            cpus: default_cpus(),
            memory: default_memory(),
            disk: default_disk(),
        }
    }
}

/// Network configuration for one node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Attach the VM to the host bridge.
    #[serde(default)]
    pub bridged: bool,
}

/// A host directory mounted into the VM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountSpec {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub readonly: bool,
}

/// Intermediate deserialization target for a merged node tree.
///
/// Tolerates unknown keys so operator-specific extras (e.g. `system`
/// blocks) pass through the merge without failing typed conversion.
#[derive(Debug, Default, Deserialize)]
struct RawNodeSpec {
    name: Option<String>,
    r#type: Option<String>,
    description: Option<String>,
    #[serde(default)]
    resources: Option<ResourceSpec>,
    #[serde(default)]
    network: Option<NetworkSpec>,
    #[serde(default)]
    mounts: Option<Vec<MountSpec>>,
    image: Option<String>,
    cloud_init: Option<String>,
}

/// A fully resolved node specification.
///
/// Created once by the merge engine, immutable afterward, and consumed
/// read-only by the orchestrator and status aggregator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSpec {
    pub name: String,
    #[serde(rename = "type", serialize_with = "serialize_role")]
    pub role: Role,
    pub description: String,
    pub resources: ResourceSpec,
    pub network: NetworkSpec,
    pub mounts: Vec<MountSpec>,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_init: Option<String>,
}

fn serialize_role<S: Serializer>(role: &Role, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(match role {
        Role::Controller => "controller",
        Role::Worker => "worker",
    })
}

/// Drop null-valued mapping entries recursively.
///
/// After the merge, a null means the key was deliberately cleared; for the
/// typed model that is the same as never having been set.
fn prune_nulls(value: &YamlValue) -> YamlValue {
    match value {
        YamlValue::Mapping(map) => YamlValue::Mapping(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), prune_nulls(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

impl NodeSpec {
    /// Validate and convert a merged YAML tree into a typed spec.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigParse`] for malformed fields (bad size units,
    /// zero cpus, empty name) and [`Error::RoleResolution`] when the role
    /// cannot be determined.
    pub fn from_value(name: &str, merged: &YamlValue) -> Result<NodeSpec> {
        if name.trim().is_empty() {
            return Err(Error::ConfigParse {
                document: "inventory".to_string(),
                message: "node name must be non-empty".to_string(),
            });
        }

        // Keys cleared by an explicit null override read as absent here, so
        // the documented defaults apply to them.
        let raw: RawNodeSpec =
            serde_yaml::from_value(prune_nulls(merged)).map_err(|err| Error::ConfigParse {
                document: format!("node '{}'", name),
                message: err.to_string(),
            })?;

        if let Some(declared) = raw.name.as_deref() {
            if declared != name {
                return Err(Error::ConfigParse {
                    document: format!("node '{}'", name),
                    message: format!(
                        "document declares name '{}' but the inventory entry is '{}'",
                        declared, name
                    ),
                });
            }
        }

        let role = Role::resolve(name, raw.r#type.as_deref())?;

        let resources = raw.resources.unwrap_or_default();
        if resources.cpus == 0 {
            return Err(Error::ConfigParse {
                document: format!("node '{}'", name),
                message: "resources.cpus must be positive".to_string(),
            });
        }

        Ok(NodeSpec {
            name: name.to_string(),
            role,
            description: raw.description.unwrap_or_else(|| "K3s node".to_string()),
            resources,
            network: raw.network.unwrap_or_default(),
            mounts: raw.mounts.unwrap_or_default(),
            image: raw.image.unwrap_or_else(|| "22.04".to_string()),
            cloud_init: raw.cloud_init,
        })
    }
}
