//! # VM Provisioning
//!
//! Turns resolved node specifications into `multipass launch` invocations,
//! and renders them back out as standalone YAML documents for inspection.
//!
//! Creation follows the same continue-on-error policy as lifecycle batches:
//! a node that fails to launch is recorded and the remaining nodes are
//! still attempted.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::{Error, Result};
use crate::node::NodeSpec;
use crate::orchestrator::NodeOutcome;
use crate::registry::NodeRegistry;
use crate::vm::VmProvisioner;

/// Build the `multipass launch` argument vector for one node.
///
/// The binary name itself is not included; the provisioner capability owns
/// that.
pub fn launch_command(spec: &NodeSpec) -> Vec<String> {
    let mut argv = vec![
        "launch".to_string(),
        "--name".to_string(),
        spec.name.clone(),
        "--cpus".to_string(),
        spec.resources.cpus.to_string(),
        "--memory".to_string(),
        spec.resources.memory.to_string(),
        "--disk".to_string(),
        spec.resources.disk.to_string(),
        spec.image.clone(),
    ];

    if spec.network.bridged {
        argv.push("--bridged".to_string());
    }

    for mount in &spec.mounts {
        let mut arg = format!("{}:{}", mount.source, mount.target);
        if mount.readonly {
            arg.push_str(":ro");
        }
        argv.push("--mount".to_string());
        argv.push(arg);
    }

    if let Some(cloud_init) = &spec.cloud_init {
        if Path::new(cloud_init).exists() {
            argv.push("--cloud-init".to_string());
            argv.push(cloud_init.clone());
        } else {
            warn!(
                "cloud-init file '{}' for node '{}' not found, skipping",
                cloud_init, spec.name
            );
        }
    }

    argv
}

/// Render a launch argument vector for display in dry runs.
pub fn format_command(argv: &[String]) -> String {
    let mut out = String::from("multipass");
    for arg in argv {
        let _ = write!(out, " {}", arg);
    }
    out
}

/// Create every node in the registry, in inventory order.
///
/// Each node's outcome is recorded; a failed launch does not stop the
/// remaining nodes from being attempted.
pub fn provision_all(
    registry: &NodeRegistry,
    provisioner: &dyn VmProvisioner,
) -> Vec<NodeOutcome> {
    let mut outcomes = Vec::with_capacity(registry.len());

    for node in registry.iter() {
        info!("launching node '{}' ({})", node.name, node.role);
        let result = provisioner.launch(&launch_command(node));
        if let Err(err) = &result {
            warn!("{}", err);
        }
        outcomes.push(NodeOutcome {
            name: node.name.clone(),
            role: node.role,
            result,
        });
    }

    outcomes
}

/// Write each resolved spec to `<out_dir>/<name>.yaml`.
///
/// Returns the written paths in inventory order.
pub fn write_rendered(registry: &NodeRegistry, out_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)?;

    let mut written = Vec::with_capacity(registry.len());
    for node in registry.iter() {
        let rendered = serde_yaml::to_string(node).map_err(Error::Yaml)?;
        let path = out_dir.join(format!("{}.yaml", node.name));
        fs::write(&path, rendered)?;
        info!("generated {}", path.display());
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{MountSpec, NetworkSpec, ResourceSpec, Role, SizeValue};

    fn spec() -> NodeSpec {
        NodeSpec {
            name: "k3s-worker-01".to_string(),
            role: Role::Worker,
            description: "worker".to_string(),
            resources: ResourceSpec {
                cpus: 4,
                memory: SizeValue::gib(4),
                disk: SizeValue::gib(20),
            },
            network: NetworkSpec { bridged: false },
            mounts: vec![],
            image: "22.04".to_string(),
            cloud_init: None,
        }
    }

    #[test]
    fn test_launch_command_basic() {
        let argv = launch_command(&spec());
        assert_eq!(
            argv,
            [
                "launch", "--name", "k3s-worker-01", "--cpus", "4", "--memory", "4G",
                "--disk", "20G", "22.04"
            ]
        );
    }

    #[test]
    fn test_launch_command_bridged_and_mounts() {
        let mut spec = spec();
        spec.network = NetworkSpec { bridged: true };
        spec.mounts = vec![
            MountSpec {
                source: "/srv/data".to_string(),
                target: "/data".to_string(),
                readonly: false,
            },
            MountSpec {
                source: "/srv/conf".to_string(),
                target: "/conf".to_string(),
                readonly: true,
            },
        ];
        let argv = launch_command(&spec);
        assert!(argv.contains(&"--bridged".to_string()));
        assert!(argv.contains(&"/srv/data:/data".to_string()));
        assert!(argv.contains(&"/srv/conf:/conf:ro".to_string()));
    }

    #[test]
    fn test_launch_command_skips_missing_cloud_init() {
        let mut spec = spec();
        spec.cloud_init = Some("/nonexistent/init.yaml".to_string());
        let argv = launch_command(&spec);
        assert!(!argv.contains(&"--cloud-init".to_string()));
    }

    #[test]
    fn test_launch_command_includes_existing_cloud_init() {
        let dir = tempfile::tempdir().unwrap();
        let init = dir.path().join("init.yaml");
        std::fs::write(&init, "#cloud-config\n").unwrap();

        let mut spec = spec();
        spec.cloud_init = Some(init.display().to_string());
        let argv = launch_command(&spec);
        assert!(argv.contains(&"--cloud-init".to_string()));
    }

    #[test]
    fn test_format_command_display() {
        let formatted = format_command(&launch_command(&spec()));
        assert!(formatted.starts_with("multipass launch --name k3s-worker-01"));
    }

    #[test]
    fn test_write_rendered_round_trips() {
        use crate::config;
        use serde_yaml::Value as YamlValue;

        let common = config::parse("inventory: []", "common.yaml").unwrap();
        let overrides = vec![(
            "k3s-main-01".to_string(),
            serde_yaml::from_str::<YamlValue>("resources:\n  memory: 4G").unwrap(),
        )];
        let registry = NodeRegistry::resolve(&common, overrides).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let written = write_rendered(&registry, dir.path()).unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].ends_with("k3s-main-01.yaml"));

        let content = std::fs::read_to_string(&written[0]).unwrap();
        let parsed: YamlValue = serde_yaml::from_str(&content).unwrap();
        assert_eq!(parsed["type"], YamlValue::String("controller".into()));
        assert_eq!(
            parsed["resources"]["memory"],
            YamlValue::String("4G".into())
        );
    }
}
