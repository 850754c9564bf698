//! # Configuration Deep Merge
//!
//! Pure merge engine that collapses the three configuration layers
//! (global defaults, node-type defaults, node-specific overrides) into a
//! single YAML tree per node.
//!
//! ## Merge rules
//!
//! - Mappings merge recursively, key by key; keys absent from the higher
//!   layer inherit the base value unchanged.
//! - Scalars and sequences are replaced wholesale by the higher layer.
//!   Sequences are never concatenated or merged element-wise.
//! - An explicit `null` in the higher layer deliberately clears the key,
//!   which is distinct from omitting the key (inherit).
//! - A scalar or sequence overriding a mapping (or the reverse) is a
//!   structural conflict and fails the node's resolution outright.
//!
//! The functions here have no side effects and are deterministic; the same
//! three layers always produce the same resolved tree.

use serde_yaml::Value as YamlValue;

use crate::error::{Error, Result};

/// Get a human-readable type name for a YAML value, for error messages.
pub fn yaml_type_name(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "Null",
        YamlValue::Bool(_) => "Bool",
        YamlValue::Number(_) => "Number",
        YamlValue::String(_) => "String",
        YamlValue::Sequence(_) => "Sequence",
        YamlValue::Mapping(_) => "Mapping",
        YamlValue::Tagged(_) => "Tagged",
    }
}

/// Recursively merge `overlay` into `base` with override precedence.
///
/// `node` and `path` identify the node being resolved and the current
/// dotted key path, so a conflict can name exactly where it happened.
///
/// # Errors
///
/// Returns [`Error::MergeConflict`] when a mapping on one side meets a
/// non-null scalar or sequence on the other at the same key.
pub fn deep_merge(base: &mut YamlValue, overlay: &YamlValue, node: &str, path: &str) -> Result<()> {
    // An explicit null override clears the key regardless of base shape.
    if overlay.is_null() {
        *base = YamlValue::Null;
        return Ok(());
    }

    // A null base is empty; the overlay value simply lands there.
    if base.is_null() {
        *base = overlay.clone();
        return Ok(());
    }

    match base {
        YamlValue::Mapping(base_map) => {
            let overlay_map = match overlay {
                YamlValue::Mapping(map) => map,
                // Mapping on exactly one side is a structural conflict.
                other => {
                    return Err(Error::MergeConflict {
                        node: node.to_string(),
                        key: path.to_string(),
                        message: format!(
                            "override supplies {} where the base expects a Mapping",
                            yaml_type_name(other)
                        ),
                    })
                }
            };

            for (key, value) in overlay_map {
                let key_str = match key {
                    YamlValue::String(s) => s.clone(),
                    other => format!("{:?}", other),
                };
                let child_path = if path.is_empty() {
                    key_str
                } else {
                    format!("{}.{}", path, key_str)
                };

                match base_map.get_mut(key) {
                    Some(existing) => deep_merge(existing, value, node, &child_path)?,
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
            Ok(())
        }

        _ => {
            if overlay.is_mapping() {
                return Err(Error::MergeConflict {
                    node: node.to_string(),
                    key: path.to_string(),
                    message: format!(
                        "override supplies a Mapping where the base holds {}",
                        yaml_type_name(base)
                    ),
                });
            }
            // Scalars and sequences: the higher layer wins wholesale.
            *base = overlay.clone();
            Ok(())
        }
    }
}

/// Resolve one node's configuration tree from the three layers.
///
/// Precedence is strictly `global` → `node_type_defaults` → `node_override`;
/// a node-specific value always wins over a type default, which always wins
/// over the global default. A layer that is entirely absent (null) inherits
/// everything below it; the explicit-null-clears rule applies to keys within
/// a layer, not to whole documents.
pub fn resolve_layers(
    global: &YamlValue,
    node_type_defaults: &YamlValue,
    node_override: &YamlValue,
    node: &str,
) -> Result<YamlValue> {
    let mut resolved = global.clone();
    if resolved.is_null() {
        resolved = YamlValue::Mapping(Default::default());
    }
    if !node_type_defaults.is_null() {
        deep_merge(&mut resolved, node_type_defaults, node, "")?;
    }
    if !node_override.is_null() {
        deep_merge(&mut resolved, node_override, node, "")?;
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> YamlValue {
        serde_yaml::from_str(s).unwrap()
    }

    mod deep_merge_tests {
        use super::*;

        #[test]
        fn test_empty_override_is_identity() {
            let mut base = yaml("resources:\n  cpus: 2\n  memory: 2G");
            let expected = base.clone();
            deep_merge(&mut base, &YamlValue::Mapping(Default::default()), "n", "").unwrap();
            assert_eq!(base, expected);
        }

        #[test]
        fn test_override_wins_for_shared_keys() {
            let mut base = yaml("image: '22.04'\ndescription: base");
            let overlay = yaml("description: override");
            deep_merge(&mut base, &overlay, "n", "").unwrap();
            assert_eq!(base["description"], YamlValue::String("override".into()));
            assert_eq!(base["image"], YamlValue::String("22.04".into()));
        }

        #[test]
        fn test_partial_nested_override_keeps_siblings() {
            let mut base = yaml("resources:\n  cpus: 2\n  memory: 2G\n  disk: 10G");
            let overlay = yaml("resources:\n  memory: 4G");
            deep_merge(&mut base, &overlay, "n", "").unwrap();
            assert_eq!(base["resources"]["memory"], YamlValue::String("4G".into()));
            assert_eq!(base["resources"]["cpus"], YamlValue::Number(2.into()));
            assert_eq!(base["resources"]["disk"], YamlValue::String("10G".into()));
        }

        #[test]
        fn test_sequences_replaced_wholesale() {
            let mut base = yaml("mounts:\n  - a\n  - b\n  - c");
            let overlay = yaml("mounts:\n  - x");
            deep_merge(&mut base, &overlay, "n", "").unwrap();
            let mounts = base["mounts"].as_sequence().unwrap();
            assert_eq!(mounts.len(), 1);
            assert_eq!(mounts[0], YamlValue::String("x".into()));
        }

        #[test]
        fn test_explicit_null_clears_key() {
            let mut base = yaml("cloud_init: init.yaml");
            let overlay = yaml("cloud_init: null");
            deep_merge(&mut base, &overlay, "n", "").unwrap();
            assert_eq!(base["cloud_init"], YamlValue::Null);
        }

        #[test]
        fn test_absent_key_inherits() {
            let mut base = yaml("image: '22.04'");
            let overlay = yaml("description: hi");
            deep_merge(&mut base, &overlay, "n", "").unwrap();
            assert_eq!(base["image"], YamlValue::String("22.04".into()));
            assert_eq!(base["description"], YamlValue::String("hi".into()));
        }

        #[test]
        fn test_scalar_over_mapping_is_conflict() {
            let mut base = yaml("resources:\n  cpus: 2");
            let overlay = yaml("resources: big");
            let err = deep_merge(&mut base, &overlay, "k3s-worker-01", "").unwrap_err();
            match err {
                Error::MergeConflict { node, key, .. } => {
                    assert_eq!(node, "k3s-worker-01");
                    assert_eq!(key, "resources");
                }
                other => panic!("expected MergeConflict, got {:?}", other),
            }
        }

        #[test]
        fn test_mapping_over_scalar_is_conflict() {
            let mut base = yaml("image: '22.04'");
            let overlay = yaml("image:\n  tag: latest");
            let err = deep_merge(&mut base, &overlay, "n", "").unwrap_err();
            assert!(err.to_string().contains("image"));
        }

        #[test]
        fn test_conflict_reports_nested_key_path() {
            let mut base = yaml("network:\n  bridged: false");
            let overlay = yaml("network:\n  bridged:\n    on: true");
            let err = deep_merge(&mut base, &overlay, "n", "").unwrap_err();
            assert!(err.to_string().contains("network.bridged"));
        }

        #[test]
        fn test_mapping_lands_on_null_base() {
            let mut base = yaml("network: null");
            let overlay = yaml("network:\n  bridged: true");
            deep_merge(&mut base, &overlay, "n", "").unwrap();
            assert_eq!(base["network"]["bridged"], YamlValue::Bool(true));
        }

        #[test]
        fn test_new_keys_inserted() {
            let mut base = yaml("image: '22.04'");
            let overlay = yaml("mounts:\n  - /data");
            deep_merge(&mut base, &overlay, "n", "").unwrap();
            assert!(base["mounts"].is_sequence());
        }
    }

    mod resolve_layers_tests {
        use super::*;

        #[test]
        fn test_precedence_global_to_defaults_to_override() {
            let global = yaml("image: '20.04'\nresources:\n  cpus: 1\n  memory: 1G");
            let defaults = yaml("image: '22.04'\nresources:\n  cpus: 2");
            let node = yaml("resources:\n  cpus: 4");
            let resolved = resolve_layers(&global, &defaults, &node, "n").unwrap();
            assert_eq!(resolved["image"], YamlValue::String("22.04".into()));
            assert_eq!(resolved["resources"]["cpus"], YamlValue::Number(4.into()));
            // Untouched by either higher layer: inherited from global.
            assert_eq!(resolved["resources"]["memory"], YamlValue::String("1G".into()));
        }

        #[test]
        fn test_absent_defaults_layer_inherits_global() {
            let global = yaml("image: '22.04'\nresources:\n  cpus: 2");
            let node = yaml("resources:\n  cpus: 4");
            let resolved = resolve_layers(&global, &YamlValue::Null, &node, "n").unwrap();
            assert_eq!(resolved["image"], YamlValue::String("22.04".into()));
            assert_eq!(resolved["resources"]["cpus"], YamlValue::Number(4.into()));
        }

        #[test]
        fn test_null_global_layer_is_empty() {
            let defaults = yaml("description: K3s node");
            let node = YamlValue::Mapping(Default::default());
            let resolved = resolve_layers(&YamlValue::Null, &defaults, &node, "n").unwrap();
            assert_eq!(resolved["description"], YamlValue::String("K3s node".into()));
        }

        #[test]
        fn test_layers_are_not_mutated() {
            let global = yaml("resources:\n  cpus: 2");
            let defaults = yaml("resources:\n  cpus: 3");
            let node = yaml("resources:\n  cpus: 4");
            let global_before = global.clone();
            let defaults_before = defaults.clone();
            resolve_layers(&global, &defaults, &node, "n").unwrap();
            assert_eq!(global, global_before);
            assert_eq!(defaults, defaults_before);
        }
    }
}
