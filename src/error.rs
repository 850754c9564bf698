//! # Error Handling
//!
//! Centralized error type for the `mpc` tool, built with `thiserror`.
//!
//! Errors fall into two families with different propagation rules:
//!
//! - **Configuration-time errors** (`ConfigParse`, `MergeConflict`,
//!   `RoleResolution`, `Resolution`) are fatal. They mean the desired
//!   cluster state cannot even be computed, so the run aborts before any
//!   VM action is attempted.
//!
//! - **Node-scoped runtime errors** (`Action`, `Query`) are not fatal to a
//!   batch. The orchestrator and status aggregator record them per node and
//!   keep going; the aggregate report carries the failures.

use thiserror::Error;

/// Main error type for mpc operations
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration document could not be parsed or is structurally
    /// invalid. Includes the offending document identifier.
    #[error("Configuration error in {document}: {message}")]
    ConfigParse { document: String, message: String },

    /// A base value and an override value at the same key have incompatible
    /// shapes (scalar vs mapping in either direction).
    #[error("Merge conflict for node '{node}' at key '{key}': {message}")]
    MergeConflict {
        node: String,
        key: String,
        message: String,
    },

    /// A node's role could not be determined: its name matches both or
    /// neither of the "main"/"worker" patterns and no explicit `type`
    /// override is present, or the explicit `type` literal is unknown.
    #[error("Cannot resolve role for node '{node}': {message}")]
    RoleResolution { node: String, message: String },

    /// One or more nodes failed to resolve. Collected so a single run
    /// reports every bad node instead of stopping at the first.
    #[error("Failed to resolve {} node(s):\n{}", failures.len(), format_failures(failures))]
    Resolution { failures: Vec<Error> },

    /// A hypervisor-level lifecycle action failed for one node.
    #[error("Action failed for node '{node}': {message}")]
    Action { node: String, message: String },

    /// A hypervisor-level state query failed for one node.
    #[error("State query failed for node '{node}': {message}")]
    Query { node: String, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn format_failures(failures: &[Error]) -> String {
    failures
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config_parse() {
        let error = Error::ConfigParse {
            document: "config/common.yaml".to_string(),
            message: "missing inventory".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("config/common.yaml"));
        assert!(display.contains("missing inventory"));
    }

    #[test]
    fn test_error_display_merge_conflict() {
        let error = Error::MergeConflict {
            node: "k3s-worker-01".to_string(),
            key: "resources".to_string(),
            message: "expected mapping, found String".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("k3s-worker-01"));
        assert!(display.contains("resources"));
        assert!(display.contains("expected mapping"));
    }

    #[test]
    fn test_error_display_role_resolution() {
        let error = Error::RoleResolution {
            node: "k3s-node-01".to_string(),
            message: "name matches neither 'main' nor 'worker'".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("k3s-node-01"));
        assert!(display.contains("neither"));
    }

    #[test]
    fn test_error_display_resolution_lists_each_failure() {
        let error = Error::Resolution {
            failures: vec![
                Error::RoleResolution {
                    node: "a".to_string(),
                    message: "first".to_string(),
                },
                Error::RoleResolution {
                    node: "b".to_string(),
                    message: "second".to_string(),
                },
            ],
        };
        let display = format!("{}", error);
        assert!(display.contains("2 node(s)"));
        assert!(display.contains("first"));
        assert!(display.contains("second"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("File not found"));
    }

    #[test]
    fn test_error_from_yaml_error() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: [unclosed").unwrap_err();
        let error: Error = yaml_error.into();
        let display = format!("{}", error);
        assert!(display.contains("YAML parsing error"));
    }
}
