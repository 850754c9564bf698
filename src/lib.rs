//! # mpc: Multipass Cluster Control
//!
//! Core library behind the `mpc` command-line tool, which manages a small
//! fleet of Multipass virtual machines forming a local k3s cluster.
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`, `merge`)**: a layered YAML model. Global
//!   defaults, node-type defaults, and per-node overrides are deep-merged
//!   (global → defaults → node) into one authoritative spec per node.
//! - **Typed model (`node`, `registry`)**: merged trees are validated into
//!   immutable [`node::NodeSpec`] values held by a read-only
//!   [`registry::NodeRegistry`]; roles (controller vs worker) are resolved
//!   exactly once, at load time.
//! - **Hypervisor capability (`vm`)**: a narrow trait for per-node lifecycle
//!   actions and state queries, implemented by shelling out to `multipass`
//!   and replaced by a deterministic fake in tests.
//! - **Orchestration (`orchestrator`, `status`)**: lifecycle batches ordered
//!   by role (controllers before workers on start, the reverse on suspend
//!   and stop) with per-node outcome reports that never short-circuit, and
//!   cluster-wide status aggregation.
//! - **Provisioning (`provision`)**: `multipass launch` command construction
//!   and rendered-config generation from resolved specs.
//!
//! ## Execution Flow
//!
//! A typical invocation parses the common document (`config::from_file`),
//! loads and resolves the registry (`registry::NodeRegistry::load`), and
//! then hands it read-only to the orchestrator or status aggregator along
//! with a [`vm::VmController`]. Configuration errors abort before any VM is
//! touched; per-node action failures are collected into the report instead
//! of aborting the batch.

pub mod config;
pub mod error;
pub mod merge;
pub mod node;
pub mod orchestrator;
pub mod output;
pub mod provision;
pub mod registry;
pub mod status;
pub mod vm;
