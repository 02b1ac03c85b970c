//! # OCI Key Rotation Audit
//!
//! Audits key rotation across an Oracle Cloud Infrastructure tenancy. It finds
//! every enabled Vault key, works out when its current key version was
//! created, and writes an alert to a custom OCI log for every key that has
//! gone more than 180 days without rotation.
//!
//! ## Pipeline
//!
//! ```text
//! inventory::query_keys ─┐
//!                        ├─> for each key: key_version ─> compliance ─> alert
//! provisioning (sink) ───┘
//! ```
//!
//! - [`inventory`] - Resource Search query for enabled keys
//! - [`provisioning`] - Idempotent log group / log stream provisioning
//! - [`key_version`] - Per-vault lookup of the current version's creation time
//! - [`compliance`] - The 180-day rotation policy
//! - [`alert`] - Alert records and delivery through Logging Ingestion
//! - [`scan`] - The orchestrator tying it together
//!
//! Supporting modules:
//!
//! - [`oci_api`] - Signed HTTP transport and the per-service clients
//! - [`config`] - OCI profile loading and scan settings
//! - [`error`] - Fatal and per-key error types
//! - [`commands`] - CLI command implementations
//! - [`utils`] - Time, formatting and progress helpers
//!
//! ## Failure model
//!
//! A failed inventory query or a sink that never becomes ACTIVE ends the run
//! with an error. Everything that can go wrong with a single key (missing
//! fields, an unreachable vault, a failed alert) is recorded against that key
//! and the scan continues.
//!
//! ## Example Usage
//!
//! ```bash
//! key-rotation-audit scan
//! key-rotation-audit scan --profile AUDIT --compartment-id ocid1.compartment.oc1..xxxx
//! key-rotation-audit scan --dry-run --output report.json
//! ```

pub mod alert;
pub mod commands;
pub mod compliance;
pub mod config;
pub mod error;
pub mod inventory;
pub mod key_version;
pub mod logging;
pub mod oci_api;
pub mod provisioning;
pub mod scan;
pub mod utils;
