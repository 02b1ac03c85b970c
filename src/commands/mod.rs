//! Command implementations.
//!
//! - [`scan`] - Audit key rotation and log stale keys to OCI Logging

pub mod scan;
