//! Error taxonomy for a scan.
//!
//! [`ScanError`] ends the run. [`KeyError`] only affects the key it names:
//! the orchestrator matches on it, records a diagnostic and moves on.

use crate::oci_api::ApiError;
use std::time::Duration;
use thiserror::Error;

/// Failures that abort the whole scan.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("inventory query failed: {0}")]
    InventoryQuery(#[source] ApiError),

    #[error("{entity} '{name}' did not become ACTIVE within {}s", elapsed.as_secs())]
    ProvisioningTimeout {
        entity: &'static str,
        name: String,
        elapsed: Duration,
    },

    #[error("failed to provision {entity} '{name}': {source}")]
    Provisioning {
        entity: &'static str,
        name: String,
        #[source]
        source: ApiError,
    },
}

/// Failures confined to a single key.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("missing {missing} for key: {key_id}")]
    MalformedInventoryEntry {
        key_id: String,
        missing: &'static str,
    },

    #[error("error fetching version info for key: {key_id} - {source}")]
    VersionResolution {
        key_id: String,
        #[source]
        source: ApiError,
    },

    #[error("unparseable creation time '{value}' on version {version_id} of key {key_id}")]
    InvalidVersionTimestamp {
        key_id: String,
        version_id: String,
        value: String,
    },

    #[error("failed to emit rotation alert for key: {key_id} - {source}")]
    AlertEmission {
        key_id: String,
        #[source]
        source: ApiError,
    },
}

impl KeyError {
    pub fn key_id(&self) -> &str {
        match self {
            Self::MalformedInventoryEntry { key_id, .. }
            | Self::VersionResolution { key_id, .. }
            | Self::InvalidVersionTimestamp { key_id, .. }
            | Self::AlertEmission { key_id, .. } => key_id,
        }
    }
}
