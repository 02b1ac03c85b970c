//! Resolution of a key version's creation time.
//!
//! Key versions are served by each vault's own management endpoint rather
//! than a regional control plane. Resolving a version therefore takes
//! two calls: one to the vault to discover its endpoint, and one to that
//! endpoint for the version. Endpoints are cached for the lifetime of one
//! [`VersionResolver`], which the scanner builds fresh for every run.

use crate::error::KeyError;
use crate::oci_api::ApiError;
use crate::utils::time::parse_service_timestamp;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

/// Vault metadata the resolver needs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub management_endpoint: String,
}

/// One generation of key material.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyVersion {
    pub id: String,
    pub key_id: String,
    #[serde(default)]
    pub vault_id: Option<String>,
    /// As sent by the service, possibly without an offset.
    pub time_created: String,
}

/// KMS vault and key-management service boundary.
#[async_trait]
pub trait KeyManagement: Send + Sync {
    async fn get_vault(&self, vault_id: &str) -> Result<Vault, ApiError>;

    /// Fetch a key version from a vault's management endpoint.
    async fn get_key_version(
        &self,
        management_endpoint: &str,
        key_id: &str,
        key_version_id: &str,
    ) -> Result<KeyVersion, ApiError>;
}

pub struct VersionResolver<'a> {
    kms: &'a dyn KeyManagement,
    endpoints: HashMap<String, String>,
}

impl<'a> VersionResolver<'a> {
    pub fn new(kms: &'a dyn KeyManagement) -> Self {
        Self {
            kms,
            endpoints: HashMap::new(),
        }
    }

    /// Creation instant of `key_version_id`, normalised to UTC.
    pub async fn resolve_version_time(
        &mut self,
        key_id: &str,
        key_version_id: &str,
        vault_id: &str,
    ) -> Result<DateTime<Utc>, KeyError> {
        let resolution = |source| KeyError::VersionResolution {
            key_id: key_id.to_string(),
            source,
        };

        let endpoint = self.management_endpoint(vault_id).await.map_err(resolution)?;
        let version = self
            .kms
            .get_key_version(&endpoint, key_id, key_version_id)
            .await
            .map_err(resolution)?;

        parse_service_timestamp(&version.time_created).ok_or_else(|| {
            KeyError::InvalidVersionTimestamp {
                key_id: key_id.to_string(),
                version_id: version.id.clone(),
                value: version.time_created.clone(),
            }
        })
    }

    async fn management_endpoint(&mut self, vault_id: &str) -> Result<String, ApiError> {
        if let Some(endpoint) = self.endpoints.get(vault_id) {
            return Ok(endpoint.clone());
        }
        let vault = self.kms.get_vault(vault_id).await?;
        tracing::debug!(
            vault = %vault_id,
            endpoint = %vault.management_endpoint,
            "resolved vault management endpoint"
        );
        self.endpoints
            .insert(vault_id.to_string(), vault.management_endpoint.clone());
        Ok(vault.management_endpoint)
    }

    /// Number of distinct vaults resolved so far.
    pub fn cached_vaults(&self) -> usize {
        self.endpoints.len()
    }
}
