//! KMS vault (`/20180608`) and per-vault key management client.

use super::{build_url, ApiError, OciClient};
use crate::key_version::{KeyManagement, KeyVersion, Vault};
use async_trait::async_trait;

const API_VERSION: &str = "/20180608";

pub struct KmsClient {
    client: OciClient,
    vault_base: String,
}

impl KmsClient {
    /// `vault_base` is the regional KMS endpoint that serves `GetVault`.
    pub fn new(client: OciClient, vault_base: impl Into<String>) -> Self {
        Self {
            client,
            vault_base: vault_base.into(),
        }
    }
}

#[async_trait]
impl KeyManagement for KmsClient {
    async fn get_vault(&self, vault_id: &str) -> Result<Vault, ApiError> {
        let path = format!("{}/vaults/{}", API_VERSION, vault_id);
        let url = build_url(&self.vault_base, &path, &[])?;
        Ok(self.client.get::<Vault>(url).await?.body)
    }

    async fn get_key_version(
        &self,
        management_endpoint: &str,
        key_id: &str,
        key_version_id: &str,
    ) -> Result<KeyVersion, ApiError> {
        let url = build_url(
            management_endpoint,
            &format!("{}/keys/{}/keyVersions/{}", API_VERSION, key_id, key_version_id),
            &[],
        )?;
        Ok(self.client.get::<KeyVersion>(url).await?.body)
    }
}
