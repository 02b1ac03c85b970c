//! Key resource discovery through OCI Resource Search.
//!
//! The scanner runs one structured query for every enabled key in the
//! tenancy and walks pagination until the result set is exhausted. Any
//! failure here is fatal for the scan.

use crate::error::ScanError;
use crate::oci_api::ApiError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Resource type queried by the scanner.
pub const KEY_RESOURCE_TYPE: &str = "key";

/// Lifecycle state a key must be in to be audited.
pub const ENABLED_STATE: &str = "ENABLED";

/// Additional-details field holding the current key version OCID.
pub const CURRENT_KEY_VERSION_FIELD: &str = "currentKeyVersion";

/// Additional-details field holding the owning vault OCID.
pub const VAULT_ID_FIELD: &str = "vaultId";

/// Build a structured search query for resources of one type and state.
///
/// ```
/// use oci_key_rotation_audit::inventory::structured_query;
///
/// assert_eq!(
///     structured_query("key", "ENABLED"),
///     "query key resources return allAdditionalFields where lifecycleState = 'ENABLED'"
/// );
/// ```
pub fn structured_query(resource_type: &str, lifecycle_state: &str) -> String {
    format!(
        "query {} resources return allAdditionalFields where lifecycleState = '{}'",
        resource_type, lifecycle_state
    )
}

/// A key resource as returned by Resource Search.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyResource {
    pub identifier: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub compartment_id: String,
    /// Kept as the service sent it; it is only echoed into alerts.
    #[serde(default)]
    pub time_created: Option<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub lifecycle_state: Option<String>,
    #[serde(default)]
    pub additional_details: Map<String, Value>,
}

impl KeyResource {
    /// OCID of the key version currently in use.
    pub fn current_key_version(&self) -> Option<&str> {
        self.detail(CURRENT_KEY_VERSION_FIELD)
    }

    /// OCID of the vault that owns this key.
    pub fn vault_id(&self) -> Option<&str> {
        self.detail(VAULT_ID_FIELD)
    }

    fn detail(&self, field: &str) -> Option<&str> {
        self.additional_details
            .get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    fn is_enabled(&self) -> bool {
        self.lifecycle_state
            .as_deref()
            .map_or(true, |state| state.eq_ignore_ascii_case(ENABLED_STATE))
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub items: Vec<KeyResource>,
    pub next_page: Option<String>,
}

/// Resource Search service boundary.
#[async_trait]
pub trait ResourceSearch: Send + Sync {
    /// Run a structured query, starting at `page` when continuing a listing.
    async fn search_page(&self, query: &str, page: Option<&str>) -> Result<SearchPage, ApiError>;
}

/// Return every enabled key in the tenancy, in the order the service lists them.
pub async fn query_keys(search: &dyn ResourceSearch) -> Result<Vec<KeyResource>, ScanError> {
    let query = structured_query(KEY_RESOURCE_TYPE, ENABLED_STATE);
    let mut keys = Vec::new();
    let mut page: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let result = search
            .search_page(&query, page.as_deref())
            .await
            .map_err(ScanError::InventoryQuery)?;
        pages += 1;

        keys.extend(result.items.into_iter().filter(|key| {
            let keep = key.is_enabled();
            if !keep {
                tracing::debug!(
                    key = %key.identifier,
                    state = ?key.lifecycle_state,
                    "ignoring key that is not enabled"
                );
            }
            keep
        }));

        match result.next_page {
            Some(next) if !next.is_empty() => page = Some(next),
            _ => break,
        }
    }

    tracing::info!(keys = keys.len(), pages, "inventory query complete");
    Ok(keys)
}
