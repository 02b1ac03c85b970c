//! In-memory fakes for the OCI service traits.
#![allow(dead_code)]

use async_trait::async_trait;
use oci_key_rotation_audit::alert::{LogIngestion, PutLogsDetails};
use oci_key_rotation_audit::inventory::{KeyResource, ResourceSearch, SearchPage};
use oci_key_rotation_audit::key_version::{KeyManagement, KeyVersion, Vault};
use oci_key_rotation_audit::oci_api::ApiError;
use oci_key_rotation_audit::provisioning::{LifecycleState, LoggingManagement, ManagedEntity};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

pub const COMPARTMENT: &str = "ocid1.tenancy.oc1..tenancy";

pub fn key(id: &str, version: Option<&str>, vault: Option<&str>) -> KeyResource {
    let mut details = Map::new();
    if let Some(v) = version {
        details.insert("currentKeyVersion".into(), Value::String(v.into()));
    }
    if let Some(v) = vault {
        details.insert("vaultId".into(), Value::String(v.into()));
    }
    serde_json::from_value(json!({
        "identifier": id,
        "compartmentId": "ocid1.compartment.oc1..keys",
        "timeCreated": "2024-01-01T00:00:00.000Z",
        "resourceType": "Key",
        "lifecycleState": "ENABLED",
        "additionalDetails": details,
    }))
    .unwrap()
}

// ---------------------------------------------------------------------------
// Resource Search
// ---------------------------------------------------------------------------

pub struct FakeSearch {
    pages: Vec<SearchPage>,
    fail: bool,
    pub calls: Mutex<usize>,
}

impl FakeSearch {
    pub fn new(keys: Vec<KeyResource>) -> Self {
        Self {
            pages: vec![SearchPage {
                items: keys,
                next_page: None,
            }],
            fail: false,
            calls: Mutex::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            pages: Vec::new(),
            fail: true,
            calls: Mutex::new(0),
        }
    }
}

#[async_trait]
impl ResourceSearch for FakeSearch {
    async fn search_page(&self, _query: &str, page: Option<&str>) -> Result<SearchPage, ApiError> {
        *self.calls.lock().unwrap() += 1;
        if self.fail {
            return Err(ApiError::service(500, "InternalServerError", "search is down"));
        }
        let index = page.map(|p| p.parse::<usize>().unwrap()).unwrap_or(0);
        Ok(self.pages[index].clone())
    }
}

// ---------------------------------------------------------------------------
// Logging Management
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Group,
    Stream,
}

#[derive(Debug, Clone)]
struct FakeEntity {
    kind: Kind,
    id: String,
    name: String,
    parent: String,
    state: LifecycleState,
    /// Becomes ACTIVE on this observation (1-based). `None` never transitions.
    activate_on: Option<usize>,
    observations: usize,
}

impl FakeEntity {
    fn observe(&mut self) -> ManagedEntity {
        self.observations += 1;
        if let Some(n) = self.activate_on {
            if self.observations >= n {
                self.state = LifecycleState::Active;
            }
        }
        ManagedEntity {
            id: self.id.clone(),
            display_name: self.name.clone(),
            lifecycle_state: self.state,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateBehavior {
    /// Accept the request; the entity shows up as CREATING.
    Accept,
    /// Reply 409, as if a concurrent scan won the race; the entity exists.
    Conflict,
    /// Reply 500 and create nothing.
    Fail,
}

struct LoggingState {
    entities: Vec<FakeEntity>,
    next_id: usize,
    created_activate_on: Option<usize>,
    create_behavior: CreateBehavior,
    creates: Vec<(String, String)>,
    lists: usize,
    gets: usize,
}

pub struct FakeLogging {
    state: Mutex<LoggingState>,
}

impl FakeLogging {
    /// Empty compartment. Created entities turn ACTIVE on their first poll.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LoggingState {
                entities: Vec::new(),
                next_id: 1,
                created_activate_on: Some(1),
                create_behavior: CreateBehavior::Accept,
                creates: Vec::new(),
                lists: 0,
                gets: 0,
            }),
        }
    }

    /// Group and stream that already exist and are ACTIVE.
    pub fn with_active_sink(group_id: &str, stream_id: &str) -> Self {
        Self::new()
            .with_group(group_id, "OCI_Config_Monitor", LifecycleState::Active, None)
            .with_stream(
                stream_id,
                group_id,
                "Key_Rotation_Check",
                LifecycleState::Active,
                None,
            )
    }

    /// Newly created entities become ACTIVE on their `n`th observation.
    pub fn created_activate_on(self, n: Option<usize>) -> Self {
        self.state.lock().unwrap().created_activate_on = n;
        self
    }

    pub fn create_behavior(self, behavior: CreateBehavior) -> Self {
        self.state.lock().unwrap().create_behavior = behavior;
        self
    }

    pub fn with_group(
        self,
        id: &str,
        name: &str,
        state: LifecycleState,
        activate_on: Option<usize>,
    ) -> Self {
        self.insert(Kind::Group, id, name, COMPARTMENT, state, activate_on);
        self
    }

    pub fn with_stream(
        self,
        id: &str,
        group_id: &str,
        name: &str,
        state: LifecycleState,
        activate_on: Option<usize>,
    ) -> Self {
        self.insert(Kind::Stream, id, name, group_id, state, activate_on);
        self
    }

    fn insert(
        &self,
        kind: Kind,
        id: &str,
        name: &str,
        parent: &str,
        state: LifecycleState,
        activate_on: Option<usize>,
    ) {
        self.state.lock().unwrap().entities.push(FakeEntity {
            kind,
            id: id.to_string(),
            name: name.to_string(),
            parent: parent.to_string(),
            state,
            activate_on,
            observations: 0,
        });
    }

    /// `(parent, name)` of every create call.
    pub fn creates(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().creates.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().lists
    }

    pub fn get_calls(&self) -> usize {
        self.state.lock().unwrap().gets
    }

    fn list(&self, kind: Kind, parent: &str, name: &str) -> Vec<ManagedEntity> {
        let mut state = self.state.lock().unwrap();
        state.lists += 1;
        state
            .entities
            .iter_mut()
            .filter(|e| e.kind == kind && e.parent == parent && e.name == name)
            .map(FakeEntity::observe)
            .collect()
    }

    fn get(&self, kind: Kind, id: &str) -> Result<ManagedEntity, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.gets += 1;
        state
            .entities
            .iter_mut()
            .find(|e| e.kind == kind && e.id == id)
            .map(FakeEntity::observe)
            .ok_or_else(|| ApiError::service(404, "NotAuthorizedOrNotFound", "no such entity"))
    }

    fn create(&self, kind: Kind, parent: &str, name: &str) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.creates.push((parent.to_string(), name.to_string()));
        if state.create_behavior == CreateBehavior::Fail {
            return Err(ApiError::service(500, "InternalServerError", "create failed"));
        }

        let prefix = match kind {
            Kind::Group => "ocid1.loggroup.oc1..",
            Kind::Stream => "ocid1.log.oc1..",
        };
        let id = format!("{}{}", prefix, state.next_id);
        state.next_id += 1;
        let activate_on = state.created_activate_on;
        state.entities.push(FakeEntity {
            kind,
            id,
            name: name.to_string(),
            parent: parent.to_string(),
            state: LifecycleState::Creating,
            activate_on,
            observations: 0,
        });

        if state.create_behavior == CreateBehavior::Conflict {
            return Err(ApiError::service(409, "Conflict", "already exists"));
        }
        Ok(())
    }
}

#[async_trait]
impl LoggingManagement for FakeLogging {
    async fn list_log_groups(
        &self,
        compartment_id: &str,
        display_name: &str,
    ) -> Result<Vec<ManagedEntity>, ApiError> {
        Ok(self.list(Kind::Group, compartment_id, display_name))
    }

    async fn create_log_group(
        &self,
        compartment_id: &str,
        display_name: &str,
    ) -> Result<(), ApiError> {
        self.create(Kind::Group, compartment_id, display_name)
    }

    async fn get_log_group(&self, log_group_id: &str) -> Result<ManagedEntity, ApiError> {
        self.get(Kind::Group, log_group_id)
    }

    async fn list_logs(
        &self,
        log_group_id: &str,
        display_name: &str,
    ) -> Result<Vec<ManagedEntity>, ApiError> {
        Ok(self.list(Kind::Stream, log_group_id, display_name))
    }

    async fn create_log(&self, log_group_id: &str, display_name: &str) -> Result<(), ApiError> {
        self.create(Kind::Stream, log_group_id, display_name)
    }

    async fn get_log(&self, _log_group_id: &str, log_id: &str) -> Result<ManagedEntity, ApiError> {
        self.get(Kind::Stream, log_id)
    }
}

// ---------------------------------------------------------------------------
// KMS
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeKms {
    /// key version id -> creation time as the service would send it
    versions: HashMap<String, String>,
    failing_vaults: HashSet<String>,
    pub vault_calls: Mutex<Vec<String>>,
    pub version_calls: Mutex<Vec<String>>,
}

impl FakeKms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(mut self, version_id: &str, time_created: impl Into<String>) -> Self {
        self.versions.insert(version_id.to_string(), time_created.into());
        self
    }

    pub fn with_failing_vault(mut self, vault_id: &str) -> Self {
        self.failing_vaults.insert(vault_id.to_string());
        self
    }

    pub fn version_calls(&self) -> Vec<String> {
        self.version_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl KeyManagement for FakeKms {
    async fn get_vault(&self, vault_id: &str) -> Result<Vault, ApiError> {
        self.vault_calls.lock().unwrap().push(vault_id.to_string());
        if self.failing_vaults.contains(vault_id) {
            return Err(ApiError::service(404, "NotAuthorizedOrNotFound", "vault not found"));
        }
        Ok(Vault {
            id: vault_id.to_string(),
            display_name: None,
            management_endpoint: format!("https://{}-management.kms.example.com", vault_id),
        })
    }

    async fn get_key_version(
        &self,
        _management_endpoint: &str,
        key_id: &str,
        key_version_id: &str,
    ) -> Result<KeyVersion, ApiError> {
        self.version_calls.lock().unwrap().push(key_version_id.to_string());
        let time_created = self
            .versions
            .get(key_version_id)
            .cloned()
            .ok_or_else(|| {
                ApiError::service(404, "NotAuthorizedOrNotFound", "unknown key version")
            })?;
        Ok(KeyVersion {
            id: key_version_id.to_string(),
            key_id: key_id.to_string(),
            vault_id: None,
            time_created,
        })
    }
}

// ---------------------------------------------------------------------------
// Logging Ingestion
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeIngestion {
    /// Fail any put whose payload mentions one of these key ids.
    failing_keys: HashSet<String>,
    pub sent: Mutex<Vec<(String, PutLogsDetails)>>,
}

impl FakeIngestion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(mut self, key_id: &str) -> Self {
        self.failing_keys.insert(key_id.to_string());
        self
    }

    /// `(log id, entry data)` for every accepted entry.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(log_id, details)| {
                details
                    .log_entry_batches
                    .iter()
                    .flat_map(|b| b.entries.iter())
                    .map(move |e| (log_id.clone(), e.data.clone()))
            })
            .collect()
    }
}

#[async_trait]
impl LogIngestion for FakeIngestion {
    async fn put_logs(&self, log_id: &str, details: &PutLogsDetails) -> Result<(), ApiError> {
        let data = &details.log_entry_batches[0].entries[0].data;
        if self.failing_keys.iter().any(|k| data.contains(&format!("Key OCID: {}\n", k))) {
            return Err(ApiError::service(503, "ServiceUnavailable", "ingestion unavailable"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((log_id.to_string(), details.clone()));
        Ok(())
    }
}
