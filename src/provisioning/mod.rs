//! Log group / log stream provisioning.
//!
//! Both entities go through the same state machine:
//!
//! ```text
//!   ABSENT --create--> CREATING --poll--> ACTIVE
//!                         |
//!                         +--budget exhausted--> TIMED_OUT
//! ```
//!
//! An entity is looked up by display name before anything is created. An
//! entity that is already ACTIVE is returned without polling. One that exists
//! but is still transitioning is polled with the short `reuse` budget. A
//! freshly created one is polled with the longer `create` budget.
//!
//! Nothing here takes a lock. Two scans racing on an empty compartment can
//! both try to create: the loser gets a 409 from the service and falls back
//! to listing and polling the winner's entity.

pub mod wait;

use crate::error::ScanError;
use crate::oci_api::ApiError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use wait::{wait_until, WaitError, WaitPolicy};

/// Display name of the log group alerts are written to.
pub const LOG_GROUP_NAME: &str = "OCI_Config_Monitor";

/// Display name of the custom log (stream) inside [`LOG_GROUP_NAME`].
pub const LOG_STREAM_NAME: &str = "Key_Rotation_Check";

/// Lifecycle of a logging-management entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Creating,
    Active,
    Updating,
    Inactive,
    Deleting,
    Failed,
    #[serde(other)]
    Unknown,
}

impl LifecycleState {
    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}

/// The fields of a log group or log that provisioning needs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedEntity {
    pub id: String,
    pub display_name: String,
    pub lifecycle_state: LifecycleState,
}

/// Logging Management service boundary.
#[async_trait]
pub trait LoggingManagement: Send + Sync {
    async fn list_log_groups(
        &self,
        compartment_id: &str,
        display_name: &str,
    ) -> Result<Vec<ManagedEntity>, ApiError>;

    /// Request creation. The service completes it asynchronously.
    async fn create_log_group(
        &self,
        compartment_id: &str,
        display_name: &str,
    ) -> Result<(), ApiError>;

    async fn get_log_group(&self, log_group_id: &str) -> Result<ManagedEntity, ApiError>;

    async fn list_logs(
        &self,
        log_group_id: &str,
        display_name: &str,
    ) -> Result<Vec<ManagedEntity>, ApiError>;

    /// Request creation of a `CUSTOM` log inside the group.
    async fn create_log(&self, log_group_id: &str, display_name: &str) -> Result<(), ApiError>;

    async fn get_log(&self, log_group_id: &str, log_id: &str) -> Result<ManagedEntity, ApiError>;
}

/// Where an entity lives, which also decides what kind of entity it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// A log group inside this compartment.
    Compartment(String),
    /// A log stream inside this log group.
    LogGroup(String),
}

impl Scope {
    pub fn entity(&self) -> &'static str {
        match self {
            Self::Compartment(_) => "log group",
            Self::LogGroup(_) => "log stream",
        }
    }
}

/// Polling budgets for the two provisioning paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionPolicy {
    /// Entity already exists but is not ACTIVE yet.
    pub reuse: WaitPolicy,
    /// Entity was just created (by us or a concurrent scan).
    pub create: WaitPolicy,
}

impl Default for ProvisionPolicy {
    fn default() -> Self {
        Self {
            reuse: WaitPolicy::new(Duration::from_secs(5), Duration::from_secs(30)),
            create: WaitPolicy::new(Duration::from_secs(10), Duration::from_secs(300)),
        }
    }
}

/// How an entity ended up ACTIVE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionPath {
    AlreadyActive,
    Reused,
    Created,
    CreatedConcurrently,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    pub id: String,
    pub path: ProvisionPath,
}

/// An ACTIVE log group and an ACTIVE log stream inside it.
///
/// Only [`Provisioner::ensure_sink`] builds one, so holding a value means both
/// entities were observed ACTIVE during this scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionedSink {
    log_group_id: String,
    log_id: String,
}

impl ProvisionedSink {
    pub fn log_group_id(&self) -> &str {
        &self.log_group_id
    }

    pub fn log_id(&self) -> &str {
        &self.log_id
    }
}

enum Lookup {
    ById(String),
    ByName,
}

pub struct Provisioner<'a> {
    api: &'a dyn LoggingManagement,
    policy: ProvisionPolicy,
}

impl<'a> Provisioner<'a> {
    pub fn new(api: &'a dyn LoggingManagement, policy: ProvisionPolicy) -> Self {
        Self { api, policy }
    }

    /// Make sure the log group and, inside it, the log stream are ACTIVE.
    pub async fn ensure_sink(
        &self,
        compartment_id: &str,
        group_name: &str,
        stream_name: &str,
    ) -> Result<ProvisionedSink, ScanError> {
        let group = self
            .ensure_active(&Scope::Compartment(compartment_id.to_string()), group_name)
            .await?;
        let stream = self
            .ensure_active(&Scope::LogGroup(group.id.clone()), stream_name)
            .await?;

        Ok(ProvisionedSink {
            log_group_id: group.id,
            log_id: stream.id,
        })
    }

    /// Return the id of the ACTIVE entity called `name` in `scope`, creating
    /// it and waiting for it as needed.
    pub async fn ensure_active(&self, scope: &Scope, name: &str) -> Result<Provisioned, ScanError> {
        let entity = scope.entity();
        let existing = self
            .find(scope, name)
            .await
            .map_err(|source| provisioning_error(scope, name, source))?;

        match existing {
            Some(found) if found.lifecycle_state.is_active() => {
                tracing::info!(entity, name, id = %found.id, "already exists and is ACTIVE");
                Ok(Provisioned {
                    id: found.id,
                    path: ProvisionPath::AlreadyActive,
                })
            }
            Some(found) => {
                tracing::info!(
                    entity,
                    name,
                    id = %found.id,
                    state = ?found.lifecycle_state,
                    "exists but is not ACTIVE yet, waiting"
                );
                let id = self
                    .wait(scope, name, self.policy.reuse, Lookup::ById(found.id))
                    .await?;
                Ok(Provisioned {
                    id,
                    path: ProvisionPath::Reused,
                })
            }
            None => {
                tracing::info!(entity, name, "creating");
                let path = match self.create(scope, name).await {
                    Ok(()) => ProvisionPath::Created,
                    Err(e) if e.is_conflict() => {
                        tracing::warn!(
                            entity,
                            name,
                            "created concurrently by another scan, waiting for it"
                        );
                        ProvisionPath::CreatedConcurrently
                    }
                    Err(source) => return Err(provisioning_error(scope, name, source)),
                };
                let id = self
                    .wait(scope, name, self.policy.create, Lookup::ByName)
                    .await?;
                Ok(Provisioned { id, path })
            }
        }
    }

    async fn find(&self, scope: &Scope, name: &str) -> Result<Option<ManagedEntity>, ApiError> {
        let entities = match scope {
            Scope::Compartment(compartment_id) => {
                self.api.list_log_groups(compartment_id, name).await?
            }
            Scope::LogGroup(log_group_id) => self.api.list_logs(log_group_id, name).await?,
        };
        Ok(entities.into_iter().find(|e| e.display_name == name))
    }

    async fn get(&self, scope: &Scope, id: &str) -> Result<ManagedEntity, ApiError> {
        match scope {
            Scope::Compartment(_) => self.api.get_log_group(id).await,
            Scope::LogGroup(log_group_id) => self.api.get_log(log_group_id, id).await,
        }
    }

    async fn create(&self, scope: &Scope, name: &str) -> Result<(), ApiError> {
        match scope {
            Scope::Compartment(compartment_id) => {
                self.api.create_log_group(compartment_id, name).await
            }
            Scope::LogGroup(log_group_id) => self.api.create_log(log_group_id, name).await,
        }
    }

    async fn wait(
        &self,
        scope: &Scope,
        name: &str,
        policy: WaitPolicy,
        lookup: Lookup,
    ) -> Result<String, ScanError> {
        let label = format!("{} '{}'", scope.entity(), name);
        let lookup = &lookup;

        let result = wait_until(
            &label,
            policy,
            move || async move {
                match lookup {
                    Lookup::ById(id) => self.get(scope, id).await.map(Some),
                    Lookup::ByName => self.find(scope, name).await,
                }
            },
            |entity: &ManagedEntity| {
                tracing::debug!(
                    id = %entity.id,
                    state = ?entity.lifecycle_state,
                    "polled {}",
                    label
                );
                entity.lifecycle_state.is_active()
            },
        )
        .await;

        match result {
            Ok(entity) => {
                tracing::info!(entity = scope.entity(), name, id = %entity.id, "is ACTIVE");
                Ok(entity.id)
            }
            Err(WaitError::TimedOut { elapsed, polls }) => {
                tracing::error!(
                    entity = scope.entity(),
                    name,
                    polls,
                    elapsed_secs = elapsed.as_secs(),
                    "timed out waiting for ACTIVE"
                );
                Err(ScanError::ProvisioningTimeout {
                    entity: scope.entity(),
                    name: name.to_string(),
                    elapsed,
                })
            }
            Err(WaitError::Fetch(source)) => Err(provisioning_error(scope, name, source)),
        }
    }
}

fn provisioning_error(scope: &Scope, name: &str, source: ApiError) -> ScanError {
    ScanError::Provisioning {
        entity: scope.entity(),
        name: name.to_string(),
        source,
    }
}
