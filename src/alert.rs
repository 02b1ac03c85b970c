//! Rotation alerts and their delivery to OCI Logging.

use crate::error::KeyError;
use crate::inventory::KeyResource;
use crate::oci_api::ApiError;
use crate::provisioning::ProvisionedSink;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};

/// `source` label on every alert batch.
pub const ALERT_SOURCE: &str = "KeyRotationChecker";

/// `subject` label on every alert batch.
pub const ALERT_SUBJECT: &str = "KeyRotationCheck";

/// `type` label on every alert batch.
pub const ALERT_TYPE: &str = "CUSTOM";

/// Body of a Logging Ingestion `PutLogs` call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PutLogsDetails {
    pub specversion: String,
    pub log_entry_batches: Vec<LogEntryBatch>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntryBatch {
    pub entries: Vec<LogEntry>,
    pub source: String,
    #[serde(rename = "type")]
    pub batch_type: String,
    pub subject: String,
    pub defaultlogentrytime: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub data: String,
    pub id: String,
    pub time: DateTime<Utc>,
}

/// Logging Ingestion service boundary.
#[async_trait]
pub trait LogIngestion: Send + Sync {
    async fn put_logs(&self, log_id: &str, details: &PutLogsDetails) -> Result<(), ApiError>;
}

/// A stale key, captured at the moment it was evaluated.
#[derive(Debug, Clone, Serialize)]
pub struct ComplianceAlert {
    pub key_id: String,
    pub key_version_id: String,
    pub compartment_id: String,
    pub key_created: Option<String>,
    pub version_created: DateTime<Utc>,
    pub additional_details: Map<String, Value>,
}

impl ComplianceAlert {
    pub fn new(key: &KeyResource, key_version_id: &str, version_created: DateTime<Utc>) -> Self {
        Self {
            key_id: key.identifier.clone(),
            key_version_id: key_version_id.to_string(),
            compartment_id: key.compartment_id.clone(),
            key_created: key.time_created.clone(),
            version_created,
            additional_details: key.additional_details.clone(),
        }
    }

    /// The alert body, without the execution header.
    pub fn message(&self) -> String {
        format!(
            "Key Rotation Alert:\n\
             Key OCID: {}\n\
             Current Key Version: {}\n\
             Compartment: {}\n\
             Key Created: {}\n\
             Current Key Version Created: {}\n\
             Additional Details: {}",
            self.key_id,
            self.key_version_id,
            self.compartment_id,
            self.key_created.as_deref().unwrap_or("unknown"),
            self.version_created.to_rfc3339_opts(SecondsFormat::Secs, true),
            Value::Object(self.additional_details.clone()),
        )
    }
}

/// Writes alerts to a provisioned log stream, one `PutLogs` call per alert.
pub struct AlertEmitter<'a> {
    ingestion: &'a dyn LogIngestion,
    scan_started: DateTime<Utc>,
    sequence: AtomicU64,
}

impl<'a> AlertEmitter<'a> {
    pub fn new(ingestion: &'a dyn LogIngestion, scan_started: DateTime<Utc>) -> Self {
        Self {
            ingestion,
            scan_started,
            sequence: AtomicU64::new(0),
        }
    }

    /// Send one alert. A failure is returned, never retried.
    pub async fn emit(
        &self,
        sink: &ProvisionedSink,
        alert: &ComplianceAlert,
    ) -> Result<(), KeyError> {
        let details = self.build(alert, Utc::now());
        self.ingestion
            .put_logs(sink.log_id(), &details)
            .await
            .map_err(|source| KeyError::AlertEmission {
                key_id: alert.key_id.clone(),
                source,
            })
    }

    /// Wrap an alert into a single-entry batch stamped with `emitted_at`.
    pub fn build(&self, alert: &ComplianceAlert, emitted_at: DateTime<Utc>) -> PutLogsDetails {
        let runtime = (emitted_at - self.scan_started).num_milliseconds() as f64 / 1000.0;
        let data = format!(
            "ExecutedTime: {}\nRuntime (seconds): {}\n{}",
            emitted_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            runtime,
            alert.message()
        );

        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let id = format!(
            "{}.{:09}-{}",
            emitted_at.timestamp(),
            emitted_at.timestamp_subsec_nanos(),
            seq
        );

        PutLogsDetails {
            specversion: "1.0".to_string(),
            log_entry_batches: vec![LogEntryBatch {
                entries: vec![LogEntry {
                    data,
                    id,
                    time: emitted_at,
                }],
                source: ALERT_SOURCE.to_string(),
                batch_type: ALERT_TYPE.to_string(),
                subject: ALERT_SUBJECT.to_string(),
                defaultlogentrytime: emitted_at,
            }],
        }
    }
}
