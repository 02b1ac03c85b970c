//! Scan orchestration.
//!
//! One run works in three steps:
//!
//! 1. query the inventory (fatal on error)
//! 2. provision the log group and stream (fatal on error or timeout)
//! 3. check every key in inventory order.
//!
//! Each key in step 3 is attempted exactly once. Whatever goes wrong for a key
//! is turned into a [`KeyReport`] with a diagnostic line, and the loop carries
//! on with the next key.

use crate::alert::{AlertEmitter, ComplianceAlert, LogIngestion};
use crate::compliance::{self, Compliance};
use crate::config::ScanSettings;
use crate::error::{KeyError, ScanError};
use crate::inventory::{
    self, KeyResource, ResourceSearch, CURRENT_KEY_VERSION_FIELD, VAULT_ID_FIELD,
};
use crate::key_version::{KeyManagement, VersionResolver};
use crate::provisioning::{LoggingManagement, ProvisionedSink, Provisioner};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Service handles used by a scan.
#[derive(Clone)]
pub struct ScanClients {
    pub search: Arc<dyn ResourceSearch>,
    pub logging: Arc<dyn LoggingManagement>,
    pub kms: Arc<dyn KeyManagement>,
    pub ingestion: Arc<dyn LogIngestion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MalformedEntry,
    VersionResolution,
}

/// What happened to one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyOutcome {
    Compliant,
    /// Stale, and the alert was written to the log stream.
    Alerted,
    /// Stale, but the run had no sink (dry run).
    Stale,
    /// Stale, and the alert could not be written.
    AlertFailed,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyReport {
    pub key_id: String,
    pub key_version_id: Option<String>,
    pub version_created: Option<DateTime<Utc>>,
    pub age_days: Option<i64>,
    pub outcome: KeyOutcome,
    /// The line printed for this key.
    pub diagnostic: String,
}

impl KeyReport {
    fn failed(key: &KeyResource, outcome: KeyOutcome, err: &KeyError) -> Self {
        Self {
            key_id: err.key_id().to_string(),
            key_version_id: key.current_key_version().map(str::to_string),
            version_created: None,
            age_days: None,
            outcome,
            diagnostic: format!("{}, skipping...", err),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub total: usize,
    pub compliant: usize,
    pub alerted: usize,
    pub stale_unreported: usize,
    pub alert_failures: usize,
    pub skipped: usize,
}

impl ScanSummary {
    /// Stale keys found, whether or not an alert went out.
    pub fn stale(&self) -> usize {
        self.alerted + self.stale_unreported + self.alert_failures
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Versions created before this instant are stale.
    pub cutoff: DateTime<Utc>,
    pub dry_run: bool,
    pub sink: Option<ProvisionedSink>,
    pub keys: Vec<KeyReport>,
}

impl ScanReport {
    pub fn summary(&self) -> ScanSummary {
        let mut summary = ScanSummary {
            total: self.keys.len(),
            ..Default::default()
        };
        for key in &self.keys {
            match key.outcome {
                KeyOutcome::Compliant => summary.compliant += 1,
                KeyOutcome::Alerted => summary.alerted += 1,
                KeyOutcome::Stale => summary.stale_unreported += 1,
                KeyOutcome::AlertFailed => summary.alert_failures += 1,
                KeyOutcome::Skipped(_) => summary.skipped += 1,
            }
        }
        summary
    }

    pub fn key(&self, key_id: &str) -> Option<&KeyReport> {
        self.keys.iter().find(|k| k.key_id == key_id)
    }
}

pub struct Scanner {
    clients: ScanClients,
    settings: ScanSettings,
}

impl Scanner {
    pub fn new(clients: ScanClients, settings: ScanSettings) -> Self {
        Self { clients, settings }
    }

    /// Run a scan against the current time.
    pub async fn run(&self) -> Result<ScanReport, ScanError> {
        self.run_at(Utc::now()).await
    }

    /// Run a scan with the policy window anchored at `now` for every key.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<ScanReport, ScanError> {
        let cutoff = compliance::rotation_cutoff(now);
        tracing::info!(
            cutoff = %cutoff,
            dry_run = self.settings.dry_run,
            "starting key rotation scan"
        );

        let keys = inventory::query_keys(self.clients.search.as_ref()).await?;

        let sink = if self.settings.dry_run {
            tracing::info!("dry run: log sink not provisioned, alerts will not be sent");
            None
        } else {
            let provisioner =
                Provisioner::new(self.clients.logging.as_ref(), self.settings.provision);
            Some(
                provisioner
                    .ensure_sink(
                        &self.settings.compartment_id,
                        &self.settings.log_group_name,
                        &self.settings.log_stream_name,
                    )
                    .await?,
            )
        };

        let mut resolver = VersionResolver::new(self.clients.kms.as_ref());
        let emitter = AlertEmitter::new(self.clients.ingestion.as_ref(), now);
        let mut reports = Vec::with_capacity(keys.len());

        for key in &keys {
            let target = sink.as_ref().map(|s| (&emitter, s));
            let report = check_key(key, now, &mut resolver, target).await;
            println!("{}", report.diagnostic);
            reports.push(report);
        }

        let report = ScanReport {
            started_at: now,
            finished_at: Utc::now(),
            cutoff,
            dry_run: self.settings.dry_run,
            sink,
            keys: reports,
        };

        let summary = report.summary();
        tracing::info!(
            total = summary.total,
            compliant = summary.compliant,
            alerted = summary.alerted,
            alert_failures = summary.alert_failures,
            skipped = summary.skipped,
            "scan complete"
        );
        Ok(report)
    }
}

async fn check_key(
    key: &KeyResource,
    now: DateTime<Utc>,
    resolver: &mut VersionResolver<'_>,
    target: Option<(&AlertEmitter<'_>, &ProvisionedSink)>,
) -> KeyReport {
    let key_id = key.identifier.as_str();

    let (version_id, vault_id) = match (key.current_key_version(), key.vault_id()) {
        (Some(version), Some(vault)) => (version, vault),
        (version, _) => {
            let missing = if version.is_none() {
                CURRENT_KEY_VERSION_FIELD
            } else {
                VAULT_ID_FIELD
            };
            let err = KeyError::MalformedInventoryEntry {
                key_id: key_id.to_string(),
                missing,
            };
            tracing::warn!(key = key_id, missing, "malformed inventory entry");
            return KeyReport::failed(key, KeyOutcome::Skipped(SkipReason::MalformedEntry), &err);
        }
    };

    let created = match resolver
        .resolve_version_time(key_id, version_id, vault_id)
        .await
    {
        Ok(created) => created,
        Err(err) => {
            tracing::warn!(key = key_id, error = %err, "version resolution failed");
            return KeyReport::failed(
                key,
                KeyOutcome::Skipped(SkipReason::VersionResolution),
                &err,
            );
        }
    };

    let evaluation = compliance::evaluate(created, now);
    let mut report = KeyReport {
        key_id: key_id.to_string(),
        key_version_id: Some(version_id.to_string()),
        version_created: Some(created),
        age_days: Some(evaluation.age_days),
        outcome: KeyOutcome::Compliant,
        diagnostic: String::new(),
    };

    if evaluation.compliance == Compliance::Compliant {
        tracing::debug!(key = key_id, age_days = evaluation.age_days, "compliant");
        report.diagnostic = format!("Key {} is compliant. Last rotation: {}", key_id, created);
        return report;
    }

    let Some((emitter, sink)) = target else {
        report.outcome = KeyOutcome::Stale;
        report.diagnostic = format!(
            "Key {} is stale ({} days since last rotation), alert not sent (dry run)",
            key_id, evaluation.age_days
        );
        return report;
    };

    let alert = ComplianceAlert::new(key, version_id, created);
    match emitter.emit(sink, &alert).await {
        Ok(()) => {
            tracing::info!(
                key = key_id,
                age_days = evaluation.age_days,
                "rotation alert logged"
            );
            report.outcome = KeyOutcome::Alerted;
            report.diagnostic = format!("Logged rotation alert for key: {}", key_id);
        }
        Err(err) => {
            tracing::error!(key = key_id, error = %err, "alert emission failed");
            report.outcome = KeyOutcome::AlertFailed;
            report.diagnostic = err.to_string();
        }
    }
    report
}
