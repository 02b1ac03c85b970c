//! Key rotation scan command.
//!
//! Finds every enabled key in the tenancy and checks when its current key
//! version was created. Keys whose version is older than 180 days are
//! reported to the `OCI_Config_Monitor/Key_Rotation_Check` custom log, which
//! is created on the first run.
//!
//! # Usage
//!
//! ```bash
//! # Scan with the DEFAULT profile from ~/.oci/config
//! key-rotation-audit scan
//!
//! # Different profile, and keep a JSON report of the run
//! key-rotation-audit scan --profile AUDIT --output rotation-report.json
//!
//! # Evaluate only: no log group is created and no alerts are sent
//! key-rotation-audit scan --dry-run
//! ```
//!
//! # Output
//!
//! One line per key on stdout (compliant, alert logged, or skipped), followed
//! by a summary. Alerts themselves are only stored in the log stream.

use crate::config::{OciProfile, ScanSettings};
use crate::oci_api::ingestion::LoggingIngestionClient;
use crate::oci_api::kms::KmsClient;
use crate::oci_api::logging::LoggingManagementClient;
use crate::oci_api::search::SearchClient;
use crate::oci_api::{Endpoints, OciClient};
use crate::scan::{ScanClients, ScanReport, Scanner};
use crate::utils::format::format_number;
use crate::utils::time::{duration_human, format_timestamp};
use anyhow::{Context, Result};
use std::fs::File;
use std::sync::Arc;

/// Options for one scan invocation.
#[derive(Debug, Default, Clone)]
pub struct ScanOptions<'a> {
    pub config_file: Option<&'a str>,
    pub profile: Option<&'a str>,
    pub compartment_id: Option<&'a str>,
    pub dry_run: bool,
    pub output: Option<&'a str>,
}

/// Wire the OCI clients for a profile.
pub fn build_clients(profile: &OciProfile, endpoints: &Endpoints) -> Result<ScanClients> {
    let signer = profile.signer()?;
    let client = OciClient::new(signer).context("Failed to create HTTP client")?;

    Ok(ScanClients {
        search: Arc::new(SearchClient::new(client.clone(), endpoints.search.clone())),
        logging: Arc::new(LoggingManagementClient::new(
            client.clone(),
            endpoints.logging.clone(),
        )),
        kms: Arc::new(KmsClient::new(client.clone(), endpoints.kms_vault.clone())),
        ingestion: Arc::new(LoggingIngestionClient::new(client, endpoints.ingestion.clone())),
    })
}

pub async fn run(options: ScanOptions<'_>) -> Result<()> {
    let profile = OciProfile::from_options(options.config_file, options.profile)?;
    let endpoints = Endpoints::for_region(&profile.region);
    let compartment_id = options
        .compartment_id
        .map(str::to_string)
        .unwrap_or_else(|| profile.tenancy.clone());

    eprintln!("=== OCI Key Rotation Audit ===");
    eprintln!("Profile: {} ({})", profile.name, profile.region);
    eprintln!("Log compartment: {}", compartment_id);
    if options.dry_run {
        eprintln!("⚠️  Dry run: no log group will be created and no alerts will be sent");
    }
    eprintln!();

    let clients = build_clients(&profile, &endpoints)?;
    let settings = ScanSettings::new(compartment_id).with_dry_run(options.dry_run);
    let scanner = Scanner::new(clients, settings);

    let report = scanner.run().await?;
    print_summary(&report);

    if let Some(path) = options.output {
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path))?;
        serde_json::to_writer_pretty(file, &report)
            .with_context(|| format!("Failed to write scan report to {}", path))?;
        eprintln!("\nScan report written to: {}", path);
    }

    Ok(())
}

fn print_summary(report: &ScanReport) {
    let summary = report.summary();

    println!();
    println!("=== Summary ===");
    println!("Keys scanned:        {}", format_number(summary.total));
    println!("Compliant:           {}", format_number(summary.compliant));
    println!("Alerts logged:       {}", format_number(summary.alerted));
    if summary.stale_unreported > 0 {
        println!("Stale (not sent):    {}", format_number(summary.stale_unreported));
    }
    if summary.alert_failures > 0 {
        println!("Alert failures:      {}", format_number(summary.alert_failures));
    }
    println!("Skipped:             {}", format_number(summary.skipped));
    println!("Rotation cutoff:     {}", format_timestamp(&report.cutoff));
    println!(
        "Duration:            {}",
        duration_human(&report.started_at, &report.finished_at)
    );
    if let Some(sink) = &report.sink {
        println!("Log stream:          {}", sink.log_id());
    }
}
