use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use oci_key_rotation_audit::commands::{self, scan::ScanOptions};
use oci_key_rotation_audit::logging;

#[derive(Parser)]
#[command(name = "key-rotation-audit")]
#[command(about = "OCI Vault key rotation compliance scanner", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan all enabled keys and log those not rotated within 180 days
    Scan {
        /// OCI config file (default: $OCI_CONFIG_FILE or ~/.oci/config)
        #[arg(long)]
        config_file: Option<String>,

        /// Profile within the config file (default: $OCI_CLI_PROFILE or DEFAULT)
        #[arg(long)]
        profile: Option<String>,

        /// Compartment holding the alert log group (default: the tenancy)
        #[arg(long)]
        compartment_id: Option<String>,

        /// Evaluate keys without creating the log group or sending alerts
        #[arg(long)]
        dry_run: bool,

        /// Write a JSON report of the scan to this file
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Generate shell completion scripts
    GenerateCompletion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            config_file,
            profile,
            compartment_id,
            dry_run,
            output,
        } => {
            logging::init(cli.verbose, cli.log_json)?;
            commands::scan::run(ScanOptions {
                config_file: config_file.as_deref(),
                profile: profile.as_deref(),
                compartment_id: compartment_id.as_deref(),
                dry_run,
                output: output.as_deref(),
            })
            .await
        }
        Commands::GenerateCompletion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(
                shell,
                &mut cmd,
                "key-rotation-audit",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    }
}
