//! hwreport CLI
//!
//! Weekly hardware survey job: queries the telemetry warehouse,
//! normalizes bucket counts and publishes the dashboard JSON.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;
use std::path::PathBuf;

use hwreport::commands::{
    display_dimensions, display_version, execute_report, validate_artifact_file, ReportArgs,
};
use hwreport::output::OutputLayout;
use hwreport::utils::config::{BIGQUERY_ENDPOINT, GCS_ENDPOINT, GPU_DB_BASE_URL};

/// hwreport - weekly hardware survey aggregation
#[derive(Parser, Debug)]
#[command(name = "hwreport")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Build and publish the weekly report
    Report {
        /// Warehouse project the queries run in
        #[arg(long, env = "HWREPORT_PROJECT_ID")]
        project_id: String,

        /// Start of the newest week (YYYY-MM-DD); defaults to today
        #[arg(long, env = "HWREPORT_DATE_FROM")]
        date_from: Option<NaiveDate>,

        /// Number of earlier weeks to recompute
        #[arg(long, env = "HWREPORT_PAST_WEEKS", default_value = "0")]
        past_weeks: u32,

        /// Comma-separated dimensions (default: all, see `hwreport dimensions`)
        #[arg(long, env = "HWREPORT_DIMENSIONS", value_delimiter = ',')]
        dimensions: Vec<String>,

        /// gs://bucket/prefix, file:///dir or a plain directory
        #[arg(short, long, env = "HWREPORT_DESTINATION")]
        destination: String,

        /// OAuth bearer token for the warehouse and GCS
        #[arg(long, env = "GOOGLE_OAUTH_ACCESS_TOKEN", hide_env_values = true)]
        access_token: Option<String>,

        /// TOML suppression policy file
        #[arg(long, env = "HWREPORT_POLICY")]
        policy: Option<PathBuf>,

        /// Suppress buckets with fewer clients than this
        #[arg(long)]
        min_count: Option<u64>,

        /// Suppress buckets below this fraction of the week's clients
        #[arg(long)]
        min_fraction: Option<f64>,

        /// Drop suppressed buckets instead of merging them into "Other"
        #[arg(long)]
        drop_suppressed: bool,

        /// Artifact layout
        #[arg(long, value_enum, default_value = "nested")]
        layout: OutputLayout,

        /// Also write a dated archive copy
        #[arg(long)]
        archive: bool,

        /// Keep weeks from the currently published artifact
        #[arg(long)]
        merge_previous: bool,

        /// Write even if the published artifact is unchanged
        #[arg(long)]
        force: bool,

        /// Build everything but do not write
        #[arg(long)]
        dry_run: bool,

        /// Do not download the GPU device database
        #[arg(long)]
        skip_gpu_db: bool,

        #[arg(long, env = "HWREPORT_GPU_DB_URL", default_value = GPU_DB_BASE_URL)]
        gpu_db_url: String,

        #[arg(long, env = "HWREPORT_BIGQUERY_ENDPOINT", default_value = BIGQUERY_ENDPOINT)]
        bigquery_endpoint: String,

        #[arg(long, env = "HWREPORT_GCS_ENDPOINT", default_value = GCS_ENDPOINT)]
        gcs_endpoint: String,
    },

    /// Validate a published report file
    Validate {
        /// Path to report JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List report dimensions
    Dimensions,

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Report {
            project_id,
            date_from,
            past_weeks,
            dimensions,
            destination,
            access_token,
            policy,
            min_count,
            min_fraction,
            drop_suppressed,
            layout,
            archive,
            merge_previous,
            force,
            dry_run,
            skip_gpu_db,
            gpu_db_url,
            bigquery_endpoint,
            gcs_endpoint,
        } => {
            let defaults = ReportArgs::default();

            let args = ReportArgs {
                project_id,
                date_from: date_from.unwrap_or(defaults.date_from),
                past_weeks,
                dimensions,
                destination,
                access_token,
                policy_file: policy,
                min_count,
                min_fraction,
                drop_suppressed,
                layout,
                archive,
                merge_previous,
                force,
                dry_run,
                skip_gpu_db,
                gpu_db_url,
                bigquery_endpoint,
                gcs_endpoint,
            };

            let summary = execute_report(args)?;

            for (key, outcome) in &summary.outcomes {
                info!("{}: {:?}", key, outcome);
            }
            info!(
                "{} weeks, {} records, {} bytes (sha256 {})",
                summary.weeks, summary.records, summary.bytes, summary.content_hash
            );
        }

        Commands::Validate { file } => {
            validate_artifact_file(file)?;
        }

        Commands::Dimensions => {
            display_dimensions();
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
