use crate::aggregator::SuppressionPolicy;
use crate::dimensions::Dimension;
use crate::output::OutputLayout;
use crate::publish::{Destination, PublishOptions};
use crate::utils::config::{BIGQUERY_ENDPOINT, GCS_ENDPOINT, GPU_DB_BASE_URL};
use crate::warehouse::WeekRange;
use chrono::{NaiveDate, Utc};
use std::path::PathBuf;

/// Arguments for the report command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct ReportArgs {
    /// Warehouse project the query runs in
    pub project_id: String,

    /// Start of the newest week to aggregate
    pub date_from: NaiveDate,

    /// Number of earlier weeks to include (backfill)
    pub past_weeks: u32,

    /// Dimension names; empty means all
    pub dimensions: Vec<String>,

    /// Destination URL or directory
    pub destination: String,

    /// OAuth bearer token for the warehouse and GCS
    pub access_token: Option<String>,

    /// TOML suppression policy
    pub policy_file: Option<PathBuf>,

    /// Absolute suppression threshold (clients)
    pub min_count: Option<u64>,

    /// Relative suppression threshold (fraction of the week's clients)
    pub min_fraction: Option<f64>,

    /// Drop suppressed buckets instead of merging them into "Other"
    pub drop_suppressed: bool,

    pub layout: OutputLayout,

    /// Also write a dated archive copy
    pub archive: bool,

    /// Carry forward weeks from the currently published artifact
    pub merge_previous: bool,

    /// Write even if the stored artifact is identical
    pub force: bool,

    pub dry_run: bool,

    /// Leave GPU models as "Unknown" instead of downloading the device database
    pub skip_gpu_db: bool,

    pub gpu_db_url: String,
    pub bigquery_endpoint: String,
    pub gcs_endpoint: String,
}

impl Default for ReportArgs {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            date_from: Utc::now().date_naive(),
            past_weeks: 0,
            dimensions: Vec::new(),
            destination: String::new(),
            access_token: None,
            policy_file: None,
            min_count: None,
            min_fraction: None,
            drop_suppressed: false,
            layout: OutputLayout::Nested,
            archive: false,
            merge_previous: false,
            force: false,
            dry_run: false,
            skip_gpu_db: false,
            gpu_db_url: GPU_DB_BASE_URL.to_string(),
            bigquery_endpoint: BIGQUERY_ENDPOINT.to_string(),
            gcs_endpoint: GCS_ENDPOINT.to_string(),
        }
    }
}

/// Resolved configuration threaded through every pipeline stage
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub weeks: Vec<WeekRange>,
    pub dimensions: Vec<Dimension>,
    pub policy: SuppressionPolicy,
    pub destination: Destination,
    pub layout: OutputLayout,
    pub archive: bool,
    pub merge_previous: bool,
    pub publish: PublishOptions,

    /// Date stamped into the archive copy's name
    pub run_date: NaiveDate,
}
