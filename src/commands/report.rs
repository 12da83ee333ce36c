//! Report command implementation.
//!
//! The report command:
//! 1. Queries the warehouse for every requested week
//! 2. Normalizes bucket counts into percentages with suppression
//! 3. Formats the nested (or flat) artifact
//! 4. Publishes it, skipping the write when nothing changed
//!
//! Every stage completes before the next starts; nothing is written unless
//! the whole artifact was built.

use super::models::{JobConfig, ReportArgs};
use crate::aggregator::{load_policy, normalize, SuppressionMode, SuppressionPolicy, Threshold};
use crate::dimensions::{fetch_device_map, parse_dimensions, DeviceMap, Dimension};
use crate::output::{format_document, render_artifact, OutputDocument, OutputLayout};
use crate::publish::{content_hash, publish_artifact, Destination, ObjectStore, PublishOptions, PublishOutcome};
use crate::utils::config::{ARCHIVE_ARTIFACT_PREFIX, LATEST_ARTIFACT_NAME};
use crate::warehouse::{fetch_raw_rows, weeks_for, BigQueryClient, Warehouse};
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use std::time::Instant;

/// Upper bound on a single backfill (ten years of weeks)
const MAX_PAST_WEEKS: u32 = 520;

/// What a pipeline run produced
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub raw_rows: usize,
    pub records: usize,
    pub weeks: usize,
    pub content_hash: String,
    pub bytes: usize,

    /// (object key, outcome) per published object
    pub outcomes: Vec<(String, PublishOutcome)>,
}

/// Execute the report command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Invalid arguments or policy file
/// * Warehouse failures (`QueryError`)
/// * Malformed intermediate records (`ValidationError`)
/// * Object store failures (`PublishError`)
pub fn execute_report(args: ReportArgs) -> Result<PipelineSummary> {
    let start_time = Instant::now();

    validate_args(&args)?;
    let config = resolve_config(&args)?;

    info!(
        "Starting report: date_from={}, past_weeks={}, {} dimensions",
        args.date_from,
        args.past_weeks,
        config.dimensions.len()
    );

    let token = args.access_token.clone().unwrap_or_default();
    let warehouse = BigQueryClient::new(&args.bigquery_endpoint, &args.project_id, token)
        .context("Failed to create warehouse client")?;

    let devices = if config.dimensions.contains(&Dimension::GpuModel) && !args.skip_gpu_db {
        let devices =
            fetch_device_map(&args.gpu_db_url).context("Failed to load GPU device database")?;
        if devices.is_empty() {
            warn!("GPU device database is empty; every GPU model will be reported as Unknown");
        }
        devices
    } else {
        debug!("GPU device database not loaded");
        DeviceMap::default()
    };

    let store = config
        .destination
        .open(&args.gcs_endpoint, args.access_token.as_deref())
        .context("Failed to open destination")?;

    let summary = run_pipeline(&config, &warehouse, store.as_ref(), &devices)?;

    info!(
        "Report completed in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(summary)
}

/// Run Query Layer -> Normalizer -> Formatter -> Publisher
///
/// **Public** - takes its collaborators explicitly so it runs against any
/// warehouse or store
pub fn run_pipeline(
    config: &JobConfig,
    warehouse: &dyn Warehouse,
    store: &dyn ObjectStore,
    devices: &DeviceMap,
) -> Result<PipelineSummary> {
    // Step 1: Query
    info!("Step 1/4: Querying warehouse for {} week(s)...", config.weeks.len());
    let raw_rows = fetch_raw_rows(warehouse, &config.weeks, &config.dimensions, devices)
        .context("Failed to query warehouse")?;

    // Step 2: Normalize
    info!("Step 2/4: Normalizing {} raw rows...", raw_rows.len());
    let records = normalize(&raw_rows, &config.policy).context("Failed to normalize raw rows")?;

    // Step 3: Format
    info!("Step 3/4: Formatting {} records...", records.len());
    let mut document = format_document(&records).context("Failed to format report document")?;

    let latest_key = config.destination.key(LATEST_ARTIFACT_NAME);
    if config.merge_previous {
        merge_with_published(&mut document, store, &latest_key, config)?;
    }

    if document.is_empty() {
        anyhow::bail!("No data for the requested weeks; refusing to publish an empty artifact");
    }

    document
        .check_sums()
        .context("Report document failed consistency check")?;

    let payload =
        render_artifact(&document, config.layout).context("Failed to serialize report document")?;
    let hash = content_hash(&payload);
    debug!("Artifact: {} bytes, sha256 {}", payload.len(), hash);

    // Step 4: Publish
    info!("Step 4/4: Publishing to {}...", config.destination);
    let mut outcomes = Vec::new();

    let outcome = publish_artifact(store, &latest_key, &payload, &config.publish)
        .context("Failed to publish artifact")?;
    outcomes.push((latest_key, outcome));

    if config.archive {
        let archive_key = config.destination.key(&archive_name(config.run_date));
        let outcome = publish_artifact(store, &archive_key, &payload, &config.publish)
            .context("Failed to publish archive copy")?;
        outcomes.push((archive_key, outcome));
    }

    Ok(PipelineSummary {
        raw_rows: raw_rows.len(),
        records: records.len(),
        weeks: document.weeks().len(),
        content_hash: hash,
        bytes: payload.len(),
        outcomes,
    })
}

/// Fold what this run did not recompute from the published artifact into `document`
fn merge_with_published(
    document: &mut OutputDocument,
    store: &dyn ObjectStore,
    key: &str,
    config: &JobConfig,
) -> Result<()> {
    match store
        .get_object(key)
        .context("Failed to read previously published artifact")?
    {
        Some(bytes) => {
            let previous = OutputDocument::from_slice(&bytes)
                .context("Previously published artifact is not a nested report")?;
            debug!("Merging {} previously published weeks", previous.weeks().len());
            let dimensions: Vec<&str> = config.dimensions.iter().map(|d| d.as_str()).collect();
            let weeks: Vec<String> = config
                .weeks
                .iter()
                .map(|w| w.start.format("%Y-%m-%d").to_string())
                .collect();
            document.merge_previous(previous, &dimensions, &weeks);
        }
        None => info!("No previous artifact at {}", store.describe(key)),
    }
    Ok(())
}

/// Archive copy name for a run date, e.g. `hwsurvey-weekly-2024-01-08.json`
pub fn archive_name(run_date: NaiveDate) -> String {
    format!("{}{}.json", ARCHIVE_ARTIFACT_PREFIX, run_date.format("%Y-%m-%d"))
}

/// Validate report arguments
///
/// **Public** - can be called before execute_report for early validation
pub fn validate_args(args: &ReportArgs) -> Result<()> {
    if args.project_id.trim().is_empty() {
        anyhow::bail!("Project id cannot be empty");
    }

    if args.access_token.as_deref().map_or(true, str::is_empty) {
        anyhow::bail!("An access token is required to query the warehouse");
    }

    for endpoint in [&args.bigquery_endpoint, &args.gcs_endpoint, &args.gpu_db_url] {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            anyhow::bail!("Endpoint must start with http:// or https://: {}", endpoint);
        }
    }

    if args.past_weeks > MAX_PAST_WEEKS {
        anyhow::bail!("past_weeks is too large (max {})", MAX_PAST_WEEKS);
    }

    parse_dimensions(&args.dimensions).map_err(anyhow::Error::msg)?;

    if args.min_count.is_some() && args.min_fraction.is_some() {
        anyhow::bail!("Use either an absolute or a relative threshold, not both");
    }

    if let Some(fraction) = args.min_fraction {
        if !(fraction > 0.0 && fraction <= 1.0) {
            anyhow::bail!("Relative threshold must be in (0, 1], got {}", fraction);
        }
    }

    args.destination
        .parse::<Destination>()
        .context("Invalid destination")?;

    if args.merge_previous && args.layout == OutputLayout::Flat {
        anyhow::bail!("--merge-previous requires the nested layout");
    }

    Ok(())
}

/// Lower validated arguments into the pipeline configuration
pub fn resolve_config(args: &ReportArgs) -> Result<JobConfig> {
    let dimensions = parse_dimensions(&args.dimensions).map_err(anyhow::Error::msg)?;

    let mut policy = match &args.policy_file {
        Some(path) => load_policy(path)
            .with_context(|| format!("Failed to load policy file {}", path.display()))?,
        None => SuppressionPolicy::default(),
    };

    if let Some(count) = args.min_count {
        policy.threshold = Threshold::Absolute(count);
    }
    if let Some(fraction) = args.min_fraction {
        policy.threshold = Threshold::Relative(fraction);
    }
    if args.drop_suppressed {
        policy.mode = SuppressionMode::Drop;
    }

    let destination = args
        .destination
        .parse::<Destination>()
        .context("Invalid destination")?;

    Ok(JobConfig {
        weeks: weeks_for(args.date_from, args.past_weeks),
        dimensions,
        policy,
        destination,
        layout: args.layout,
        archive: args.archive,
        merge_previous: args.merge_previous,
        publish: PublishOptions {
            skip_unchanged: !args.force,
            dry_run: args.dry_run,
        },
        run_date: Utc::now().date_naive(),
    })
}
