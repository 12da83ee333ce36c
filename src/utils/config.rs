//! Configuration and constants for the job.

use std::time::Duration;

/// Default timeout for warehouse and object store requests
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// How long the warehouse may hold a synchronous query before returning a job reference
pub const QUERY_TIMEOUT_MS: u64 = 60_000;

/// Give up polling an unfinished query job after this many attempts
pub const MAX_RESULT_POLLS: usize = 30;

/// Current artifact schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

pub const BIGQUERY_ENDPOINT: &str = "https://bigquery.googleapis.com/bigquery/v2";
pub const GCS_ENDPOINT: &str = "https://storage.googleapis.com";
pub const GPU_DB_BASE_URL: &str = "https://github.com/jrmuizel/gpu-db/raw/master";
pub const GPU_DB_FILES: &[&str] = &["intel.json", "nvidia.json", "amd.json"];

/// Synthetic bucket receiving suppressed long-tail values
pub const OTHER_BUCKET: &str = "Other";

/// Bucket for GPU devices missing from the device database
pub const UNKNOWN_BUCKET: &str = "Unknown";

/// Buckets below 1% of a week's samples are collapsed by default
pub const DEFAULT_RELATIVE_THRESHOLD: f64 = 0.01;

/// Absorbs representation error before a relative cutoff is truncated
pub const CUTOFF_EPSILON: f64 = 1e-9;

/// Tolerance used when checking that a group sums to one
pub const SUM_TOLERANCE: f64 = 1e-6;

pub const LATEST_ARTIFACT_NAME: &str = "hwsurvey-weekly.json";
pub const ARCHIVE_ARTIFACT_PREFIX: &str = "hwsurvey-weekly-";

pub const JSON_CONTENT_TYPE: &str = "application/json";
