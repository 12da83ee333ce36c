//! hwreport
//!
//! Weekly hardware survey aggregation for the public data dashboard.
//!
//! The job runs four stages in order:
//!
//! 1. `warehouse` - parameterized per-week queries, one raw row per
//!    (week, dimension, bucket)
//! 2. `aggregator` - percentages per week and dimension, with long-tail
//!    buckets folded into "Other"
//! 3. `output` - the nested dimension -> week -> bucket JSON document
//! 4. `publish` - overwrite-only, hash-compared upload to GCS or a directory
//!
//! ## Getting Started
//!
//! ```bash
//! hwreport report --project-id my-project --destination gs://bucket/hwsurvey
//! hwreport --help
//! ```

pub mod aggregator;
pub mod commands;
pub mod dimensions;
pub mod output;
pub mod publish;
pub mod utils;
pub mod warehouse;
