//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod models;
pub mod report;
pub mod utils;

// Re-export main command functions
pub use models::{JobConfig, ReportArgs};
pub use report::{archive_name, execute_report, resolve_config, run_pipeline, validate_args, PipelineSummary};
pub use utils::{display_dimensions, display_version, validate_artifact_file};
