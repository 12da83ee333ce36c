//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors that can occur while querying the warehouse
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Warehouse rejected credentials: {0}")]
    Unauthorized(String),

    #[error("Invalid warehouse response: {0}")]
    InvalidResponse(String),

    #[error("Query job did not complete: {0}")]
    JobIncomplete(String),

    #[error("Missing expected column: {0}")]
    MissingColumn(String),

    #[error("Malformed value in column {column}: {value:?}")]
    MalformedValue { column: String, value: String },

    #[error("Failed to load reference data: {0}")]
    ReferenceData(String),
}

/// Errors raised for malformed intermediate records
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Record for week {week} has an empty {field}")]
    EmptyField { week: String, field: &'static str },

    #[error("Percentage {value} out of range for {dimension}/{week}/{bucket}")]
    InvalidPercentage {
        dimension: String,
        week: String,
        bucket: String,
        value: f64,
    },

    #[error("Duplicate bucket {bucket} in {dimension}/{week}")]
    DuplicateBucket {
        dimension: String,
        week: String,
        bucket: String,
    },

    #[error("Rows for {dimension}/{week} disagree on total ({first} vs {second})")]
    InconsistentTotal {
        dimension: String,
        week: String,
        first: u64,
        second: u64,
    },

    #[error("Bucket counts for {dimension}/{week} sum to {sum}, above total {total}")]
    CountExceedsTotal {
        dimension: String,
        week: String,
        sum: u64,
        total: u64,
    },

    #[error("Percentages for {dimension}/{week} sum to {sum}, expected 1.0")]
    SumMismatch {
        dimension: String,
        week: String,
        sum: f64,
    },

    #[error("Artifact is not a valid report document: {0}")]
    InvalidArtifact(#[from] serde_json::Error),
}

/// Errors that can occur while publishing to the object store
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Object store rejected credentials: {0}")]
    Unauthorized(String),

    #[error("Invalid object store response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize artifact: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid destination: {0}")]
    InvalidDestination(String),
}

/// Errors that can occur while loading a suppression policy file
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Policy TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid policy: {0}")]
    Invalid(String),
}
