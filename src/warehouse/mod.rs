//! Query Layer: templated warehouse queries and typed result rows.
//!
//! This module handles:
//! - Named query templates and their date parameters
//! - The BigQuery REST client (behind the `Warehouse` trait)
//! - Parsing result sets and expanding them into per-dimension RawRows

pub mod client;
pub mod queries;
pub mod rows;
pub mod types;

// Re-export main types
pub use client::{BigQueryClient, Warehouse};
pub use queries::{weeks_for, QueryParameter, QueryTemplate, WeekRange, HARDWARE_BY_DIMENSIONS};
pub use rows::{expand_rows, fetch_raw_rows, HardwareRow, RawRow};
pub use types::ResultSet;
