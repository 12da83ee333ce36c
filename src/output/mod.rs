//! Formatter: normalized records to the published artifact.
//!
//! This module handles:
//! - Building the nested dimension -> week -> bucket document
//! - The legacy flat layout consumed by older dashboards
//! - Serializing either layout to bytes

pub mod document;
pub mod flat;

// Re-export main types and functions
pub use document::{format_document, BucketShares, OutputDocument};
pub use flat::flatten;

use clap::ValueEnum;

/// Artifact layout written by the job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputLayout {
    /// dimension -> week -> bucket -> percentage
    #[default]
    Nested,

    /// One object per week with prefixed bucket keys
    Flat,
}

/// Serialize the document in the requested layout (pretty-printed JSON)
pub fn render_artifact(
    document: &OutputDocument,
    layout: OutputLayout,
) -> Result<Vec<u8>, serde_json::Error> {
    match layout {
        OutputLayout::Nested => serde_json::to_vec_pretty(document),
        OutputLayout::Flat => serde_json::to_vec_pretty(&flatten(document)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::NormalizedRecord;
    use chrono::NaiveDate;

    #[test]
    fn test_render_layouts() {
        let document = format_document(&[NormalizedRecord {
            week: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            dimension: "memory_gb".to_string(),
            bucket: "8".to_string(),
            percentage: 1.0,
        }])
        .unwrap();

        let nested: serde_json::Value =
            serde_json::from_slice(&render_artifact(&document, OutputLayout::Nested).unwrap()).unwrap();
        assert_eq!(nested["memory_gb"]["2024-01-01"]["8"], 1.0);

        let flat: serde_json::Value =
            serde_json::from_slice(&render_artifact(&document, OutputLayout::Flat).unwrap()).unwrap();
        assert_eq!(flat[0]["ram_8"], 1.0);
        assert_eq!(flat[0]["date"], "2024-01-01");
    }
}
