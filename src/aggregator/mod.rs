//! Normalization of raw bucket counts into weekly percentages.
//!
//! This module transforms Query Layer rows into:
//! - Per (week, dimension) groups with a consistent total
//! - Long-tail suppression into "Other" (or dropped buckets)
//! - Percentage records that sum to one per group

pub mod normalizer;
pub mod suppression;

// Re-export main types and functions
pub use normalizer::{normalize, NormalizedRecord};
pub use suppression::{
    collapse_buckets, drop_buckets, load_policy, CollapseRule, SuppressionMode, SuppressionPolicy,
    Threshold,
};
