//! Convert raw bucket counts into per-week, per-dimension percentages.
//!
//! Rows are grouped by (week, dimension) in ordered maps, so the output
//! depends only on the set of input rows, never on their order.

use super::suppression::{collapse_buckets, drop_buckets, CollapseRule, SuppressionMode, SuppressionPolicy};
use crate::dimensions::Dimension;
use crate::utils::config::OTHER_BUCKET;
use crate::utils::error::ValidationError;
use crate::warehouse::RawRow;
use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Share of one bucket within its (week, dimension) group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub week: NaiveDate,
    pub dimension: String,
    pub bucket: String,
    pub percentage: f64,
}

#[derive(Debug, Default)]
struct Group {
    total: Option<u64>,
    counts: BTreeMap<String, u64>,
}

/// Normalize raw rows into percentage records
///
/// **Public** - main entry point for the Normalizer
///
/// # Arguments
/// * `rows` - Raw rows from the Query Layer, in any order
/// * `policy` - Suppression threshold and mode
///
/// # Returns
/// Records sorted by (week, dimension, bucket). Percentages within every
/// emitted group sum to 1.0. Groups with a zero total are omitted.
///
/// # Errors
/// * `ValidationError::InconsistentTotal` - rows of one group disagree on total
/// * `ValidationError::CountExceedsTotal` - bucket counts add up to more than total
pub fn normalize(
    rows: &[RawRow],
    policy: &SuppressionPolicy,
) -> Result<Vec<NormalizedRecord>, ValidationError> {
    let groups = group_rows(rows)?;
    debug!("Normalizing {} rows in {} groups", rows.len(), groups.len());

    let mut records = Vec::new();
    for ((week, dimension), group) in groups {
        let total = group.total.unwrap_or(0);
        if total == 0 {
            warn!("Skipping {}/{}: zero total", dimension, week);
            continue;
        }

        let counts = account_for_remainder(&week, &dimension, group.counts, total)?;
        let rule = collapse_rule_for(&dimension);
        let cutoff = policy.threshold.cutoff(total);

        let (kept, denominator) = match policy.mode {
            SuppressionMode::Merge => (collapse_buckets(&counts, cutoff, rule), total),
            SuppressionMode::Drop => {
                let kept = drop_buckets(&counts, cutoff, rule);
                let retained: u64 = kept.values().sum();
                (kept, retained)
            }
        };

        if denominator == 0 {
            warn!("Skipping {}/{}: every bucket suppressed", dimension, week);
            continue;
        }

        debug!(
            "{}/{}: {} buckets -> {} after suppression (cutoff {})",
            dimension,
            week,
            counts.len(),
            kept.len(),
            cutoff
        );

        records.extend(kept.into_iter().map(|(bucket, count)| NormalizedRecord {
            week,
            dimension: dimension.clone(),
            bucket,
            percentage: count as f64 / denominator as f64,
        }));
    }

    Ok(records)
}

/// Group rows by (week, dimension), summing repeated buckets
fn group_rows(rows: &[RawRow]) -> Result<BTreeMap<(NaiveDate, String), Group>, ValidationError> {
    let mut groups: BTreeMap<(NaiveDate, String), Group> = BTreeMap::new();

    for row in rows {
        let group = groups.entry((row.week, row.dimension.clone())).or_default();

        match group.total {
            Some(total) if total != row.total => {
                return Err(ValidationError::InconsistentTotal {
                    dimension: row.dimension.clone(),
                    week: row.week.to_string(),
                    first: total.min(row.total),
                    second: total.max(row.total),
                });
            }
            Some(_) => {}
            None => group.total = Some(row.total),
        }

        *group.counts.entry(row.bucket.clone()).or_insert(0) += row.count;
    }

    Ok(groups)
}

/// Attribute clients missing from every bucket to "Other"
fn account_for_remainder(
    week: &NaiveDate,
    dimension: &str,
    mut counts: BTreeMap<String, u64>,
    total: u64,
) -> Result<BTreeMap<String, u64>, ValidationError> {
    let sum: u64 = counts.values().sum();

    if sum > total {
        return Err(ValidationError::CountExceedsTotal {
            dimension: dimension.to_string(),
            week: week.to_string(),
            sum,
            total,
        });
    }

    if sum < total {
        *counts.entry(OTHER_BUCKET.to_string()).or_insert(0) += total - sum;
    }

    Ok(counts)
}

/// Known dimensions carry their own rule; anything else collapses plainly
fn collapse_rule_for(dimension: &str) -> CollapseRule {
    dimension
        .parse::<Dimension>()
        .map(|d| d.collapse_rule())
        .unwrap_or(CollapseRule::Plain)
}
