//! The nested report document and the Formatter that builds it.
//!
//! Shape: dimension -> week (`YYYY-MM-DD`) -> bucket -> percentage.

use crate::aggregator::NormalizedRecord;
use crate::utils::config::SUM_TOLERANCE;
use crate::utils::error::ValidationError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// bucket -> percentage
pub type BucketShares = BTreeMap<String, f64>;

/// The published artifact
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputDocument {
    pub dimensions: BTreeMap<String, BTreeMap<String, BucketShares>>,
}

impl OutputDocument {
    /// Bucket shares for one dimension and week
    pub fn get(&self, dimension: &str, week: &str) -> Option<&BucketShares> {
        self.dimensions.get(dimension).and_then(|weeks| weeks.get(week))
    }

    /// Every week present under any dimension
    pub fn weeks(&self) -> BTreeSet<String> {
        self.dimensions
            .values()
            .flat_map(|weeks| weeks.keys().cloned())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Carry forward data from a previous artifact
    ///
    /// A previous (dimension, week) entry is dropped only when this run
    /// recomputed that exact pair, i.e. the dimension is in `dimensions` and
    /// the week is in `weeks`. Everything else, including dimensions this
    /// run did not compute, is kept.
    pub fn merge_previous(&mut self, previous: OutputDocument, dimensions: &[&str], weeks: &[String]) {
        for (dimension, previous_weeks) in previous.dimensions {
            let recomputed_dimension = dimensions.contains(&dimension.as_str());

            let kept: Vec<(String, BucketShares)> = previous_weeks
                .into_iter()
                .filter(|(week, _)| !(recomputed_dimension && weeks.contains(week)))
                .collect();
            if kept.is_empty() {
                continue;
            }

            let target = self.dimensions.entry(dimension).or_default();
            for (week, shares) in kept {
                target.entry(week).or_insert(shares);
            }
        }
    }

    /// Check that every (dimension, week) sums to one within tolerance
    pub fn check_sums(&self) -> Result<(), ValidationError> {
        for (dimension, weeks) in &self.dimensions {
            for (week, shares) in weeks {
                let sum: f64 = shares.values().sum();
                if (sum - 1.0).abs() > SUM_TOLERANCE {
                    return Err(ValidationError::SumMismatch {
                        dimension: dimension.clone(),
                        week: week.clone(),
                        sum,
                    });
                }
            }
        }
        Ok(())
    }

    /// Parse an artifact previously produced in the nested layout
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ValidationError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Build the nested document from normalized records
///
/// **Public** - the Formatter; pure, no I/O
///
/// # Errors
/// * `ValidationError::EmptyField` - empty dimension or bucket name
/// * `ValidationError::InvalidPercentage` - percentage not a number in [0, 1]
/// * `ValidationError::DuplicateBucket` - the same bucket twice in one group
pub fn format_document(records: &[NormalizedRecord]) -> Result<OutputDocument, ValidationError> {
    let mut document = OutputDocument::default();

    for record in records {
        let week = record.week.format("%Y-%m-%d").to_string();
        validate_record(record, &week)?;

        let shares = document
            .dimensions
            .entry(record.dimension.clone())
            .or_default()
            .entry(week.clone())
            .or_default();

        if shares.insert(record.bucket.clone(), record.percentage).is_some() {
            return Err(ValidationError::DuplicateBucket {
                dimension: record.dimension.clone(),
                week,
                bucket: record.bucket.clone(),
            });
        }
    }

    debug!(
        "Formatted {} records into {} dimensions",
        records.len(),
        document.dimensions.len()
    );

    Ok(document)
}

/// Reject records that would produce an unusable document
fn validate_record(record: &NormalizedRecord, week: &str) -> Result<(), ValidationError> {
    if record.dimension.trim().is_empty() {
        return Err(ValidationError::EmptyField {
            week: week.to_string(),
            field: "dimension",
        });
    }

    if record.bucket.is_empty() {
        return Err(ValidationError::EmptyField {
            week: week.to_string(),
            field: "bucket",
        });
    }

    if !record.percentage.is_finite() || !(0.0..=1.0).contains(&record.percentage) {
        return Err(ValidationError::InvalidPercentage {
            dimension: record.dimension.clone(),
            week: week.to_string(),
            bucket: record.bucket.clone(),
            value: record.percentage,
        });
    }

    Ok(())
}
