//! Typed rows: parsing warehouse results and expanding them per dimension.
//!
//! The warehouse returns one row per distinct combination of client
//! attributes, weighted by a client `count`. Every combination contributes
//! one bucket to each requested dimension, so the week's total is the same
//! for all dimensions: the sum of counts.

use super::client::Warehouse;
use super::queries::{QueryTemplate, WeekRange, HARDWARE_BY_DIMENSIONS};
use super::types::ResultSet;
use crate::dimensions::{DeviceMap, Dimension};
use crate::utils::error::QueryError;
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One attribute combination returned by `HARDWARE_BY_DIMENSIONS`
#[derive(Debug, Clone, PartialEq)]
pub struct HardwareRow {
    pub browser_arch: Option<String>,
    pub os: Option<String>,
    pub memory_gb: Option<i64>,
    pub is_wow64: bool,
    pub gfx0_vendor_id: Option<String>,
    pub gfx0_device_id: Option<String>,
    pub resolution: Option<String>,
    pub cpu_cores: Option<i64>,
    pub cpu_vendor: Option<String>,
    pub cpu_speed_mhz: Option<f64>,
    pub has_flash: Option<bool>,
    pub count: u64,
}

/// Count of clients in one bucket of one dimension for one week
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RawRow {
    pub week: NaiveDate,
    pub dimension: String,
    pub bucket: String,
    pub count: u64,
    pub total: u64,
}

impl RawRow {
    pub fn new(
        week: NaiveDate,
        dimension: impl Into<String>,
        bucket: impl Into<String>,
        count: u64,
        total: u64,
    ) -> Self {
        Self {
            week,
            dimension: dimension.into(),
            bucket: bucket.into(),
            count,
            total,
        }
    }
}

/// Resolves template columns to positions once per result set
struct Columns {
    index: BTreeMap<&'static str, usize>,
}

impl Columns {
    fn resolve(set: &ResultSet, template: &QueryTemplate) -> Result<Self, QueryError> {
        let mut index = BTreeMap::new();
        for column in template.columns {
            let position = set
                .column_index(column)
                .ok_or_else(|| QueryError::MissingColumn(column.to_string()))?;
            index.insert(*column, position);
        }
        Ok(Self { index })
    }

    fn raw<'r>(&self, row: &'r [Option<String>], column: &'static str) -> Option<&'r str> {
        self.index
            .get(column)
            .and_then(|&i| row.get(i))
            .and_then(|cell| cell.as_deref())
    }

    fn string(&self, row: &[Option<String>], column: &'static str) -> Option<String> {
        self.raw(row, column).map(str::to_string)
    }

    fn parsed<T: std::str::FromStr>(
        &self,
        row: &[Option<String>],
        column: &'static str,
    ) -> Result<Option<T>, QueryError> {
        match self.raw(row, column) {
            None => Ok(None),
            Some(value) => value.trim().parse().map(Some).map_err(|_| QueryError::MalformedValue {
                column: column.to_string(),
                value: value.to_string(),
            }),
        }
    }

    fn boolean(&self, row: &[Option<String>], column: &'static str) -> Result<Option<bool>, QueryError> {
        match self.raw(row, column) {
            None => Ok(None),
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(QueryError::MalformedValue {
                    column: column.to_string(),
                    value: value.to_string(),
                }),
            },
        }
    }
}

impl HardwareRow {
    /// Parse every row of a `HARDWARE_BY_DIMENSIONS` result
    ///
    /// # Errors
    /// * `QueryError::MissingColumn` - the result lacks a declared column
    /// * `QueryError::MalformedValue` - a cell cannot be parsed as its type
    pub fn from_result_set(set: &ResultSet) -> Result<Vec<HardwareRow>, QueryError> {
        let columns = Columns::resolve(set, &HARDWARE_BY_DIMENSIONS)?;

        set.rows
            .iter()
            .map(|row| {
                let count = columns
                    .parsed::<u64>(row, "count")?
                    .ok_or_else(|| QueryError::MalformedValue {
                        column: "count".to_string(),
                        value: "null".to_string(),
                    })?;

                Ok(HardwareRow {
                    browser_arch: columns.string(row, "browser_arch"),
                    os: columns.string(row, "os"),
                    memory_gb: columns.parsed(row, "memory_gb")?,
                    is_wow64: columns.boolean(row, "is_wow64")?.unwrap_or(false),
                    gfx0_vendor_id: columns.string(row, "gfx0_vendor_id"),
                    gfx0_device_id: columns.string(row, "gfx0_device_id"),
                    resolution: columns.string(row, "resolution"),
                    cpu_cores: columns.parsed(row, "cpu_cores")?,
                    cpu_vendor: columns.string(row, "cpu_vendor"),
                    cpu_speed_mhz: columns.parsed(row, "cpu_speed")?,
                    has_flash: columns.boolean(row, "has_flash")?,
                    count,
                })
            })
            .collect()
    }
}

/// Turn one week's attribute combinations into per-dimension bucket counts
///
/// **Public** - pure, no I/O
///
/// Rows are emitted in (dimension, bucket) order. A week with no clients
/// produces no rows at all.
pub fn expand_rows(
    week: NaiveDate,
    rows: &[HardwareRow],
    dimensions: &[Dimension],
    devices: &DeviceMap,
) -> Vec<RawRow> {
    let total: u64 = rows.iter().map(|r| r.count).sum();
    if total == 0 {
        return Vec::new();
    }

    let mut counts: BTreeMap<(Dimension, String), u64> = BTreeMap::new();
    for row in rows {
        for dimension in dimensions {
            *counts
                .entry((*dimension, dimension.bucket(row, devices)))
                .or_insert(0) += row.count;
        }
    }

    counts
        .into_iter()
        .map(|((dimension, bucket), count)| RawRow::new(week, dimension.as_str(), bucket, count, total))
        .collect()
}

/// Query every week and return the complete RawRow set for the range
///
/// **Public** - Query Layer entry point
///
/// # Errors
/// Any `QueryError` from the warehouse or row parsing; nothing is retried.
pub fn fetch_raw_rows(
    warehouse: &dyn Warehouse,
    weeks: &[WeekRange],
    dimensions: &[Dimension],
    devices: &DeviceMap,
) -> Result<Vec<RawRow>, QueryError> {
    let mut raw_rows = Vec::new();

    for (i, week) in weeks.iter().enumerate() {
        info!(
            "Querying week {}/{}: [{}, {})",
            i + 1,
            weeks.len(),
            week.start,
            week.end
        );

        let result = warehouse.run_query(&HARDWARE_BY_DIMENSIONS, &week.parameters())?;
        let rows = HardwareRow::from_result_set(&result)?;

        let expanded = expand_rows(week.start, &rows, dimensions, devices);
        if expanded.is_empty() {
            warn!("No clients reported for week {}", week.start);
        }
        debug!(
            "Week {}: {} combinations -> {} raw rows",
            week.start,
            rows.len(),
            expanded.len()
        );

        raw_rows.extend(expanded);
    }

    Ok(raw_rows)
}
