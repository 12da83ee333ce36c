//! Named, statically parameterized warehouse query templates.
//!
//! Query text never gets built from user input. Each template declares the
//! named parameters it binds and the columns its result must contain.

use chrono::{Duration, NaiveDate};

/// A fixed query with declared parameters and result columns
#[derive(Debug, Clone, Copy)]
pub struct QueryTemplate {
    pub name: &'static str,
    pub sql: &'static str,
    pub parameters: &'static [&'static str],
    pub columns: &'static [&'static str],
}

/// A typed value bound to a named query parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryParameter {
    Date { name: &'static str, value: NaiveDate },
}

impl QueryParameter {
    pub fn name(&self) -> &'static str {
        match self {
            QueryParameter::Date { name, .. } => name,
        }
    }

    /// Warehouse type name of the parameter
    pub fn type_name(&self) -> &'static str {
        match self {
            QueryParameter::Date { .. } => "DATE",
        }
    }

    /// Value rendered the way the warehouse expects it
    pub fn value(&self) -> String {
        match self {
            QueryParameter::Date { value, .. } => value.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Half-open week window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeekRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekRange {
    pub fn starting(start: NaiveDate) -> Self {
        Self {
            start,
            end: start + Duration::days(7),
        }
    }

    /// Parameters for a template keyed on `@date_from` / `@date_to`
    pub fn parameters(&self) -> Vec<QueryParameter> {
        vec![
            QueryParameter::Date {
                name: "date_from",
                value: self.start,
            },
            QueryParameter::Date {
                name: "date_to",
                value: self.end,
            },
        ]
    }
}

/// Weeks to process: `date_from` plus `past_weeks` earlier weeks, newest first
pub fn weeks_for(date_from: NaiveDate, past_weeks: u32) -> Vec<WeekRange> {
    (0..=past_weeks as i64)
        .map(|n| WeekRange::starting(date_from - Duration::weeks(n)))
        .collect()
}

/// Latest ping per client in the window, grouped by every hardware attribute.
pub const HARDWARE_BY_DIMENSIONS: QueryTemplate = QueryTemplate {
    name: "hardware_by_dimensions",
    parameters: &["date_from", "date_to"],
    columns: &[
        "browser_arch",
        "os",
        "memory_gb",
        "is_wow64",
        "gfx0_vendor_id",
        "gfx0_device_id",
        "resolution",
        "cpu_cores",
        "cpu_vendor",
        "cpu_speed",
        "has_flash",
        "count",
    ],
    sql: r#"
WITH
  rank_per_client AS (
    SELECT
      *,
      ROW_NUMBER() OVER (PARTITION BY client_id ORDER BY submission_timestamp DESC) AS rn
    FROM
      `moz-fx-data-shared-prod.telemetry_stable.main_v4`
    WHERE
      DATE(submission_timestamp) >= @date_from
      AND DATE(submission_timestamp) < @date_to
  ),
  latest_per_client AS (
    SELECT
      environment.build.architecture AS browser_arch,
      COALESCE(environment.system.os.name, 'Other') AS os_name,
      COALESCE(
        IF(environment.system.os.name = 'Linux',
           REGEXP_EXTRACT(environment.system.os.version, r"^[0-9]+\.[0-9]+"),
           environment.system.os.version),
        'Other') AS os_version,
      environment.system.memory_mb,
      COALESCE(environment.system.is_wow64, FALSE) AS is_wow64,
      IF(ARRAY_LENGTH(environment.system.gfx.adapters) > 0,
         environment.system.gfx.adapters[OFFSET(0)].vendor_id, NULL) AS gfx0_vendor_id,
      IF(ARRAY_LENGTH(environment.system.gfx.adapters) > 0,
         environment.system.gfx.adapters[OFFSET(0)].device_id, NULL) AS gfx0_device_id,
      IF(ARRAY_LENGTH(environment.system.gfx.monitors) > 0,
         environment.system.gfx.monitors[OFFSET(0)].screen_width, 0) AS screen_width,
      IF(ARRAY_LENGTH(environment.system.gfx.monitors) > 0,
         environment.system.gfx.monitors[OFFSET(0)].screen_height, 0) AS screen_height,
      environment.system.cpu.cores AS cpu_cores,
      environment.system.cpu.vendor AS cpu_vendor,
      environment.system.cpu.speed_m_hz AS cpu_speed,
      'Shockwave Flash' IN (SELECT name FROM UNNEST(environment.addons.active_plugins)) AS has_flash
    FROM
      rank_per_client
    WHERE
      rn = 1
  ),
  transformed AS (
    SELECT
      browser_arch,
      CONCAT(os_name, '-', os_version) AS os,
      COALESCE(SAFE_CAST(ROUND(memory_mb / 1024.0) AS INT64), 0) AS memory_gb,
      is_wow64,
      gfx0_vendor_id,
      gfx0_device_id,
      CONCAT(CAST(screen_width AS STRING), 'x', CAST(screen_height AS STRING)) AS resolution,
      cpu_cores,
      cpu_vendor,
      cpu_speed,
      has_flash
    FROM
      latest_per_client
  )
SELECT
  *,
  COUNT(*) AS count
FROM
  transformed
GROUP BY
  browser_arch,
  os,
  memory_gb,
  is_wow64,
  gfx0_vendor_id,
  gfx0_device_id,
  resolution,
  cpu_cores,
  cpu_vendor,
  cpu_speed,
  has_flash
"#,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_weeks_for_backfill() {
        let weeks = weeks_for(date("2024-01-15"), 2);

        assert_eq!(weeks.len(), 3);
        assert_eq!(weeks[0].start, date("2024-01-15"));
        assert_eq!(weeks[0].end, date("2024-01-22"));
        assert_eq!(weeks[2].start, date("2024-01-01"));
        assert_eq!(weeks[2].end, date("2024-01-08"));
    }

    #[test]
    fn test_week_parameters() {
        let params = WeekRange::starting(date("2024-01-01")).parameters();

        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name(), "date_from");
        assert_eq!(params[0].value(), "2024-01-01");
        assert_eq!(params[1].name(), "date_to");
        assert_eq!(params[1].value(), "2024-01-08");
        assert_eq!(params[1].type_name(), "DATE");
    }

    #[test]
    fn test_template_binds_declared_parameters() {
        for name in HARDWARE_BY_DIMENSIONS.parameters {
            assert!(HARDWARE_BY_DIMENSIONS.sql.contains(&format!("@{}", name)));
        }
    }
}
