use chrono::NaiveDate;
use hwreport::aggregator::{normalize, NormalizedRecord, SuppressionMode, SuppressionPolicy, Threshold};
use hwreport::utils::error::ValidationError;
use hwreport::warehouse::RawRow;
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

fn week(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn rows(dimension: &str, week_start: &str, counts: &[(&str, u64)]) -> Vec<RawRow> {
    let total = counts.iter().map(|(_, c)| c).sum();
    counts
        .iter()
        .map(|(bucket, count)| RawRow::new(week(week_start), dimension, *bucket, *count, total))
        .collect()
}

fn shares(records: &[NormalizedRecord], dimension: &str, week_start: &str) -> BTreeMap<String, f64> {
    records
        .iter()
        .filter(|r| r.dimension == dimension && r.week == week(week_start))
        .map(|r| (r.bucket.clone(), r.percentage))
        .collect()
}

fn relative(fraction: f64) -> SuppressionPolicy {
    SuppressionPolicy {
        threshold: Threshold::Relative(fraction),
        mode: SuppressionMode::Merge,
    }
}

#[test]
fn test_long_tail_collapses_into_other() {
    let input = rows("cpu_vendor", "2024-01-01", &[("A", 90), ("B", 5), ("C", 5)]);

    let records = normalize(&input, &relative(0.10)).unwrap();

    let expected = BTreeMap::from([("A".to_string(), 0.9), ("Other".to_string(), 0.1)]);
    assert_eq!(shares(&records, "cpu_vendor", "2024-01-01"), expected);
}

#[test]
fn test_every_group_sums_to_one() {
    let mut input = rows("memory_gb", "2024-01-01", &[("4", 333), ("8", 333), ("16", 334), ("2", 3)]);
    input.extend(rows("arch", "2024-01-01", &[("x86", 7), ("x86-64", 11)]));
    input.extend(rows("memory_gb", "2024-01-08", &[("8", 1), ("16", 2)]));

    let records = normalize(&input, &SuppressionPolicy::default()).unwrap();

    let mut sums: BTreeMap<(NaiveDate, String), f64> = BTreeMap::new();
    for record in &records {
        assert!(record.percentage > 0.0 && record.percentage <= 1.0);
        *sums.entry((record.week, record.dimension.clone())).or_insert(0.0) += record.percentage;
    }

    assert_eq!(sums.len(), 3);
    for sum in sums.values() {
        assert!((sum - 1.0).abs() < 1e-6, "sum was {}", sum);
    }
}

#[test]
fn test_zero_total_group_is_omitted() {
    let mut input = rows("os", "2024-01-01", &[("Windows", 0), ("Linux", 0)]);
    input.extend(rows("os", "2024-01-08", &[("Windows", 2)]));

    let records = normalize(&input, &SuppressionPolicy::default()).unwrap();

    assert!(shares(&records, "os", "2024-01-01").is_empty());
    assert_eq!(shares(&records, "os", "2024-01-08")["Windows"], 1.0);
}

#[test]
fn test_input_order_does_not_matter() {
    let input = rows("resolution", "2024-01-01", &[("1920x1080", 50), ("1366x768", 30), ("0x0", 2), ("800x600", 1)]);
    let mut reversed = input.clone();
    reversed.reverse();

    let policy = SuppressionPolicy {
        threshold: Threshold::Absolute(5),
        mode: SuppressionMode::Merge,
    };

    assert_eq!(
        normalize(&input, &policy).unwrap(),
        normalize(&reversed, &policy).unwrap()
    );
}

#[test]
fn test_remainder_below_total_becomes_other() {
    let input = vec![RawRow::new(week("2024-01-01"), "cpu_cores", "4", 60, 100)];

    let records = normalize(&input, &SuppressionPolicy::default()).unwrap();

    let expected = BTreeMap::from([("4".to_string(), 0.6), ("Other".to_string(), 0.4)]);
    assert_eq!(shares(&records, "cpu_cores", "2024-01-01"), expected);
}

#[test]
fn test_inconsistent_totals_rejected() {
    let input = vec![
        RawRow::new(week("2024-01-01"), "os", "Windows", 5, 10),
        RawRow::new(week("2024-01-01"), "os", "Linux", 5, 12),
    ];

    let err = normalize(&input, &SuppressionPolicy::default()).unwrap_err();
    assert!(matches!(err, ValidationError::InconsistentTotal { .. }));
}

#[test]
fn test_drop_mode_renormalizes_retained_buckets() {
    let input = rows("cpu_vendor", "2024-01-01", &[("A", 60), ("B", 20), ("C", 1)]);
    let policy = SuppressionPolicy {
        threshold: Threshold::Absolute(10),
        mode: SuppressionMode::Drop,
    };

    let records = normalize(&input, &policy).unwrap();

    let expected = BTreeMap::from([("A".to_string(), 0.75), ("B".to_string(), 0.25)]);
    assert_eq!(shares(&records, "cpu_vendor", "2024-01-01"), expected);
}

#[test]
fn test_bucket_exactly_at_relative_threshold_is_kept() {
    let input = rows("cpu_vendor", "2024-01-01", &[("A", 93), ("B", 7)]);

    let records = normalize(&input, &relative(0.07)).unwrap();

    let expected = BTreeMap::from([("A".to_string(), 0.93), ("B".to_string(), 0.07)]);
    assert_eq!(shares(&records, "cpu_vendor", "2024-01-01"), expected);
}

#[test]
fn test_relative_threshold_truncates_to_whole_clients() {
    // 1% of 150 clients is 1.5, truncated to 1: a single client still counts
    let input = rows("cpu_vendor", "2024-01-01", &[("A", 149), ("B", 1)]);

    let records = normalize(&input, &SuppressionPolicy::default()).unwrap();

    let buckets: Vec<String> = shares(&records, "cpu_vendor", "2024-01-01").into_keys().collect();
    assert_eq!(buckets, vec!["A", "B"]);
}

#[test]
fn test_drop_mode_keeps_os_family_above_cutoff() {
    let input = rows(
        "os",
        "2024-01-01",
        &[("Windows_NT-10.0", 88), ("Windows_NT-6.1", 6), ("Windows_NT-6.3", 6)],
    );
    let policy = SuppressionPolicy {
        threshold: Threshold::Absolute(10),
        mode: SuppressionMode::Drop,
    };

    let records = normalize(&input, &policy).unwrap();

    let expected = BTreeMap::from([
        ("Windows_NT-10.0".to_string(), 0.88),
        ("Windows_NT-Other".to_string(), 0.12),
    ]);
    assert_eq!(shares(&records, "os", "2024-01-01"), expected);
}

