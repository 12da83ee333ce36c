//! Minimum-sample suppression for long-tail buckets.
//!
//! Suppression is a pure function from bucket counts and a cutoff to new
//! bucket counts. Buckets below the cutoff are consolidated into the
//! synthetic "Other" bucket, so the total count is preserved.
//!
//! Two dimensions need more than the plain merge:
//! - OS buckets look like `<name>-<version>`. A small version first folds into
//!   `<name>-Other`; only if that family is still too small does it become "Other".
//! - Some buckets carry no information (a `0x0` resolution) and always go to "Other".

use crate::utils::config::{CUTOFF_EPSILON, DEFAULT_RELATIVE_THRESHOLD, OTHER_BUCKET};
use crate::utils::error::PolicyError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Minimum sample size a bucket needs to be reported on its own
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Threshold {
    /// Absolute client count
    Absolute(u64),

    /// Fraction of the group's total, e.g. 0.01 for 1%
    Relative(f64),
}

impl Threshold {
    /// Count below which a bucket is suppressed, for a group of `total` clients
    ///
    /// Relative cutoffs are truncated to whole clients, so 1% of 150 is 1.
    pub fn cutoff(&self, total: u64) -> u64 {
        match self {
            Threshold::Absolute(count) => *count,
            Threshold::Relative(fraction) => (total as f64 * fraction + CUTOFF_EPSILON).floor() as u64,
        }
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Threshold::Relative(DEFAULT_RELATIVE_THRESHOLD)
    }
}

/// What happens to suppressed buckets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionMode {
    /// Fold into "Other"
    #[default]
    Merge,

    /// Discard and renormalize over what remains
    Drop,
}

/// Per-dimension consolidation rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapseRule {
    /// Below-cutoff buckets go to "Other"
    Plain,

    /// Listed buckets always go to "Other"; others follow the plain rule
    AlwaysOther(&'static [&'static str]),

    /// `<family><sep><rest>` buckets fold into `<family><sep>Other` first,
    /// then a second pass moves anything still below the cutoff to "Other"
    FamilyThenOther { separator: char },
}

impl CollapseRule {
    fn forces_other(&self, bucket: &str) -> bool {
        match self {
            CollapseRule::AlwaysOther(buckets) => buckets.contains(&bucket),
            _ => false,
        }
    }
}

/// Threshold and mode, optionally loaded from a TOML policy file
///
/// ```toml
/// mode = "merge"
/// threshold = { relative = 0.01 }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SuppressionPolicy {
    #[serde(default)]
    pub threshold: Threshold,

    #[serde(default)]
    pub mode: SuppressionMode,
}

impl SuppressionPolicy {
    /// Reject thresholds that would suppress everything or nothing meaningful
    pub fn validate(&self) -> Result<(), PolicyError> {
        if let Threshold::Relative(fraction) = self.threshold {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(PolicyError::Invalid(format!(
                    "relative threshold must be in (0, 1], got {}",
                    fraction
                )));
            }
        }
        Ok(())
    }
}

/// Load a suppression policy from a TOML file
///
/// # Errors
/// * `PolicyError::Io` - If file cannot be read
/// * `PolicyError::Parse` - If TOML is invalid
/// * `PolicyError::Invalid` - If the threshold is out of range
pub fn load_policy(path: impl AsRef<Path>) -> Result<SuppressionPolicy, PolicyError> {
    let contents = fs::read_to_string(path)?;
    let policy: SuppressionPolicy = toml::from_str(&contents)?;
    policy.validate()?;
    Ok(policy)
}

/// Consolidate below-cutoff buckets into "Other"
///
/// **Public** - pure function, the sum of counts is preserved
pub fn collapse_buckets(
    counts: &BTreeMap<String, u64>,
    cutoff: u64,
    rule: CollapseRule,
) -> BTreeMap<String, u64> {
    let mut collapsed: BTreeMap<String, u64> = BTreeMap::new();

    for (bucket, count) in fold_families(counts, cutoff, rule) {
        let target = if rule.forces_other(&bucket) || count < cutoff {
            OTHER_BUCKET.to_string()
        } else {
            bucket
        };
        *collapsed.entry(target).or_insert(0) += count;
    }

    collapsed
}

/// Keep only buckets at or above the cutoff
///
/// **Public** - pure function, used in `SuppressionMode::Drop`. Family
/// regrouping happens first, so a family that is large enough survives.
pub fn drop_buckets(
    counts: &BTreeMap<String, u64>,
    cutoff: u64,
    rule: CollapseRule,
) -> BTreeMap<String, u64> {
    fold_families(counts, cutoff, rule)
        .into_iter()
        .filter(|(bucket, count)| !rule.forces_other(bucket) && *count >= cutoff)
        .collect()
}

/// Fold small `<family><sep><rest>` buckets into `<family><sep>Other`
fn fold_families(
    counts: &BTreeMap<String, u64>,
    cutoff: u64,
    rule: CollapseRule,
) -> BTreeMap<String, u64> {
    let CollapseRule::FamilyThenOther { separator } = rule else {
        return counts.clone();
    };

    let mut folded: BTreeMap<String, u64> = BTreeMap::new();
    for (bucket, &count) in counts {
        let target = match bucket.split_once(separator) {
            Some((family, _)) if count < cutoff => format!("{}{}{}", family, separator, OTHER_BUCKET),
            _ => bucket.clone(),
        };
        *folded.entry(target).or_insert(0) += count;
    }

    folded
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn counts(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
        pairs.iter().map(|(b, c)| (b.to_string(), *c)).collect()
    }

    #[test]
    fn test_plain_merge_into_other() {
        let input = counts(&[("A", 90), ("B", 5), ("C", 5)]);
        let cutoff = Threshold::Relative(0.10).cutoff(100);

        let collapsed = collapse_buckets(&input, cutoff, CollapseRule::Plain);

        assert_eq!(collapsed, counts(&[("A", 90), ("Other", 10)]));
    }

    #[test]
    fn test_absolute_cutoff() {
        let input = counts(&[("A", 40), ("B", 9), ("C", 10)]);

        let collapsed = collapse_buckets(&input, Threshold::Absolute(10).cutoff(59), CollapseRule::Plain);

        assert_eq!(collapsed, counts(&[("A", 40), ("C", 10), ("Other", 9)]));
    }

    #[test]
    fn test_existing_other_bucket_absorbs_tail() {
        let input = counts(&[("A", 80), ("Other", 15), ("B", 5)]);

        let collapsed = collapse_buckets(&input, 10, CollapseRule::Plain);

        assert_eq!(collapsed, counts(&[("A", 80), ("Other", 20)]));
    }

    #[test]
    fn test_always_other_buckets() {
        let input = counts(&[("1920x1080", 60), ("0x0", 30), ("800x600", 10)]);

        let collapsed = collapse_buckets(&input, 5, CollapseRule::AlwaysOther(&["0x0"]));

        assert_eq!(
            collapsed,
            counts(&[("1920x1080", 60), ("800x600", 10), ("Other", 30)])
        );
    }

    #[test]
    fn test_family_then_other() {
        let input = counts(&[
            ("Windows_NT-10.0", 70),
            ("Windows_NT-6.1", 6),
            ("Windows_NT-6.3", 6),
            ("Darwin-19.6.0", 5),
            ("Linux-5.4", 13),
        ]);

        let collapsed =
            collapse_buckets(&input, 10, CollapseRule::FamilyThenOther { separator: '-' });

        // Windows versions regroup into a big enough family; Darwin does not
        assert_eq!(
            collapsed,
            counts(&[
                ("Linux-5.4", 13),
                ("Other", 5),
                ("Windows_NT-10.0", 70),
                ("Windows_NT-Other", 12),
            ])
        );
    }

    #[test]
    fn test_collapse_preserves_total() {
        let input = counts(&[("a-1", 1), ("a-2", 2), ("b", 3), ("c-9", 50), ("d", 44)]);
        let total: u64 = input.values().sum();

        for rule in [
            CollapseRule::Plain,
            CollapseRule::AlwaysOther(&["d"]),
            CollapseRule::FamilyThenOther { separator: '-' },
        ] {
            let collapsed = collapse_buckets(&input, 5, rule);
            assert_eq!(collapsed.values().sum::<u64>(), total);
        }
    }

    #[test]
    fn test_drop_buckets() {
        let input = counts(&[("A", 90), ("B", 5), ("0x0", 50)]);

        let kept = drop_buckets(&input, 10, CollapseRule::AlwaysOther(&["0x0"]));

        assert_eq!(kept, counts(&[("A", 90)]));
    }

    #[test]
    fn test_load_policy() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mode = \"drop\"\nthreshold = {{ absolute = 50 }}").unwrap();

        let policy = load_policy(file.path()).unwrap();

        assert_eq!(policy.mode, SuppressionMode::Drop);
        assert_eq!(policy.threshold, Threshold::Absolute(50));
    }

    #[test]
    fn test_load_policy_defaults_and_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "threshold = {{ relative = 1.5 }}").unwrap();
        assert!(matches!(load_policy(file.path()), Err(PolicyError::Invalid(_))));

        let empty = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(load_policy(empty.path()).unwrap(), SuppressionPolicy::default());
    }

    #[test]
    fn test_relative_cutoff_is_whole_clients() {
        assert_eq!(Threshold::Relative(0.07).cutoff(100), 7);
        assert_eq!(Threshold::Relative(0.01).cutoff(150), 1);
        assert_eq!(Threshold::Relative(0.01).cutoff(99), 0);
        assert_eq!(Threshold::Absolute(25).cutoff(10), 25);
    }

    #[test]
    fn test_bucket_at_cutoff_is_kept() {
        let input = counts(&[("A", 93), ("B", 7)]);

        let collapsed = collapse_buckets(&input, Threshold::Relative(0.07).cutoff(100), CollapseRule::Plain);

        assert_eq!(collapsed, input);
    }

    #[test]
    fn test_drop_keeps_large_enough_family() {
        let input = counts(&[
            ("Windows_NT-10.0", 70),
            ("Windows_NT-6.1", 6),
            ("Windows_NT-6.3", 6),
            ("Darwin-19.6.0", 5),
        ]);

        let kept = drop_buckets(&input, 10, CollapseRule::FamilyThenOther { separator: '-' });

        assert_eq!(
            kept,
            counts(&[("Windows_NT-10.0", 70), ("Windows_NT-Other", 12)])
        );
    }
}
