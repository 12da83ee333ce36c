//! Legacy flat dashboard layout.
//!
//! One object per week, newest first. Each bucket becomes a key made of the
//! dimension's flat prefix and the bucket name (`osName_Darwin-19.6.0`),
//! plus a `date` key. Dimensions outside the catalog have no prefix and are
//! left out.

use super::document::OutputDocument;
use crate::dimensions::Dimension;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Flatten the nested document into per-week records
pub fn flatten(document: &OutputDocument) -> Vec<Map<String, Value>> {
    let mut by_week: BTreeMap<String, Map<String, Value>> = BTreeMap::new();

    for (name, weeks) in &document.dimensions {
        let Ok(dimension) = name.parse::<Dimension>() else {
            continue;
        };

        for (week, shares) in weeks {
            let entry = by_week.entry(week.clone()).or_default();
            for (bucket, share) in shares {
                entry.insert(format!("{}{}", dimension.flat_prefix(), bucket), Value::from(*share));
            }
        }
    }

    by_week
        .into_iter()
        .rev()
        .map(|(week, mut entry)| {
            entry.insert("date".to_string(), Value::String(week));
            entry
        })
        .collect()
}
