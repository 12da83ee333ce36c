use crate::dimensions::Dimension;
use crate::output::OutputDocument;
use crate::utils::config::SCHEMA_VERSION;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Validate a published (nested) artifact file
pub fn validate_artifact_file(file_path: PathBuf) -> Result<()> {
    println!("Validating artifact: {}", file_path.display());

    let bytes = std::fs::read(&file_path)
        .with_context(|| format!("Failed to read {}", file_path.display()))?;
    let document = OutputDocument::from_slice(&bytes)?;
    document.check_sums()?;

    let buckets: usize = document
        .dimensions
        .values()
        .flat_map(|weeks| weeks.values())
        .map(|shares| shares.len())
        .sum();

    println!("✓ Valid report artifact");
    println!("  Dimensions: {}", document.dimensions.len());
    let weeks = document.weeks();
    println!("  Weeks: {}", weeks.len());
    if let (Some(first), Some(last)) = (weeks.first(), weeks.last()) {
        println!("  Range: {} .. {}", first, last);
    }
    println!("  Buckets: {}", buckets);

    Ok(())
}

/// Display the dimension catalog
pub fn display_dimensions() {
    println!("{:<18} {:<14} Description", "Dimension", "Flat prefix");
    for dimension in Dimension::ALL {
        println!(
            "{:<18} {:<14} {}",
            dimension.as_str(),
            dimension.flat_prefix(),
            dimension.description()
        );
    }
}

/// Display version information
pub fn display_version() {
    println!("hwreport v{}", env!("CARGO_PKG_VERSION"));
    println!("Artifact Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Weekly hardware survey aggregation job.");
}
