//! Idempotent artifact publishing.
//!
//! The payload's SHA-256 is compared with the object already stored under
//! the key. An identical object means no write at all, so re-running a job
//! with unchanged data leaves the store untouched.

use super::store::ObjectStore;
use crate::utils::config::JSON_CONTENT_TYPE;
use crate::utils::error::PublishError;
use log::info;
use sha2::{Digest, Sha256};

/// What happened to one object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Written,
    Unchanged,
    DryRun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishOptions {
    /// Skip the write when the stored object hashes the same
    pub skip_unchanged: bool,

    /// Log what would be written and stop
    pub dry_run: bool,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            skip_unchanged: true,
            dry_run: false,
        }
    }
}

/// Hex-encoded SHA-256 of a payload
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Write `payload` to `key`, overwriting whatever is there
///
/// **Public** - the Publisher entry point
///
/// # Errors
/// Any `PublishError` from the store; nothing is retried.
pub fn publish_artifact(
    store: &dyn ObjectStore,
    key: &str,
    payload: &[u8],
    options: &PublishOptions,
) -> Result<PublishOutcome, PublishError> {
    let hash = content_hash(payload);
    let location = store.describe(key);

    if options.dry_run {
        info!(
            "Dry run: would write {} bytes (sha256 {}) to {}",
            payload.len(),
            hash,
            location
        );
        return Ok(PublishOutcome::DryRun);
    }

    if options.skip_unchanged {
        if let Some(existing) = store.get_object(key)? {
            if content_hash(&existing) == hash {
                info!("✓ {} unchanged (sha256 {}), skipping write", location, hash);
                return Ok(PublishOutcome::Unchanged);
            }
        }
    }

    store.put_object(key, payload, JSON_CONTENT_TYPE)?;
    info!("✓ Artifact written to: {} ({} bytes)", location, payload.len());

    Ok(PublishOutcome::Written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_stable() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(content_hash(b"a"), content_hash(b"b"));
    }

    #[test]
    fn test_default_options_skip_unchanged() {
        let options = PublishOptions::default();
        assert!(options.skip_unchanged);
        assert!(!options.dry_run);
    }
}
