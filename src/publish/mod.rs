//! Publisher: writing the artifact to an object store.
//!
//! This module handles:
//! - The `ObjectStore` trait with local-directory and GCS implementations
//! - Parsing destination URLs
//! - Hash-compared, overwrite-only publishing

pub mod destination;
pub mod gcs;
pub mod publisher;
pub mod store;

// Re-export main types and functions
pub use destination::Destination;
pub use gcs::GcsStore;
pub use publisher::{content_hash, publish_artifact, PublishOptions, PublishOutcome};
pub use store::{LocalStore, ObjectStore};
