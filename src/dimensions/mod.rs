//! Dimension catalog and bucket derivation.
//!
//! This module defines:
//! - The dimensions the report is sliced along
//! - How a warehouse row maps to a bucket within each dimension
//! - GPU vendor names and the GPU device database

pub mod catalog;
pub mod gpu;

// Re-export main types
pub use catalog::{os_arch, parse_dimensions, Dimension};
pub use gpu::{fetch_device_map, gpu_vendor_name, DeviceMap, RawDeviceDb};
