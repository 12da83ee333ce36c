//! The dimensions a hardware population is sliced along.
//!
//! Each dimension knows how to derive its bucket from a warehouse row,
//! the key prefix used by the flat dashboard layout, and which collapse
//! rule applies to its long tail.

use super::gpu::{gpu_vendor_name, DeviceMap};
use crate::aggregator::suppression::CollapseRule;
use crate::utils::config::{OTHER_BUCKET, UNKNOWN_BUCKET};
use crate::warehouse::rows::HardwareRow;
use std::fmt;
use std::str::FromStr;

/// Resolutions that carry no information and always land in "Other"
const EMPTY_RESOLUTIONS: &[&str] = &["0x0"];

/// A categorical attribute of the client population
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dimension {
    Arch,
    Os,
    OsArch,
    CpuCores,
    CpuVendor,
    CpuSpeed,
    GpuVendor,
    GpuModel,
    Resolution,
    MemoryGb,
    HasFlash,
}

impl Dimension {
    pub const ALL: [Dimension; 11] = [
        Dimension::Arch,
        Dimension::Os,
        Dimension::OsArch,
        Dimension::CpuCores,
        Dimension::CpuVendor,
        Dimension::CpuSpeed,
        Dimension::GpuVendor,
        Dimension::GpuModel,
        Dimension::Resolution,
        Dimension::MemoryGb,
        Dimension::HasFlash,
    ];

    /// Name used in the nested artifact and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Arch => "arch",
            Dimension::Os => "os",
            Dimension::OsArch => "os_arch",
            Dimension::CpuCores => "cpu_cores",
            Dimension::CpuVendor => "cpu_vendor",
            Dimension::CpuSpeed => "cpu_speed",
            Dimension::GpuVendor => "gfx0_vendor_name",
            Dimension::GpuModel => "gfx0_model",
            Dimension::Resolution => "resolution",
            Dimension::MemoryGb => "memory_gb",
            Dimension::HasFlash => "has_flash",
        }
    }

    /// Key prefix in the flat dashboard layout
    pub fn flat_prefix(&self) -> &'static str {
        match self {
            Dimension::Arch => "browserArch_",
            Dimension::Os => "osName_",
            Dimension::OsArch => "osArch_",
            Dimension::CpuCores => "cpuCores_",
            Dimension::CpuVendor => "cpuVendor_",
            Dimension::CpuSpeed => "cpuSpeed_",
            Dimension::GpuVendor => "gpuVendor_",
            Dimension::GpuModel => "gpuModel_",
            Dimension::Resolution => "resolution_",
            Dimension::MemoryGb => "ram_",
            Dimension::HasFlash => "hasFlash_",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Dimension::Arch => "Browser build architecture",
            Dimension::Os => "Operating system name and version",
            Dimension::OsArch => "Operating system architecture (x86 / x86-64)",
            Dimension::CpuCores => "Number of CPU cores",
            Dimension::CpuVendor => "CPU vendor string",
            Dimension::CpuSpeed => "CPU clock speed in GHz",
            Dimension::GpuVendor => "Primary GPU vendor",
            Dimension::GpuModel => "Primary GPU family and chipset",
            Dimension::Resolution => "Primary monitor resolution",
            Dimension::MemoryGb => "Installed memory in GB",
            Dimension::HasFlash => "Flash plugin installed",
        }
    }

    /// How suppressed buckets of this dimension are consolidated
    pub fn collapse_rule(&self) -> CollapseRule {
        match self {
            Dimension::Os => CollapseRule::FamilyThenOther { separator: '-' },
            Dimension::Resolution => CollapseRule::AlwaysOther(EMPTY_RESOLUTIONS),
            _ => CollapseRule::Plain,
        }
    }

    /// Derive this dimension's bucket for one warehouse row
    pub fn bucket(&self, row: &HardwareRow, devices: &DeviceMap) -> String {
        match self {
            Dimension::Arch => or_other(row.browser_arch.clone()),
            Dimension::Os => or_other(row.os.clone()),
            Dimension::OsArch => {
                let os_name = row
                    .os
                    .as_deref()
                    .and_then(|os| os.split('-').next())
                    .unwrap_or_default();
                os_arch(
                    row.browser_arch.as_deref().unwrap_or_default(),
                    os_name,
                    row.is_wow64,
                )
                .to_string()
            }
            Dimension::CpuCores => or_other(row.cpu_cores.map(|c| c.to_string())),
            Dimension::CpuVendor => or_other(row.cpu_vendor.clone()),
            Dimension::CpuSpeed => or_other(row.cpu_speed_mhz.map(|mhz| format!("{:.1}", mhz / 1000.0))),
            Dimension::GpuVendor => row
                .gfx0_vendor_id
                .as_deref()
                .map(gpu_vendor_name)
                .unwrap_or(OTHER_BUCKET)
                .to_string(),
            Dimension::GpuModel => match (&row.gfx0_vendor_id, &row.gfx0_device_id) {
                (Some(vendor), Some(device)) => devices.family_chipset(vendor, device),
                _ => UNKNOWN_BUCKET.to_string(),
            },
            Dimension::Resolution => or_other(row.resolution.clone()),
            Dimension::MemoryGb => or_other(row.memory_gb.map(|gb| gb.to_string())),
            Dimension::HasFlash => or_other(row.has_flash.map(|flash| {
                let label = if flash { "True" } else { "False" };
                label.to_string()
            })),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dimension::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == s.trim())
            .ok_or_else(|| format!("Unknown dimension: {}", s))
    }
}

/// Parse dimension names, keeping first-seen order; an empty list selects all
pub fn parse_dimensions(names: &[String]) -> Result<Vec<Dimension>, String> {
    if names.is_empty() {
        return Ok(Dimension::ALL.to_vec());
    }

    let mut dimensions = Vec::with_capacity(names.len());
    for name in names {
        let dimension: Dimension = name.parse()?;
        if !dimensions.contains(&dimension) {
            dimensions.push(dimension);
        }
    }

    Ok(dimensions)
}

/// Infer the OS architecture from the browser build
///
/// A 64-bit build implies a 64-bit OS. A 32-bit build on Windows running
/// under WOW64 is also on a 64-bit OS. Anything else is assumed 32-bit.
pub fn os_arch(browser_arch: &str, os_name: &str, is_wow64: bool) -> &'static str {
    if browser_arch == "x86-64" {
        return "x86-64";
    }

    if os_name == "Windows_NT" && is_wow64 {
        return "x86-64";
    }

    "x86"
}

fn or_other(value: Option<String>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| OTHER_BUCKET.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> HardwareRow {
        HardwareRow {
            browser_arch: Some("x86".to_string()),
            os: Some("Windows_NT-10.0".to_string()),
            memory_gb: Some(8),
            is_wow64: true,
            gfx0_vendor_id: Some("0x10de".to_string()),
            gfx0_device_id: Some("0x1c82".to_string()),
            resolution: Some("1920x1080".to_string()),
            cpu_cores: Some(4),
            cpu_vendor: Some("GenuineIntel".to_string()),
            cpu_speed_mhz: Some(2394.0),
            has_flash: Some(false),
            count: 1,
        }
    }

    #[test]
    fn test_os_arch() {
        assert_eq!(os_arch("x86", "Windows_NT", false), "x86");
        assert_eq!(os_arch("x86", "Windows_NT", true), "x86-64");
        assert_eq!(os_arch("x86", "Darwin", true), "x86");
        assert_eq!(os_arch("x86-64", "Darwin", true), "x86-64");
        assert_eq!(os_arch("x86-64", "Windows_NT", false), "x86-64");
    }

    #[test]
    fn test_bucket_derivation() {
        let devices = DeviceMap::default();
        let row = row();

        assert_eq!(Dimension::OsArch.bucket(&row, &devices), "x86-64");
        assert_eq!(Dimension::CpuSpeed.bucket(&row, &devices), "2.4");
        assert_eq!(Dimension::GpuVendor.bucket(&row, &devices), "NVIDIA");
        assert_eq!(Dimension::GpuModel.bucket(&row, &devices), "Unknown");
        assert_eq!(Dimension::HasFlash.bucket(&row, &devices), "False");
        assert_eq!(Dimension::MemoryGb.bucket(&row, &devices), "8");
    }

    #[test]
    fn test_missing_values_become_other() {
        let devices = DeviceMap::default();
        let row = HardwareRow {
            cpu_vendor: None,
            cpu_speed_mhz: None,
            gfx0_vendor_id: None,
            has_flash: None,
            ..row()
        };

        assert_eq!(Dimension::CpuVendor.bucket(&row, &devices), "Other");
        assert_eq!(Dimension::CpuSpeed.bucket(&row, &devices), "Other");
        assert_eq!(Dimension::GpuVendor.bucket(&row, &devices), "Other");
        assert_eq!(Dimension::GpuModel.bucket(&row, &devices), "Unknown");
        assert_eq!(Dimension::HasFlash.bucket(&row, &devices), "Other");
    }

    #[test]
    fn test_parse_dimensions() {
        assert_eq!(parse_dimensions(&[]).unwrap().len(), Dimension::ALL.len());

        let names = vec!["os".to_string(), "memory_gb".to_string(), "os".to_string()];
        assert_eq!(
            parse_dimensions(&names).unwrap(),
            vec![Dimension::Os, Dimension::MemoryGb]
        );

        assert!(parse_dimensions(&["gpu".to_string()]).is_err());
    }

    #[test]
    fn test_names_round_trip() {
        for dimension in Dimension::ALL {
            assert_eq!(dimension.as_str().parse::<Dimension>().unwrap(), dimension);
        }
    }
}
