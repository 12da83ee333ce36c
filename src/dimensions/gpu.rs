//! GPU vendor names and the device database used for the GPU model dimension.
//!
//! The device database is published as one JSON file per vendor with the layout
//! `vendor id -> device family -> chipset -> [device ids]` (ids without `0x`).
//! Telemetry reports `0x`-prefixed ids, so the files are inverted into
//! `0xvendor -> 0xdevice -> (family, chipset)` before lookup.

use crate::utils::config::{DEFAULT_HTTP_TIMEOUT, GPU_DB_FILES, OTHER_BUCKET, UNKNOWN_BUCKET};
use crate::utils::error::QueryError;
use log::{debug, info};
use reqwest::blocking::Client;
use std::collections::{BTreeMap, HashMap};

/// One vendor file of the device database, as published
pub type RawDeviceDb = BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<String>>>>;

const GPU_VENDORS: &[(&str, &str)] = &[
    ("0x1013", "Cirrus Logic"),
    ("0x1002", "AMD"),
    ("0x8086", "Intel"),
    ("Intel Open Source Technology Center", "Intel"),
    ("0x5333", "S3 Graphics"),
    ("0x1039", "SIS"),
    ("0x1106", "VIA"),
    ("0x10de", "NVIDIA"),
    ("0x102b", "Matrox"),
    ("0x15ad", "VMWare"),
    ("0x80ee", "Oracle VirtualBox"),
    ("0x1414", "Microsoft Basic"),
];

/// Map a GPU vendor id to its display name, "Other" when unknown
pub fn gpu_vendor_name(vendor_id: &str) -> &'static str {
    GPU_VENDORS
        .iter()
        .find(|(id, _)| *id == vendor_id)
        .map(|(_, name)| *name)
        .unwrap_or(OTHER_BUCKET)
}

/// Inverted device database: vendor id -> device id -> (family, chipset)
#[derive(Debug, Clone, Default)]
pub struct DeviceMap {
    devices: HashMap<String, HashMap<String, (String, String)>>,
}

impl DeviceMap {
    /// Invert one published vendor file
    pub fn invert(raw: &RawDeviceDb) -> Self {
        let mut devices: HashMap<String, HashMap<String, (String, String)>> = HashMap::new();

        for (vendor, families) in raw {
            let by_device = devices.entry(format!("0x{}", vendor)).or_default();
            for (family, chipsets) in families {
                for (chipset, ids) in chipsets {
                    for id in ids {
                        by_device.insert(format!("0x{}", id), (family.clone(), chipset.clone()));
                    }
                }
            }
        }

        Self { devices }
    }

    /// Merge another map in; later vendors replace earlier ones wholesale
    pub fn extend(&mut self, other: DeviceMap) {
        self.devices.extend(other.devices);
    }

    /// "<family>-<chipset>" for a known device, "Unknown" otherwise
    pub fn family_chipset(&self, vendor_id: &str, device_id: &str) -> String {
        match self
            .devices
            .get(vendor_id)
            .and_then(|by_device| by_device.get(device_id))
        {
            Some((family, chipset)) => format!("{}-{}", family, chipset),
            None => UNKNOWN_BUCKET.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Total number of devices across vendors
    pub fn device_count(&self) -> usize {
        self.devices.values().map(HashMap::len).sum()
    }
}

/// Download every vendor file under `base_url` and build the combined map
pub fn fetch_device_map(base_url: &str) -> Result<DeviceMap, QueryError> {
    let client = Client::builder()
        .timeout(DEFAULT_HTTP_TIMEOUT)
        .build()
        .map_err(QueryError::RequestFailed)?;

    let mut map = DeviceMap::default();
    for file in GPU_DB_FILES {
        let url = format!("{}/{}", base_url.trim_end_matches('/'), file);
        debug!("Fetching GPU device database: {}", url);

        let response = client.get(&url).send().map_err(QueryError::RequestFailed)?;
        if !response.status().is_success() {
            return Err(QueryError::ReferenceData(format!(
                "{}: HTTP {}",
                url,
                response.status()
            )));
        }

        let raw: RawDeviceDb = response
            .json()
            .map_err(|e| QueryError::ReferenceData(format!("{}: {}", url, e)))?;
        map.extend(DeviceMap::invert(&raw));
    }

    info!("Loaded GPU device database ({} devices)", map.device_count());

    Ok(map)
}
