//! Inventory records and their reduction to index queries.

use serde::{Deserialize, Serialize};

use crate::error::{PricingError, PricingResult};
use crate::index::PricingIndex;
use crate::models::ComputeDescriptor;

/// Running VM as listed by the inventory source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComputeInstance {
    pub name: String,
    /// Zone name or URL, e.g. `us-central1-a`
    pub zone: String,
    /// Machine type name or URL, e.g. `zones/us-central1-a/machineTypes/n2-standard-4`
    #[serde(rename = "machineType")]
    pub machine_type: String,
    #[serde(default)]
    pub scheduling: Scheduling,
    #[serde(rename = "guestCpus", default)]
    pub guest_cpus: Option<u32>,
    #[serde(rename = "memoryMb", default)]
    pub memory_mb: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scheduling {
    #[serde(rename = "provisioningModel", default)]
    pub provisioning_model: Option<String>,
    #[serde(default)]
    pub preemptible: bool,
}

impl Scheduling {
    pub fn is_spot(&self) -> bool {
        self.preemptible
            || self
                .provisioning_model
                .as_deref()
                .is_some_and(|model| model.eq_ignore_ascii_case("SPOT"))
    }
}

/// Persistent disk, zonal or regional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Disk {
    pub name: String,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// Disk type name or URL, e.g. `projects/p/zones/z/diskTypes/pd-ssd`
    #[serde(rename = "type")]
    pub disk_type: String,
    #[serde(rename = "sizeGb")]
    pub size_gb: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
    /// `US`, `EUROPE-WEST1`, ...
    pub location: String,
    #[serde(rename = "storageClass")]
    pub storage_class: String,
}

/// Disk or bucket reduced to a storage index query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageDescriptor {
    pub region: String,
    pub class: String,
    pub size_gib: u64,
}

impl StorageDescriptor {
    /// Dollars per hour for the whole volume
    pub fn hourly_cost(&self, index: &PricingIndex) -> PricingResult<f64> {
        Ok(index.get_storage_cost(&self.region, &self.class)? * self.size_gib as f64)
    }
}

fn last_segment(value: &str) -> &str {
    value.trim_end_matches('/').rsplit('/').next().unwrap_or(value)
}

/// `us-central1-a` → `us-central1`
pub fn region_from_zone(zone: &str) -> PricingResult<String> {
    let zone = last_segment(zone);
    match zone.rsplit_once('-') {
        Some((region, suffix)) if !region.is_empty() && suffix.len() == 1 => Ok(region.to_string()),
        _ => Err(PricingError::InvalidDescriptor(format!("not a zone: '{zone}'"))),
    }
}

/// `.../machineTypes/n2-standard-4` → `n2`
pub fn family_from_machine_type(machine_type: &str) -> PricingResult<String> {
    let name = last_segment(machine_type);
    match name.split('-').next() {
        Some(family) if !family.is_empty() && name.contains('-') => Ok(family.to_lowercase()),
        _ => Err(PricingError::InvalidDescriptor(format!(
            "not a machine type: '{machine_type}'"
        ))),
    }
}

impl ComputeDescriptor {
    pub fn from_instance(instance: &ComputeInstance) -> PricingResult<Self> {
        Ok(Self {
            region: region_from_zone(&instance.zone)?,
            family: family_from_machine_type(&instance.machine_type)?,
            spot: instance.scheduling.is_spot(),
        })
    }
}

impl Disk {
    pub fn region(&self) -> PricingResult<String> {
        match (&self.region, &self.zone) {
            (Some(region), _) => Ok(last_segment(region).to_string()),
            (None, Some(zone)) => region_from_zone(zone),
            (None, None) => Err(PricingError::InvalidDescriptor(format!(
                "disk '{}' has neither zone nor region",
                self.name
            ))),
        }
    }

    pub fn descriptor(&self) -> PricingResult<StorageDescriptor> {
        Ok(StorageDescriptor {
            region: self.region()?,
            class: last_segment(&self.disk_type).to_lowercase(),
            size_gib: self.size_gb,
        })
    }
}

impl Bucket {
    /// Per-GiB query; bucket sizes come from monitoring, not the inventory
    pub fn descriptor(&self) -> StorageDescriptor {
        StorageDescriptor {
            region: self.location.to_lowercase(),
            class: self.storage_class.to_lowercase(),
            size_gib: 1,
        }
    }
}
