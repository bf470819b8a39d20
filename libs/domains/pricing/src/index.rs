//! Immutable pricing index and the builder that folds facts into it.

use serde::Serialize;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::{debug, warn};

use crate::catalog::FoldStats;
use crate::compute::normalize_key;
use crate::error::{PricingError, PricingResult};
use crate::models::{ComputeCost, ComputeDescriptor, PricedFact, PricingModel, ResourceKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rates {
    pub cpu: Option<f64>,
    pub ram: Option<f64>,
}

impl Rates {
    fn slot(&mut self, kind: ResourceKind) -> Option<&mut Option<f64>> {
        match kind {
            ResourceKind::Cpu => Some(&mut self.cpu),
            ResourceKind::Ram => Some(&mut self.ram),
            ResourceKind::Storage => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FamilyPrices {
    pub on_demand: Rates,
    pub spot: Rates,
}

impl FamilyPrices {
    pub fn rates(&self, model: PricingModel) -> &Rates {
        match model {
            PricingModel::OnDemand => &self.on_demand,
            PricingModel::Spot => &self.spot,
        }
    }

    fn rates_mut(&mut self, model: PricingModel) -> &mut Rates {
        match model {
            PricingModel::OnDemand => &mut self.on_demand,
            PricingModel::Spot => &mut self.spot,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegionPrices {
    pub families: HashMap<String, FamilyPrices>,
    /// Storage class to dollars per GiB-hour
    pub storage: HashMap<String, f64>,
}

/// Region → family → pricing model → cpu/ram, and region → storage class.
///
/// Never mutated once built; a refresh builds a new one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PricingIndex {
    regions: HashMap<String, RegionPrices>,
    stats: FoldStats,
}

impl PricingIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn stats(&self) -> &FoldStats {
        &self.stats
    }

    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    pub fn region(&self, region: &str) -> Option<&RegionPrices> {
        self.regions.get(&normalize_key(region))
    }

    pub fn family_count(&self) -> usize {
        self.regions.values().map(|r| r.families.len()).sum()
    }

    pub fn storage_class_count(&self) -> usize {
        self.regions.values().map(|r| r.storage.len()).sum()
    }

    fn region_or_miss(&self, region: &str) -> PricingResult<&RegionPrices> {
        self.region(region)
            .ok_or_else(|| PricingError::RegionNotFound(region.to_string()))
    }

    /// CPU and RAM prices per hour for a family in a region.
    ///
    /// A single component the catalog never priced reads as zero. A missing
    /// region or family, or a pricing model with neither component, is an
    /// error.
    pub fn get_compute_cost(&self, descriptor: &ComputeDescriptor) -> PricingResult<ComputeCost> {
        let region = self.region_or_miss(&descriptor.region)?;
        let family = region
            .families
            .get(&normalize_key(&descriptor.family))
            .ok_or_else(|| PricingError::FamilyNotFound {
                region: descriptor.region.clone(),
                family: descriptor.family.clone(),
            })?;
        let model = descriptor.pricing_model();
        let rates = family.rates(model);
        if rates.cpu.is_none() && rates.ram.is_none() {
            return Err(PricingError::PricingModelNotFound {
                region: descriptor.region.clone(),
                family: descriptor.family.clone(),
                model: model.to_string(),
            });
        }

        Ok(ComputeCost {
            cpu_per_hour: rates.cpu.unwrap_or_default(),
            ram_per_hour: rates.ram.unwrap_or_default(),
        })
    }

    /// Dollars per GiB-hour for a storage class in a region
    pub fn get_storage_cost(&self, region: &str, storage_class: &str) -> PricingResult<f64> {
        let prices = self.region_or_miss(region)?;
        prices
            .storage
            .get(&normalize_key(storage_class))
            .copied()
            .ok_or_else(|| PricingError::StorageClassNotFound {
                region: region.to_string(),
                class: storage_class.to_string(),
            })
    }
}

/// Accumulates facts into a fresh index, first write wins
#[derive(Debug, Default)]
pub struct IndexBuilder {
    regions: HashMap<String, RegionPrices>,
    duplicates: usize,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one fact. Returns false when the slot was already taken.
    pub fn insert(&mut self, fact: PricedFact) -> bool {
        let region = self.regions.entry(normalize_key(&fact.region)).or_default();
        let key = normalize_key(&fact.key);

        let inserted = match fact.kind {
            ResourceKind::Storage => match region.storage.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(fact.price);
                    true
                }
                Entry::Occupied(slot) => {
                    warn!(
                        region = %fact.region,
                        storage_class = %slot.key(),
                        sku_id = %fact.sku_id,
                        kept_price = *slot.get(),
                        skipped_price = fact.price,
                        "Skipping duplicate storage SKU"
                    );
                    false
                }
            },
            kind => {
                let rates = region.families.entry(key).or_default().rates_mut(fact.model);
                match rates.slot(kind) {
                    Some(slot) if slot.is_none() => {
                        *slot = Some(fact.price);
                        true
                    }
                    _ => {
                        debug!(
                            region = %fact.region,
                            family = %fact.key,
                            model = %fact.model,
                            kind = %fact.kind,
                            sku_id = %fact.sku_id,
                            "Compute price already set, keeping first"
                        );
                        false
                    }
                }
            }
        };

        if !inserted {
            self.duplicates += 1;
        }
        inserted
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn finish(self, mut stats: FoldStats) -> PricingIndex {
        stats.duplicates = self.duplicates;
        PricingIndex {
            regions: self.regions,
            stats,
        }
    }
}
