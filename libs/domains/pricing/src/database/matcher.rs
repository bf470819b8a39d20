//! Cloud SQL price matching.
//!
//! Custom tiers are billed as independent vCPU and RAM components, so there
//! is no keyed index here. The catalog is classified once per refresh and
//! every match is a linear scan over that snapshot.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::{debug, info};

use super::tier::resolve_traits;
use crate::catalog::{FoldStats, fold_catalog};
use crate::error::{PricingError, PricingResult, SkuRejection};
use crate::grammar::{Classification, SkuGrammar};
use crate::models::{ComponentPrices, DatabaseInstance, InstanceTraits, PriceMatch, RawSku};

pub const CLOUD_SQL_SERVICE: &str = "Cloud SQL";

static VCPU_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*vcpu").expect("vcpu pattern compiles"));

const DATABASE_EXCLUSIONS: &[&str] = &[
    "commitment",
    "storage",
    "backup",
    "network",
    "ip address",
    "licensing",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkuRole {
    CpuComponent,
    RamComponent,
    Instance,
}

/// A Cloud SQL SKU reduced to what the matcher filters on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseSku {
    pub sku_id: String,
    pub description: String,
    /// Lower-cased description used by every substring test
    pub haystack: String,
    pub role: SkuRole,
    pub regions: Vec<String>,
    /// vCPU count advertised in the description, if any
    pub vcpus: Option<u32>,
    /// Dollars per hour, per vCPU-hour or per GiB-hour depending on role
    pub price: f64,
}

impl DatabaseSku {
    fn in_region(&self, region: &str) -> bool {
        self.regions.iter().any(|r| r.eq_ignore_ascii_case(region))
    }

    fn matches_traits(&self, traits: &InstanceTraits) -> bool {
        self.in_region(&traits.region)
            && self.haystack.contains(traits.engine.description_token())
            && self.haystack.contains(traits.availability.description_token())
    }
}

/// Classification vocabulary for Cloud SQL SKUs
#[derive(Debug, Clone)]
pub struct DatabaseGrammar {
    service: String,
    exclusions: Vec<String>,
    hourly_unit: String,
    gib_unit_marker: String,
}

impl Default for DatabaseGrammar {
    fn default() -> Self {
        Self::cloud_sql()
    }
}

impl DatabaseGrammar {
    pub fn cloud_sql() -> Self {
        Self {
            service: CLOUD_SQL_SERVICE.to_string(),
            exclusions: DATABASE_EXCLUSIONS.iter().map(|s| s.to_string()).collect(),
            hourly_unit: "h".to_string(),
            gib_unit_marker: "GiBy".to_string(),
        }
    }

    pub fn with_exclusions<I, S>(mut self, exclusions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusions = exclusions
            .into_iter()
            .map(|term| Into::<String>::into(term).to_lowercase())
            .collect();
        self
    }

    /// Component SKUs are priced per vCPU-hour or per GiB-hour; whole
    /// instance SKUs advertise both and are priced per hour.
    pub fn role_of(&self, usage_unit: &str, haystack: &str) -> SkuRole {
        let mentions_cpu = haystack.contains("cpu");
        let mentions_ram = haystack.contains("ram");

        if usage_unit == self.hourly_unit && mentions_cpu && !mentions_ram {
            SkuRole::CpuComponent
        } else if usage_unit.contains(&self.gib_unit_marker) && mentions_ram {
            SkuRole::RamComponent
        } else {
            SkuRole::Instance
        }
    }
}

impl SkuGrammar for DatabaseGrammar {
    type Fact = DatabaseSku;

    fn service(&self) -> &str {
        &self.service
    }

    fn classify(&self, sku: &RawSku) -> PricingResult<Classification<DatabaseSku>> {
        let Some(category) = sku.category.as_ref() else {
            return Err(PricingError::StructuralViolation {
                sku_id: sku.sku_id.clone(),
                reason: "missing category".to_string(),
            });
        };

        if category.service_display_name != self.service {
            return Ok(Classification::Rejected(SkuRejection::ForeignService(
                category.service_display_name.clone(),
            )));
        }

        let haystack = sku.description.to_lowercase();
        if let Some(term) = self.exclusions.iter().find(|t| haystack.contains(t.as_str())) {
            return Ok(Classification::Rejected(SkuRejection::Excluded(term.clone())));
        }

        let Some(price) = sku.last_tier_price().filter(|p| p.is_finite() && *p >= 0.0) else {
            return Ok(Classification::Rejected(SkuRejection::MissingPricing));
        };

        let role = self.role_of(sku.usage_unit(), &haystack);
        let vcpus = VCPU_COUNT
            .captures(&haystack)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok());

        Ok(Classification::Facts(vec![DatabaseSku {
            sku_id: sku.sku_id.clone(),
            description: sku.description.clone(),
            haystack,
            role,
            regions: sku.effective_regions().to_vec(),
            vcpus,
            price,
        }]))
    }
}

/// Classified Cloud SQL catalog snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatabaseCatalog {
    skus: Vec<DatabaseSku>,
    stats: FoldStats,
}

impl DatabaseCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn build<'a, I>(grammar: &DatabaseGrammar, skus: I) -> PricingResult<Self>
    where
        I: IntoIterator<Item = &'a RawSku>,
    {
        let mut classified = Vec::new();
        let stats = fold_catalog(grammar, skus, |sku| classified.push(sku))?;

        info!(
            service = grammar.service(),
            skus = stats.skus,
            candidates = classified.len(),
            rejected = stats.rejected(),
            "Classified database catalog"
        );

        Ok(Self {
            skus: classified,
            stats,
        })
    }

    pub fn len(&self) -> usize {
        self.skus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skus.is_empty()
    }

    pub fn stats(&self) -> &FoldStats {
        &self.stats
    }

    /// Hourly price of a database instance.
    ///
    /// Fixed shapes match a whole-instance SKU. Custom shapes, and explicit
    /// RAM shapes with no instance SKU, are priced as
    /// `cpu × cpu_rate + ram_gib × ram_rate`.
    pub fn match_instance_price(&self, instance: &DatabaseInstance) -> PricingResult<PriceMatch> {
        let traits = resolve_traits(instance)?;

        if traits.spec.is_custom {
            return self.match_custom_price(&traits);
        }

        match self.match_standard_price(&traits) {
            Ok(found) => Ok(found),
            Err(err) if traits.spec.cpu > 0 && traits.spec.ram_mb > 0 => {
                debug!(
                    tier = %traits.spec.tier,
                    region = %traits.region,
                    error = %err,
                    "No instance SKU, pricing by components"
                );
                self.match_custom_price(&traits)
            }
            Err(err) => Err(err),
        }
    }

    fn match_standard_price(&self, traits: &InstanceTraits) -> PricingResult<PriceMatch> {
        let spec = &traits.spec;
        let tier_type = spec.tier_type.to_lowercase();

        self.skus
            .iter()
            .filter(|sku| sku.role == SkuRole::Instance)
            .filter(|sku| sku.matches_traits(traits))
            .find(|sku| {
                if spec.cpu == 0 {
                    sku.haystack.contains(&tier_type)
                } else {
                    sku.vcpus == Some(spec.cpu)
                }
            })
            .map(|sku| PriceMatch {
                price_per_hour: sku.price,
                sku_ids: vec![sku.sku_id.clone()],
                description: sku.description.clone(),
                is_custom: false,
                components: None,
            })
            .ok_or_else(|| PricingError::PriceNotFound {
                tier: spec.tier.clone(),
                region: traits.region.clone(),
            })
    }

    fn match_custom_price(&self, traits: &InstanceTraits) -> PricingResult<PriceMatch> {
        let component = |role: SkuRole, name: &str| {
            self.skus
                .iter()
                .find(|sku| sku.role == role && sku.matches_traits(traits))
                .ok_or_else(|| PricingError::ComponentPriceMissing {
                    component: name.to_string(),
                    region: traits.region.clone(),
                })
        };

        let cpu = component(SkuRole::CpuComponent, "cpu")?;
        let ram = component(SkuRole::RamComponent, "ram")?;
        let spec = &traits.spec;
        let price_per_hour = spec.cpu as f64 * cpu.price + spec.ram_gib() * ram.price;

        Ok(PriceMatch {
            price_per_hour,
            sku_ids: vec![cpu.sku_id.clone(), ram.sku_id.clone()],
            description: format!(
                "{} vCPU x {} + {} GiB x {}",
                spec.cpu,
                cpu.description,
                spec.ram_gib(),
                ram.description
            ),
            is_custom: true,
            components: Some(ComponentPrices {
                cpu_unit_price: cpu.price,
                ram_unit_price: ram.price,
            }),
        })
    }
}
