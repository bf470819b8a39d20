use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// ============================================================================
// Catalog records (Cloud Billing Catalog API shape)
// ============================================================================

/// One page of the Cloud Billing `services.skus.list` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkuListResponse {
    #[serde(default)]
    pub skus: Vec<RawSku>,
    #[serde(rename = "nextPageToken", default)]
    pub next_page_token: Option<String>,
}

/// A priced catalog line item, as decoded from the billing catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSku {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "skuId")]
    pub sku_id: String,
    #[serde(default)]
    pub description: String,
    pub category: Option<SkuCategory>,
    #[serde(rename = "serviceRegions", default)]
    pub service_regions: Vec<String>,
    #[serde(rename = "pricingInfo", default)]
    pub pricing_info: Vec<PricingInfo>,
    #[serde(rename = "geoTaxonomy", default)]
    pub geo_taxonomy: Option<GeoTaxonomy>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkuCategory {
    #[serde(rename = "serviceDisplayName", default)]
    pub service_display_name: String,
    #[serde(rename = "resourceFamily", default)]
    pub resource_family: String,
    #[serde(rename = "resourceGroup", default)]
    pub resource_group: String,
    #[serde(rename = "usageType", default)]
    pub usage_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingInfo {
    #[serde(rename = "pricingExpression")]
    pub pricing_expression: Option<PricingExpression>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingExpression {
    #[serde(rename = "usageUnit", default)]
    pub usage_unit: String,
    #[serde(rename = "usageUnitDescription", default)]
    pub usage_unit_description: String,
    #[serde(rename = "tieredRates", default)]
    pub tiered_rates: Vec<TieredRate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TieredRate {
    #[serde(rename = "startUsageAmount", default)]
    pub start_usage_amount: f64,
    #[serde(rename = "unitPrice")]
    pub unit_price: Option<CatalogMoney>,
}

/// Catalog money: whole units as a decimal string plus nano-fraction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogMoney {
    #[serde(rename = "currencyCode", default)]
    pub currency_code: String,
    pub units: Option<String>,
    pub nanos: Option<i64>,
}

impl CatalogMoney {
    /// Dollar amount, or `None` when `units` is not a valid integer.
    pub fn to_dollars(&self) -> Option<f64> {
        let units = match self.units.as_deref().map(str::trim) {
            None | Some("") => 0,
            Some(units) => units.parse::<i64>().ok()?,
        };
        let nanos = self.nanos.unwrap_or(0);
        Some(units as f64 + nanos as f64 * 1e-9)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoTaxonomy {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub regions: Vec<String>,
}

impl RawSku {
    pub fn resource_family(&self) -> Option<&str> {
        self.category.as_ref().map(|c| c.resource_family.as_str())
    }

    pub fn pricing_expression(&self) -> Option<&PricingExpression> {
        self.pricing_info
            .first()
            .and_then(|info| info.pricing_expression.as_ref())
    }

    pub fn usage_unit(&self) -> &str {
        self.pricing_expression()
            .map(|expr| expr.usage_unit.as_str())
            .unwrap_or_default()
    }

    /// Price of the first tier, in dollars per usage unit
    pub fn first_tier_price(&self) -> Option<f64> {
        self.pricing_expression()?
            .tiered_rates
            .first()?
            .unit_price
            .as_ref()?
            .to_dollars()
    }

    /// Price of the last tier. Catalogs list a free tier before the
    /// steady-state rate, so this is the authoritative price for tiered SKUs.
    pub fn last_tier_price(&self) -> Option<f64> {
        self.pricing_expression()?
            .tiered_rates
            .last()?
            .unit_price
            .as_ref()?
            .to_dollars()
    }

    /// Service regions, falling back to the geo-taxonomy regions when the
    /// SKU lists none.
    pub fn effective_regions(&self) -> &[String] {
        if !self.service_regions.is_empty() {
            return &self.service_regions;
        }
        self.geo_taxonomy
            .as_ref()
            .map(|geo| geo.regions.as_slice())
            .unwrap_or_default()
    }
}

// ============================================================================
// Priced facts
// ============================================================================

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PricingModel {
    #[default]
    #[strum(to_string = "ondemand", serialize = "on-demand")]
    OnDemand,
    #[strum(to_string = "spot", serialize = "preemptible")]
    Spot,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResourceKind {
    Cpu,
    Ram,
    Storage,
}

/// A canonical price extracted from one SKU for one region
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedFact {
    pub region: String,
    pub model: PricingModel,
    pub kind: ResourceKind,
    /// Machine family ("n2") or storage class ("pd-ssd"), lower-cased
    pub key: String,
    /// Dollars per unit-hour
    pub price: f64,
    pub sku_id: String,
}

// ============================================================================
// Resource descriptors
// ============================================================================

/// What the compute index is queried with
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComputeDescriptor {
    pub region: String,
    pub family: String,
    pub spot: bool,
}

impl ComputeDescriptor {
    pub fn new(region: impl Into<String>, family: impl Into<String>, spot: bool) -> Self {
        Self {
            region: region.into(),
            family: family.into(),
            spot,
        }
    }

    pub fn pricing_model(&self) -> PricingModel {
        if self.spot {
            PricingModel::Spot
        } else {
            PricingModel::OnDemand
        }
    }
}

/// Per-hour unit prices for one compute family
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ComputeCost {
    pub cpu_per_hour: f64,
    pub ram_per_hour: f64,
}

impl ComputeCost {
    /// Hourly cost of a machine with the given shape
    pub fn hourly_total(&self, vcpus: f64, memory_gib: f64) -> f64 {
        self.cpu_per_hour * vcpus + self.ram_per_hour * memory_gib
    }
}

// ============================================================================
// Database instances
// ============================================================================

/// Cloud SQL instance as listed by the inventory source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseInstance {
    pub name: String,
    pub region: String,
    pub tier: String,
    #[serde(rename = "databaseVersion")]
    pub database_version: String,
    #[serde(rename = "availabilityType")]
    pub availability_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum DatabaseEngine {
    #[strum(serialize = "mysql")]
    MySql,
    Postgres,
}

impl DatabaseEngine {
    /// Token expected in a lower-cased SKU description
    pub fn description_token(&self) -> &'static str {
        match self {
            DatabaseEngine::MySql => "mysql",
            DatabaseEngine::Postgres => "postgres",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Availability {
    Zonal,
    Regional,
}

impl Availability {
    pub fn description_token(&self) -> &'static str {
        match self {
            Availability::Zonal => "zonal",
            Availability::Regional => "regional",
        }
    }
}

/// Decomposed database tier.
///
/// `cpu == 0` means the shape is matched by tier name; `ram_mb == 0` means
/// standard pricing rather than linear component pricing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstanceSpec {
    pub cpu: u32,
    pub ram_mb: u64,
    pub tier: String,
    pub tier_type: String,
    pub is_custom: bool,
}

impl InstanceSpec {
    pub fn ram_gib(&self) -> f64 {
        self.ram_mb as f64 / 1024.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceTraits {
    pub region: String,
    pub engine: DatabaseEngine,
    pub availability: Availability,
    pub spec: InstanceSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComponentPrices {
    /// Dollars per vCPU-hour
    pub cpu_unit_price: f64,
    /// Dollars per GiB-hour
    pub ram_unit_price: f64,
}

/// Resolved price for one database instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceMatch {
    pub price_per_hour: f64,
    pub sku_ids: Vec<String>,
    pub description: String,
    pub is_custom: bool,
    pub components: Option<ComponentPrices>,
}
