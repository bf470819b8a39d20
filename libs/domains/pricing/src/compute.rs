//! Compute Engine grammar: machine-family core/RAM SKUs and persistent
//! disk / object storage capacity SKUs.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{PricingError, PricingResult, SkuRejection};
use crate::grammar::{Classification, SkuGrammar};
use crate::models::{PricedFact, PricingModel, RawSku, ResourceKind};

/// Approximate hours per month used to turn monthly storage rates hourly
pub const HOURS_IN_MONTH: f64 = 24.35 * 30.0;

pub const COMPUTE_ENGINE_SERVICE: &str = "Compute Engine";
pub const CLOUD_STORAGE_SERVICE: &str = "Cloud Storage";

/// Family key for "Compute optimized" SKUs, which carry no family token
pub const COMPUTE_OPTIMIZED_FAMILY: &str = "c2";

const STORAGE_RESOURCE_FAMILY: &str = "Storage";

/// `[Spot Preemptible ]<family>[ Predefined][ AMD|Arm][ Instance] Core|Ram running in <region>`
pub const ON_DEMAND_PATTERN: &str = r"^(?P<spot>Spot Preemptible )?(?:(?P<optimized>Compute optimized)|(?P<family>[A-Za-z0-9]{1,3})(?: Predefined)?(?: (?:AMD|Arm))?)(?: Instance)? (?P<resource>Core|Ram) running in (?P<region>[A-Za-z0-9]+(?: [A-Za-z0-9]+){0,2})$";

static ON_DEMAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ON_DEMAND_PATTERN).expect("on-demand pattern compiles"));

const COMPUTE_EXCLUSIONS: &[&str] = &[
    "Network",
    "Egress",
    "GPU",
    "Sole Tenancy",
    "Interconnect",
    "Commitment",
    "Custom",
    "Extended",
    "Micro",
    "Small",
    "Memory-optimized",
];

const PERSISTENT_DISK_CLASSES: &[(&str, &str)] = &[
    ("Storage PD Capacity", "pd-standard"),
    ("SSD backed PD Capacity", "pd-ssd"),
    ("Balanced PD Capacity", "pd-balanced"),
    ("Extreme PD Capacity", "pd-extreme"),
    ("Regional Storage PD Capacity", "regional-pd-standard"),
    ("Regional SSD backed PD Capacity", "regional-pd-ssd"),
    ("Regional Balanced PD Capacity", "regional-pd-balanced"),
    ("Hyperdisk Balanced Capacity", "hyperdisk-balanced"),
    ("Hyperdisk Extreme Capacity", "hyperdisk-extreme"),
    ("Hyperdisk Throughput Capacity", "hyperdisk-throughput"),
];

const OBJECT_STORAGE_EXCLUSIONS: &[&str] = &[
    "Operations",
    "Retrieval",
    "Early Delete",
    "Egress",
    "Network",
    "Replication",
    "Autoclass",
    "Data Transfer",
];

const OBJECT_STORAGE_CLASSES: &[(&str, &str)] = &[
    ("Standard Storage", "standard"),
    ("Regional Standard Storage", "standard"),
    ("Multi-Region Standard Storage", "standard"),
    ("Dual-Region Standard Storage", "standard"),
    ("Nearline Storage", "nearline"),
    ("Regional Nearline Storage", "nearline"),
    ("Coldline Storage", "coldline"),
    ("Regional Coldline Storage", "coldline"),
    ("Archive Storage", "archive"),
    ("Regional Archive Storage", "archive"),
    ("Multi-Regional Storage", "multi_regional"),
    ("Regional Storage", "regional"),
    ("Durable Reduced Availability Storage", "durable_reduced_availability"),
];

/// What a description matched, before prices and regions are attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarMatch {
    OnDemand {
        family: String,
        kind: ResourceKind,
        model: PricingModel,
    },
    Storage {
        class: String,
    },
    UnknownStorage,
    Unrecognized,
}

/// Classification vocabulary for compute and storage SKUs.
///
/// All tables are plain data so alternate catalogs and tests can swap them.
#[derive(Debug, Clone)]
pub struct ComputeGrammar {
    service: String,
    exclusions: Vec<String>,
    on_demand: Regex,
    storage_classes: Vec<(String, String)>,
    hours_per_month: f64,
}

impl Default for ComputeGrammar {
    fn default() -> Self {
        Self::compute_engine()
    }
}

impl ComputeGrammar {
    /// Machine families plus persistent disk capacity
    pub fn compute_engine() -> Self {
        Self {
            service: COMPUTE_ENGINE_SERVICE.to_string(),
            exclusions: to_owned_list(COMPUTE_EXCLUSIONS),
            on_demand: ON_DEMAND_RE.clone(),
            storage_classes: to_owned_pairs(PERSISTENT_DISK_CLASSES),
            hours_per_month: HOURS_IN_MONTH,
        }
    }

    /// Bucket storage capacity by storage class
    pub fn cloud_storage() -> Self {
        Self {
            service: CLOUD_STORAGE_SERVICE.to_string(),
            exclusions: to_owned_list(OBJECT_STORAGE_EXCLUSIONS),
            on_demand: ON_DEMAND_RE.clone(),
            storage_classes: to_owned_pairs(OBJECT_STORAGE_CLASSES),
            hours_per_month: HOURS_IN_MONTH,
        }
    }

    pub fn with_exclusions<I, S>(mut self, exclusions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusions = exclusions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_storage_classes<I, P, C>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<String>,
    {
        self.storage_classes = classes
            .into_iter()
            .map(|(prefix, class)| {
                let class: String = class.into();
                (prefix.into(), normalize_key(&class))
            })
            .collect();
        self
    }

    pub fn with_hours_per_month(mut self, hours: f64) -> Self {
        self.hours_per_month = hours;
        self
    }

    /// Replace the on-demand pattern. It must define the `resource` and
    /// `family` or `optimized` groups; `spot` is optional.
    pub fn with_on_demand_pattern(mut self, pattern: &str) -> PricingResult<Self> {
        let regex = Regex::new(pattern).map_err(|e| PricingError::InvalidGrammar(e.to_string()))?;
        let names: Vec<&str> = regex.capture_names().flatten().collect();
        if !names.contains(&"resource") || !(names.contains(&"family") || names.contains(&"optimized")) {
            return Err(PricingError::InvalidGrammar(
                "pattern needs 'resource' and 'family' or 'optimized' groups".to_string(),
            ));
        }
        self.on_demand = regex;
        Ok(self)
    }

    pub fn hours_per_month(&self) -> f64 {
        self.hours_per_month
    }

    /// First exclusion term contained in the description
    pub fn exclusion_for(&self, description: &str) -> Option<&str> {
        self.exclusions
            .iter()
            .find(|term| description.contains(term.as_str()))
            .map(String::as_str)
    }

    /// Storage class whose description prefix is the longest match
    pub fn storage_class_for(&self, description: &str) -> Option<&str> {
        self.storage_classes
            .iter()
            .filter(|(prefix, _)| description.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, class)| class.as_str())
    }

    /// Run the description through both grammars
    pub fn match_sku(&self, sku: &RawSku) -> GrammarMatch {
        if let Some(caps) = self.on_demand.captures(&sku.description) {
            let family = if caps.name("optimized").is_some() {
                Some(COMPUTE_OPTIMIZED_FAMILY.to_string())
            } else {
                caps.name("family").map(|m| normalize_key(m.as_str()))
            };
            let kind = match caps.name("resource").map(|m| m.as_str()) {
                Some("Core") => Some(ResourceKind::Cpu),
                Some("Ram") => Some(ResourceKind::Ram),
                _ => None,
            };
            if let (Some(family), Some(kind)) = (family, kind) {
                let model = if caps.name("spot").is_some() {
                    PricingModel::Spot
                } else {
                    PricingModel::OnDemand
                };
                return GrammarMatch::OnDemand {
                    family,
                    kind,
                    model,
                };
            }
        }

        if sku.resource_family() == Some(STORAGE_RESOURCE_FAMILY) {
            return match self.storage_class_for(&sku.description) {
                Some(class) => GrammarMatch::Storage {
                    class: class.to_string(),
                },
                None => GrammarMatch::UnknownStorage,
            };
        }

        GrammarMatch::Unrecognized
    }
}

impl SkuGrammar for ComputeGrammar {
    type Fact = PricedFact;

    fn service(&self) -> &str {
        &self.service
    }

    fn classify(&self, sku: &RawSku) -> PricingResult<Classification<PricedFact>> {
        if sku.category.is_none() {
            return Err(PricingError::StructuralViolation {
                sku_id: sku.sku_id.clone(),
                reason: "missing category".to_string(),
            });
        }

        if let Some(term) = self.exclusion_for(&sku.description) {
            return Ok(Classification::Rejected(SkuRejection::Excluded(
                term.to_string(),
            )));
        }

        let (model, kind, key, price) = match self.match_sku(sku) {
            GrammarMatch::OnDemand {
                family,
                kind,
                model,
            } => match sku.first_tier_price() {
                Some(price) => (model, kind, family, price),
                None => return Ok(Classification::Rejected(SkuRejection::MissingPricing)),
            },
            GrammarMatch::Storage { class } => match sku.last_tier_price() {
                Some(monthly) => (
                    PricingModel::OnDemand,
                    ResourceKind::Storage,
                    class,
                    monthly / self.hours_per_month,
                ),
                None => return Ok(Classification::Rejected(SkuRejection::MissingPricing)),
            },
            GrammarMatch::UnknownStorage => {
                return Ok(Classification::Rejected(SkuRejection::UnknownStorageClass));
            }
            GrammarMatch::Unrecognized => {
                return Ok(Classification::Rejected(SkuRejection::Unparsable));
            }
        };

        if price < 0.0 || !price.is_finite() {
            return Ok(Classification::Rejected(SkuRejection::MissingPricing));
        }

        let facts = sku
            .service_regions
            .iter()
            .map(|region| PricedFact {
                region: normalize_key(region),
                model,
                kind,
                key: key.clone(),
                price,
                sku_id: sku.sku_id.clone(),
            })
            .collect();

        Ok(Classification::Facts(facts))
    }
}

/// Lower-case, trimmed index key
pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn to_owned_pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(prefix, class)| (prefix.to_string(), class.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatalogMoney, PricingExpression, PricingInfo, SkuCategory, TieredRate};

    fn sku(description: &str, family: &str, regions: &[&str], nanos: &[i64]) -> RawSku {
        RawSku {
            sku_id: format!("sku-{}", description.len()),
            description: description.to_string(),
            category: Some(SkuCategory {
                service_display_name: "Compute Engine".to_string(),
                resource_family: family.to_string(),
                ..Default::default()
            }),
            service_regions: regions.iter().map(|r| r.to_string()).collect(),
            pricing_info: vec![PricingInfo {
                pricing_expression: Some(PricingExpression {
                    usage_unit: "h".to_string(),
                    tiered_rates: nanos
                        .iter()
                        .map(|n| TieredRate {
                            start_usage_amount: 0.0,
                            unit_price: Some(CatalogMoney {
                                currency_code: "USD".to_string(),
                                units: Some("0".to_string()),
                                nanos: Some(*n),
                            }),
                        })
                        .collect(),
                    ..Default::default()
                }),
            }],
            ..Default::default()
        }
    }

    fn on_demand(description: &str) -> GrammarMatch {
        ComputeGrammar::compute_engine().match_sku(&sku(description, "Compute", &[], &[1]))
    }

    #[test]
    fn test_matches_plain_family_core() {
        assert_eq!(
            on_demand("N2 Instance Core running in Belgium"),
            GrammarMatch::OnDemand {
                family: "n2".to_string(),
                kind: ResourceKind::Cpu,
                model: PricingModel::OnDemand,
            }
        );
    }

    #[test]
    fn test_matches_spot_ram_with_chipset() {
        assert_eq!(
            on_demand("Spot Preemptible N2D AMD Instance Ram running in Americas"),
            GrammarMatch::OnDemand {
                family: "n2d".to_string(),
                kind: ResourceKind::Ram,
                model: PricingModel::Spot,
            }
        );
    }

    #[test]
    fn test_matches_predefined_and_multi_word_region() {
        assert_eq!(
            on_demand("N1 Predefined Instance Core running in Salt Lake City"),
            GrammarMatch::OnDemand {
                family: "n1".to_string(),
                kind: ResourceKind::Cpu,
                model: PricingModel::OnDemand,
            }
        );
    }

    #[test]
    fn test_compute_optimized_maps_to_c2() {
        assert_eq!(
            on_demand("Spot Preemptible Compute optimized Core running in Sao Paulo"),
            GrammarMatch::OnDemand {
                family: "c2".to_string(),
                kind: ResourceKind::Cpu,
                model: PricingModel::Spot,
            }
        );
    }

    #[test]
    fn test_unrelated_description_is_unrecognized() {
        assert_eq!(
            on_demand("Licensing Fee for Debian on VM with 4 VCPU"),
            GrammarMatch::Unrecognized
        );
        assert_eq!(
            on_demand("N2 Instance Core running in a region with far too many words"),
            GrammarMatch::Unrecognized
        );
    }

    #[test]
    fn test_classify_emits_one_fact_per_listed_region() {
        let grammar = ComputeGrammar::compute_engine();
        let sku = sku(
            "E2 Instance Ram running in Americas",
            "Compute",
            &["us-central1", "US-East1"],
            &[4_237_000],
        );

        let facts = grammar.classify(&sku).unwrap().facts();

        assert_eq!(facts.len(), 2);
        let regions: Vec<&str> = facts.iter().map(|f| f.region.as_str()).collect();
        assert_eq!(regions, ["us-central1", "us-east1"]);
        for fact in &facts {
            assert_eq!(fact.kind, ResourceKind::Ram);
            assert_eq!(fact.model, PricingModel::OnDemand);
            assert_eq!(fact.key, "e2");
            assert!((fact.price - 0.004237).abs() < 1e-12);
        }
    }

    #[test]
    fn test_classify_is_idempotent() {
        let grammar = ComputeGrammar::compute_engine();
        let sku = sku(
            "Spot Preemptible C3 Instance Core running in Frankfurt",
            "Compute",
            &["europe-west3"],
            &[12_000_000],
        );
        assert_eq!(grammar.classify(&sku).unwrap(), grammar.classify(&sku).unwrap());
    }

    #[test]
    fn test_exclusion_vocabulary_always_wins() {
        let grammar = ComputeGrammar::compute_engine();
        for description in [
            "Sole Tenancy Instance Core running in Americas",
            "Commitment v1: N2 Cpu in Americas for 1 Year",
            "Memory-optimized Instance Core running in Americas",
            "Nvidia Tesla T4 GPU running in Americas",
            "Network Internet Egress from Americas to Americas",
            "Custom Instance Core running in Americas",
        ] {
            let classification = grammar
                .classify(&sku(description, "Compute", &["us-central1"], &[1_000]))
                .unwrap();
            assert!(
                matches!(
                    classification,
                    Classification::Rejected(SkuRejection::Excluded(_))
                ),
                "{description} should be excluded"
            );
        }
    }

    #[test]
    fn test_storage_uses_last_tier_and_hourly_rate() {
        let grammar = ComputeGrammar::compute_engine();
        let sku = sku(
            "SSD backed PD Capacity in Belgium",
            "Storage",
            &["europe-west1"],
            &[0, 187_000_000],
        );

        let facts = grammar.classify(&sku).unwrap().facts();

        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].kind, ResourceKind::Storage);
        assert_eq!(facts[0].key, "pd-ssd");
        assert!((facts[0].price - 0.187 / HOURS_IN_MONTH).abs() < 1e-12);
    }

    #[test]
    fn test_storage_class_prefers_longest_prefix() {
        let grammar = ComputeGrammar::compute_engine()
            .with_storage_classes([("Storage PD", "generic"), ("Storage PD Capacity", "pd-standard")]);
        assert_eq!(
            grammar.storage_class_for("Storage PD Capacity in Iowa"),
            Some("pd-standard")
        );
    }

    #[test]
    fn test_unknown_storage_class_is_soft_rejected() {
        let grammar = ComputeGrammar::compute_engine();
        let sku = sku("Storage PD Snapshot in Belgium", "Storage", &["europe-west1"], &[26_000_000]);
        assert_eq!(
            grammar.classify(&sku).unwrap(),
            Classification::Rejected(SkuRejection::UnknownStorageClass)
        );
    }

    #[test]
    fn test_missing_tiers_is_malformed_pricing() {
        let grammar = ComputeGrammar::compute_engine();
        let sku = sku("N2 Instance Core running in Belgium", "Compute", &["europe-west1"], &[]);
        assert_eq!(
            grammar.classify(&sku).unwrap(),
            Classification::Rejected(SkuRejection::MissingPricing)
        );
    }

    #[test]
    fn test_missing_category_is_structural() {
        let grammar = ComputeGrammar::compute_engine();
        let mut sku = sku("N2 Instance Core running in Belgium", "Compute", &["europe-west1"], &[1]);
        sku.category = None;
        assert!(matches!(
            grammar.classify(&sku),
            Err(PricingError::StructuralViolation { .. })
        ));
    }

    #[test]
    fn test_alternate_vocabulary_is_injectable() {
        let grammar = ComputeGrammar::compute_engine().with_exclusions(["Belgium"]);
        let sku = sku("N2 Instance Core running in Belgium", "Compute", &["europe-west1"], &[1]);
        assert_eq!(
            grammar.classify(&sku).unwrap(),
            Classification::Rejected(SkuRejection::Excluded("Belgium".to_string()))
        );
    }

    #[test]
    fn test_on_demand_pattern_requires_named_groups() {
        let result = ComputeGrammar::compute_engine().with_on_demand_pattern(r"^(?P<spot>x)$");
        assert!(matches!(result, Err(PricingError::InvalidGrammar(_))));

        let grammar = ComputeGrammar::compute_engine()
            .with_on_demand_pattern(r"^(?P<family>\w+) (?P<resource>Core|Ram)$")
            .unwrap();
        assert_eq!(
            grammar.match_sku(&sku("T2A Core", "Compute", &[], &[1])),
            GrammarMatch::OnDemand {
                family: "t2a".to_string(),
                kind: ResourceKind::Cpu,
                model: PricingModel::OnDemand,
            }
        );
    }

    #[test]
    fn test_cloud_storage_preset_classifies_bucket_classes() {
        let grammar = ComputeGrammar::cloud_storage();
        let mut sku = sku("Nearline Storage Belgium", "Storage", &["europe-west1"], &[10_000_000]);
        sku.category.as_mut().unwrap().service_display_name = "Cloud Storage".to_string();

        let facts = grammar.classify(&sku).unwrap().facts();
        assert_eq!(facts[0].key, "nearline");

        let ops = self::sku(
            "Nearline Storage Class A Operations",
            "Storage",
            &["europe-west1"],
            &[10_000],
        );
        assert!(matches!(
            grammar.classify(&ops).unwrap(),
            Classification::Rejected(SkuRejection::Excluded(_))
        ));
    }
}
