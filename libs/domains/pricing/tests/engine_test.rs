//! End-to-end tests for the pricing engine
//!
//! Catalog fixtures use the JSON shape returned by the Cloud Billing
//! Catalog API, so these tests also cover decoding.

use domain_pricing::*;
use serde_json::{Value, json};

fn money(units: &str, nanos: i64) -> Value {
    json!({ "currencyCode": "USD", "units": units, "nanos": nanos })
}

fn sku(id: &str, service: &str, family: &str, description: &str, regions: &[&str], unit: &str, tiers: &[(f64, Value)]) -> RawSku {
    let tiered_rates: Vec<Value> = tiers
        .iter()
        .map(|(start, price)| json!({ "startUsageAmount": start, "unitPrice": price }))
        .collect();

    serde_json::from_value(json!({
        "name": format!("services/test/skus/{id}"),
        "skuId": id,
        "description": description,
        "category": {
            "serviceDisplayName": service,
            "resourceFamily": family,
            "resourceGroup": "",
            "usageType": "OnDemand"
        },
        "serviceRegions": regions,
        "pricingInfo": [{
            "pricingExpression": {
                "usageUnit": unit,
                "usageUnitDescription": unit,
                "tieredRates": tiered_rates
            }
        }]
    }))
    .expect("fixture decodes")
}

fn compute_catalog() -> Vec<RawSku> {
    vec![
        sku("g2-core", "Compute Engine", "Compute", "G2 Instance Core running in Belgium", &["europe-west1"], "h", &[(0.0, money("0", 24_850_000))]),
        sku("n2-core", "Compute Engine", "Compute", "N2 Instance Core running in Americas", &["us-central1", "us-east1"], "h", &[(0.0, money("0", 31_611_000))]),
        sku("n2-ram", "Compute Engine", "Compute", "N2 Instance Ram running in Americas", &["us-central1", "us-east1"], "GiBy.h", &[(0.0, money("0", 4_237_000))]),
        sku("n2-spot-core", "Compute Engine", "Compute", "Spot Preemptible N2 Instance Core running in Americas", &["us-central1"], "h", &[(0.0, money("0", 7_650_000))]),
        sku("sole", "Compute Engine", "Compute", "Sole Tenancy Instance Core running in Americas", &["us-central1"], "h", &[(0.0, money("0", 1))]),
        sku("cud", "Compute Engine", "Compute", "Commitment v1: N2 Cpu in Americas for 1 Year", &["us-central1"], "h", &[(0.0, money("0", 1))]),
        sku("m1", "Compute Engine", "Compute", "Memory-optimized Instance Core running in Americas", &["us-central1"], "h", &[(0.0, money("0", 1))]),
        sku("pd-ssd", "Compute Engine", "Storage", "SSD backed PD Capacity in Belgium", &["europe-west1"], "GiBy.mo", &[(0.0, money("0", 0)), (0.0, money("0", 187_000_000))]),
        sku("pd-ssd-dup", "Compute Engine", "Storage", "SSD backed PD Capacity in Belgium", &["europe-west1"], "GiBy.mo", &[(0.0, money("5", 0))]),
        sku("snapshot", "Compute Engine", "Storage", "Storage PD Snapshot in Belgium", &["europe-west1"], "GiBy.mo", &[(0.0, money("0", 26_000_000))]),
    ]
}

#[test]
fn test_index_round_trip_for_single_cpu_sku() {
    let price = 0.02485;
    let index = build_index(&ComputeGrammar::compute_engine(), &compute_catalog()[..1]).unwrap();

    let cost = index
        .get_compute_cost(&ComputeDescriptor::new("europe-west1", "g2", false))
        .unwrap();

    assert!((cost.cpu_per_hour - price).abs() < 1e-12);
    assert_eq!(cost.ram_per_hour, 0.0);
}

#[test]
fn test_facts_cover_exactly_the_listed_regions() {
    let grammar = ComputeGrammar::compute_engine();
    let catalog = compute_catalog();

    let facts = grammar.classify(&catalog[1]).unwrap().facts();
    let mut regions: Vec<&str> = facts.iter().map(|f| f.region.as_str()).collect();
    regions.sort();

    assert_eq!(regions, ["us-central1", "us-east1"]);
    assert!(facts.iter().all(|f| f.kind == ResourceKind::Cpu && f.model == PricingModel::OnDemand));
}

#[test]
fn test_full_catalog_build() {
    let index = build_index(&ComputeGrammar::compute_engine(), &compute_catalog()).unwrap();

    let on_demand = index
        .get_compute_cost(&ComputeDescriptor::new("us-east1", "n2", false))
        .unwrap();
    assert!((on_demand.cpu_per_hour - 0.031611).abs() < 1e-12);
    assert!((on_demand.ram_per_hour - 0.004237).abs() < 1e-12);

    let spot = index
        .get_compute_cost(&ComputeDescriptor::new("us-central1", "n2", true))
        .unwrap();
    assert!((spot.cpu_per_hour - 0.00765).abs() < 1e-12);

    // us-central1 has a spot core price but no spot RAM price
    assert_eq!(spot.ram_per_hour, 0.0);

    // us-east1 only has on-demand n2 prices
    assert_eq!(
        index.get_compute_cost(&ComputeDescriptor::new("us-east1", "n2", true)),
        Err(PricingError::PricingModelNotFound {
            region: "us-east1".to_string(),
            family: "n2".to_string(),
            model: PricingModel::Spot.to_string(),
        })
    );

    let stats = index.stats();
    assert_eq!(stats.skus, 10);
    assert_eq!(stats.excluded, 3);
    assert_eq!(stats.unknown_storage, 1);
    assert_eq!(stats.duplicates, 1);
}

#[test]
fn test_storage_price_uses_last_tier_and_first_sku() {
    let index = build_index(&ComputeGrammar::compute_engine(), &compute_catalog()).unwrap();

    let per_gib_hour = index.get_storage_cost("europe-west1", "pd-ssd").unwrap();
    assert!((per_gib_hour - 0.187 / HOURS_IN_MONTH).abs() < 1e-12);
}

#[test]
fn test_lookup_misses_are_typed() {
    let index = build_index(&ComputeGrammar::compute_engine(), &compute_catalog()).unwrap();

    assert_eq!(
        index.get_compute_cost(&ComputeDescriptor::new("asia-east1", "n2", false)),
        Err(PricingError::RegionNotFound("asia-east1".to_string()))
    );
    assert!(matches!(
        index.get_compute_cost(&ComputeDescriptor::new("us-central1", "c3", false)),
        Err(PricingError::FamilyNotFound { .. })
    ));
    assert!(matches!(
        PricingIndex::empty().get_compute_cost(&ComputeDescriptor::new("us-central1", "n2", false)),
        Err(PricingError::RegionNotFound(_))
    ));
}

#[test]
fn test_compute_instance_cost_from_inventory_record() {
    let index = build_index(&ComputeGrammar::compute_engine(), &compute_catalog()).unwrap();
    let instance: ComputeInstance = serde_json::from_value(json!({
        "name": "web-1",
        "zone": "projects/p/zones/us-central1-f",
        "machineType": "projects/p/zones/us-central1-f/machineTypes/n2-standard-4",
        "scheduling": { "provisioningModel": "STANDARD", "preemptible": false },
        "guestCpus": 4,
        "memoryMb": 16384
    }))
    .unwrap();

    let descriptor = ComputeDescriptor::from_instance(&instance).unwrap();
    let cost = index.get_compute_cost(&descriptor).unwrap();
    let hourly = cost.hourly_total(4.0, 16.0);
    assert!((hourly - (4.0 * 0.031611 + 16.0 * 0.004237)).abs() < 1e-9);
}

#[test]
fn test_disk_cost_scales_with_size() {
    let index = build_index(&ComputeGrammar::compute_engine(), &compute_catalog()).unwrap();
    let disk = Disk {
        name: "data".to_string(),
        zone: Some("europe-west1-b".to_string()),
        region: None,
        disk_type: "zones/europe-west1-b/diskTypes/pd-ssd".to_string(),
        size_gb: 100,
    };

    let hourly = disk.descriptor().unwrap().hourly_cost(&index).unwrap();
    assert!((hourly - 100.0 * 0.187 / HOURS_IN_MONTH).abs() < 1e-9);
}

#[test]
fn test_bucket_storage_via_cloud_storage_grammar() {
    let catalog = vec![
        sku("std", "Cloud Storage", "Storage", "Standard Storage Belgium", &["europe-west1"], "GiBy.mo", &[(0.0, money("0", 20_000_000))]),
        sku("ops", "Cloud Storage", "Storage", "Standard Storage Class A Operations", &["europe-west1"], "count", &[(0.0, money("0", 5_000))]),
    ];
    let index = build_index(&ComputeGrammar::cloud_storage(), &catalog).unwrap();
    let bucket = Bucket {
        name: "assets".to_string(),
        location: "EUROPE-WEST1".to_string(),
        storage_class: "STANDARD".to_string(),
    };

    let descriptor = bucket.descriptor();
    let price = index.get_storage_cost(&descriptor.region, &descriptor.class).unwrap();
    assert!((price - 0.02 / HOURS_IN_MONTH).abs() < 1e-12);
}

#[test]
fn test_database_custom_and_standard_pricing() {
    let catalog = vec![
        sku("cpu", "Cloud SQL", "ApplicationServices", "Cloud SQL for MySQL: Regional - vCPU in Americas", &["us-east1"], "h", &[(0.0, money("0", 50_000_000))]),
        sku("ram", "Cloud SQL", "ApplicationServices", "Cloud SQL for MySQL: Regional - RAM in Americas", &["us-east1"], "GiBy.h", &[(0.0, money("0", 10_000_000))]),
        sku("n1-2", "Cloud SQL", "ApplicationServices", "Cloud SQL for MySQL: Regional - 2 vCPU + 7.5GB RAM in Americas", &["us-east1"], "h", &[(0.0, money("0", 194_000_000))]),
    ];
    let snapshot = DatabaseCatalog::build(&DatabaseGrammar::cloud_sql(), &catalog).unwrap();

    let custom = snapshot
        .match_instance_price(&DatabaseInstance {
            name: "billing".to_string(),
            region: "us-east1".to_string(),
            tier: "db-custom-4-8192".to_string(),
            database_version: "MYSQL_8_0".to_string(),
            availability_type: "REGIONAL".to_string(),
        })
        .unwrap();
    assert!(custom.is_custom);
    assert!((custom.price_per_hour - 0.28).abs() < 1e-4);

    let standard = snapshot
        .match_instance_price(&DatabaseInstance {
            name: "billing-replica".to_string(),
            region: "US-EAST1".to_string(),
            tier: "db-n1-standard-2".to_string(),
            database_version: "MYSQL_8_0".to_string(),
            availability_type: "REGIONAL".to_string(),
        })
        .unwrap();
    assert_eq!(standard.sku_ids, ["n1-2"]);
    assert!((standard.price_per_hour - 0.194).abs() < 1e-9);
}

#[test]
fn test_empty_database_catalog_is_an_error() {
    let result = DatabaseCatalog::build(&DatabaseGrammar::cloud_sql(), &Vec::<RawSku>::new());
    assert_eq!(result, Err(PricingError::NoSkuFound("Cloud SQL".to_string())));
}
