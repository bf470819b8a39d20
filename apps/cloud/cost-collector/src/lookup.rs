//! One-off price queries against a freshly built snapshot.

use clap::Subcommand;
use domain_pricing::{
    ComputeCost, ComputeDescriptor, DatabaseInstance, PriceMatch, PricingResult, PricingSnapshot,
};
use serde::Serialize;

#[derive(Debug, Clone, Subcommand)]
pub enum LookupQuery {
    /// Per-vCPU and per-GiB hourly prices for a machine family
    Compute {
        #[arg(long)]
        region: String,
        /// Machine family, e.g. n2, e2, c2
        #[arg(long)]
        family: String,
        #[arg(long)]
        spot: bool,
    },

    /// Per-GiB hourly price of a storage class
    Storage {
        #[arg(long)]
        region: String,
        /// Disk type (pd-ssd) or, with --bucket, bucket class (standard)
        #[arg(long)]
        class: String,
        /// Look up object storage instead of persistent disk
        #[arg(long)]
        bucket: bool,
    },

    /// Hourly price of a database instance
    Database {
        #[arg(long)]
        region: String,
        /// e.g. db-custom-4-16384, db-n1-standard-2, db-f1-micro
        #[arg(long)]
        tier: String,
        /// e.g. POSTGRES_15, MYSQL_8_0
        #[arg(long)]
        version: String,
        #[arg(long, default_value = "ZONAL")]
        availability: String,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LookupAnswer {
    Compute(ComputeCost),
    Storage { region: String, class: String, per_gib_hour: f64 },
    Database(PriceMatch),
}

pub fn lookup(snapshot: &PricingSnapshot, query: LookupQuery) -> PricingResult<LookupAnswer> {
    match query {
        LookupQuery::Compute {
            region,
            family,
            spot,
        } => {
            let cost = snapshot
                .compute
                .get_compute_cost(&ComputeDescriptor::new(region, family, spot))?;
            Ok(LookupAnswer::Compute(cost))
        }
        LookupQuery::Storage {
            region,
            class,
            bucket,
        } => {
            let index = if bucket {
                &snapshot.object_storage
            } else {
                &snapshot.compute
            };
            let region = region.to_lowercase();
            let class = class.to_lowercase();
            let per_gib_hour = index.get_storage_cost(&region, &class)?;
            Ok(LookupAnswer::Storage {
                region,
                class,
                per_gib_hour,
            })
        }
        LookupQuery::Database {
            region,
            tier,
            version,
            availability,
        } => {
            let instance = DatabaseInstance {
                name: "lookup".to_string(),
                region,
                tier,
                database_version: version,
                availability_type: availability,
            };
            Ok(LookupAnswer::Database(
                snapshot.database.match_instance_price(&instance)?,
            ))
        }
    }
}
