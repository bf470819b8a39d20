//! Billing SKU Pricing Engine
//!
//! Turns the cloud billing catalog into per-resource USD/hour prices.
//!
//! # Architecture
//!
//! ```text
//! CatalogSource ──RawSku──▶ SkuGrammar ──facts──▶ fold_catalog
//!                                                   │
//!                 ┌─────────────────────────────────┼──────────────────┐
//!                 ▼                                 ▼                  ▼
//!        PricingIndex (compute)      PricingIndex (object storage)   DatabaseCatalog
//!                 └──────────────── PricingSnapshot ───────────────────┘
//!                                         │ published by RefreshScheduler
//!                                         ▼
//!                                   PricingStore  ◀── collectors read
//! ```
//!
//! The engine performs no network I/O; catalogs arrive through
//! [`refresh::CatalogSource`].

pub mod catalog;
pub mod compute;
pub mod database;
pub mod error;
pub mod grammar;
pub mod index;
pub mod models;
pub mod refresh;
pub mod resources;
pub mod store;

pub use catalog::{FoldStats, build_index, fold_catalog};
pub use compute::{ComputeGrammar, GrammarMatch, HOURS_IN_MONTH};
pub use database::{DatabaseCatalog, DatabaseGrammar, parse_tier, resolve_traits};
pub use error::{PricingError, PricingResult, SkuRejection};
pub use grammar::{Classification, SkuGrammar};
pub use index::{IndexBuilder, PricingIndex};
pub use models::{
    Availability, ComputeCost, ComputeDescriptor, DatabaseEngine, DatabaseInstance,
    InstanceSpec, InstanceTraits, PriceMatch, PricedFact, PricingModel, RawSku, ResourceKind,
    SkuListResponse,
};
pub use refresh::{CatalogKind, CatalogSource, Grammars, RefreshOutcome, RefreshReport, RefreshScheduler};
pub use resources::{Bucket, ComputeInstance, Disk, StorageDescriptor};
pub use store::{PricingSnapshot, PricingStore};
