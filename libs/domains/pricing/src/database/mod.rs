//! Cloud SQL pricing: tier decomposition and instance price matching.

pub mod matcher;
pub mod tier;

pub use matcher::{CLOUD_SQL_SERVICE, DatabaseCatalog, DatabaseGrammar, DatabaseSku, SkuRole};
pub use tier::{parse_tier, resolve_availability, resolve_engine, resolve_traits};
