//! Catalog sources: the Cloud Billing API, or JSON files for offline runs.

pub mod file;
pub mod gcp;

use domain_pricing::{CatalogSource, PricingError};
use std::path::PathBuf;
use thiserror::Error;

pub use file::FileCatalog;
pub use gcp::GcpBillingCatalog;

use crate::config::CatalogConfig;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Billing API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {origin}: {source}")]
    Decode {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Pagination did not terminate after {0} pages")]
    TooManyPages(usize),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl From<CatalogError> for PricingError {
    fn from(err: CatalogError) -> Self {
        PricingError::Catalog(err.to_string())
    }
}

/// Build the configured source
pub fn from_config(config: &CatalogConfig) -> CatalogResult<Box<dyn CatalogSource>> {
    Ok(match config {
        CatalogConfig::BillingApi {
            base_url,
            api_key,
            service_ids,
        } => Box::new(
            GcpBillingCatalog::new(api_key.clone(), service_ids.clone())?.with_base_url(base_url.as_str()),
        ),
        CatalogConfig::Directory(dir) => Box::new(FileCatalog::new(dir.clone())),
    })
}
