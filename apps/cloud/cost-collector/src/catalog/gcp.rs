//! Cloud Billing Catalog API client.
//!
//! https://cloud.google.com/billing/docs/reference/rest/v1/services.skus/list

use async_trait::async_trait;
use domain_pricing::{CatalogKind, CatalogSource, PricingResult, RawSku, SkuListResponse};
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

use super::{CatalogError, CatalogResult};
use crate::config::ServiceIds;

pub const BILLING_API_BASE: &str = "https://cloudbilling.googleapis.com/v1";

const PAGE_SIZE: &str = "5000";
const MAX_PAGES: usize = 500;

pub struct GcpBillingCatalog {
    client: Client,
    base_url: String,
    api_key: String,
    service_ids: ServiceIds,
}

impl GcpBillingCatalog {
    pub fn new(api_key: String, service_ids: ServiceIds) -> CatalogResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            base_url: BILLING_API_BASE.to_string(),
            api_key,
            service_ids,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn service_id(&self, kind: CatalogKind) -> &str {
        match kind {
            CatalogKind::Compute => &self.service_ids.compute,
            CatalogKind::ObjectStorage => &self.service_ids.object_storage,
            CatalogKind::Database => &self.service_ids.database,
        }
    }

    pub fn skus_url(&self, kind: CatalogKind) -> String {
        format!("{}/services/{}/skus", self.base_url, self.service_id(kind))
    }

    async fn fetch_page(&self, url: &str, page_token: Option<String>) -> CatalogResult<SkuListResponse> {
        let mut query = vec![("key", self.api_key.as_str()), ("pageSize", PAGE_SIZE)];
        if let Some(token) = page_token.as_deref() {
            query.push(("pageToken", token));
        }

        let response = self.client.get(url).query(&query).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|source| CatalogError::Decode {
            origin: url.to_string(),
            source,
        })
    }
}

/// Drain a paginated listing, following `nextPageToken` until it is empty
pub async fn collect_pages<F, Fut>(mut fetch_page: F) -> CatalogResult<Vec<RawSku>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = CatalogResult<SkuListResponse>>,
{
    let mut skus = Vec::new();
    let mut page_token = None;

    for page in 1..=MAX_PAGES {
        let response = fetch_page(page_token.take()).await?;
        debug!(page, skus = response.skus.len(), "Fetched SKU page");
        skus.extend(response.skus);

        match response.next_page_token.filter(|token| !token.is_empty()) {
            Some(token) => page_token = Some(token),
            None => return Ok(skus),
        }
    }

    Err(CatalogError::TooManyPages(MAX_PAGES))
}

#[async_trait]
impl CatalogSource for GcpBillingCatalog {
    async fn list_skus(&self, kind: CatalogKind) -> PricingResult<Vec<RawSku>> {
        let url = self.skus_url(kind);
        info!(catalog = %kind, service = self.service_id(kind), "Fetching billing catalog");

        let skus = collect_pages(|token| self.fetch_page(&url, token)).await?;

        info!(catalog = %kind, skus = skus.len(), "Fetched billing catalog");
        Ok(skus)
    }
}
