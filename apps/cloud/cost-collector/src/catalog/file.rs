//! Offline catalogs: one JSON file per catalog kind.
//!
//! Each file holds either a single `services.skus.list` page or a bare array
//! of SKUs.

use async_trait::async_trait;
use domain_pricing::{CatalogKind, CatalogSource, PricingResult, RawSku, SkuListResponse};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{CatalogError, CatalogResult};

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Page(SkuListResponse),
    Skus(Vec<RawSku>),
}

pub struct FileCatalog {
    dir: PathBuf,
}

impl FileCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, kind: CatalogKind) -> PathBuf {
        self.dir.join(format!("{kind}.json"))
    }

    pub async fn load(&self, kind: CatalogKind) -> CatalogResult<Vec<RawSku>> {
        read_catalog(&self.path_for(kind)).await
    }
}

async fn read_catalog(path: &Path) -> CatalogResult<Vec<RawSku>> {
    let bytes = tokio::fs::read(path).await.map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let file: CatalogFile = serde_json::from_slice(&bytes).map_err(|source| CatalogError::Decode {
        origin: path.display().to_string(),
        source,
    })?;

    Ok(match file {
        CatalogFile::Page(page) => page.skus,
        CatalogFile::Skus(skus) => skus,
    })
}

#[async_trait]
impl CatalogSource for FileCatalog {
    async fn list_skus(&self, kind: CatalogKind) -> PricingResult<Vec<RawSku>> {
        let skus = self.load(kind).await?;
        info!(catalog = %kind, skus = skus.len(), dir = %self.dir.display(), "Loaded catalog file");
        Ok(skus)
    }
}
