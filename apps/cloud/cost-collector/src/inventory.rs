//! Running resources to price, read from a JSON export.

use domain_pricing::{Bucket, ComputeInstance, DatabaseInstance, Disk};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::catalog::CatalogError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub instances: Vec<ComputeInstance>,
    #[serde(default)]
    pub disks: Vec<Disk>,
    #[serde(default)]
    pub databases: Vec<DatabaseInstance>,
    #[serde(default)]
    pub buckets: Vec<Bucket>,
}

impl Inventory {
    pub async fn load(path: &Path) -> Result<Self, CatalogError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| CatalogError::Decode {
            origin: path.display().to_string(),
            source,
        })
    }

    pub fn len(&self) -> usize {
        self.instances.len() + self.disks.len() + self.databases.len() + self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
