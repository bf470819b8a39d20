//! Published pricing snapshots.
//!
//! Readers clone an `Arc` to the current snapshot and query it without
//! holding the lock. A refresh builds a complete replacement and swaps the
//! reference, so a reader sees either the old snapshot or the new one.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::database::DatabaseCatalog;
use crate::index::PricingIndex;

#[derive(Debug, Clone, Default)]
pub struct PricingSnapshot {
    pub compute: Arc<PricingIndex>,
    pub object_storage: Arc<PricingIndex>,
    pub database: Arc<DatabaseCatalog>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl PricingSnapshot {
    pub fn is_empty(&self) -> bool {
        self.compute.is_empty() && self.object_storage.is_empty() && self.database.is_empty()
    }
}

/// Shared handle to the current snapshot
#[derive(Clone, Default)]
pub struct PricingStore {
    current: Arc<RwLock<Arc<PricingSnapshot>>>,
}

impl PricingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Arc<PricingSnapshot> {
        self.current.read().await.clone()
    }

    pub async fn publish(&self, snapshot: PricingSnapshot) {
        *self.current.write().await = Arc::new(snapshot);
    }
}
