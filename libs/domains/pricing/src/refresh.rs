//! Time-gated rebuilds of the published pricing snapshot.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use strum::{Display, EnumString};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::catalog::build_index;
use crate::compute::ComputeGrammar;
use crate::database::{DatabaseCatalog, DatabaseGrammar};
use crate::error::PricingResult;
use crate::models::RawSku;
use crate::store::{PricingSnapshot, PricingStore};

/// Billing service catalogs the engine consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    Compute,
    ObjectStorage,
    Database,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 3] = [
        CatalogKind::Compute,
        CatalogKind::ObjectStorage,
        CatalogKind::Database,
    ];
}

/// Supplies already-decoded SKUs for one billing service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn list_skus(&self, kind: CatalogKind) -> PricingResult<Vec<RawSku>>;
}

/// One grammar per catalog kind
#[derive(Debug, Clone)]
pub struct Grammars {
    pub compute: ComputeGrammar,
    pub object_storage: ComputeGrammar,
    pub database: DatabaseGrammar,
}

impl Default for Grammars {
    fn default() -> Self {
        Self {
            compute: ComputeGrammar::compute_engine(),
            object_storage: ComputeGrammar::cloud_storage(),
            database: DatabaseGrammar::cloud_sql(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub refreshed: Vec<CatalogKind>,
    pub failed: Vec<(CatalogKind, String)>,
    pub completed_at: DateTime<Utc>,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    Skipped { next_due: DateTime<Utc> },
    Ran(RefreshReport),
}

/// Rebuilds the snapshot when the refresh interval has elapsed.
///
/// Only one refresh runs at a time. A catalog that fails to rebuild keeps
/// its previous index in the new snapshot, and the interval is not reset so
/// the next trigger retries.
pub struct RefreshScheduler {
    store: PricingStore,
    grammars: Grammars,
    kinds: Vec<CatalogKind>,
    interval: Duration,
    last_success: Mutex<Option<DateTime<Utc>>>,
}

impl RefreshScheduler {
    pub fn new(store: PricingStore, grammars: Grammars, interval: Duration) -> Self {
        Self {
            store,
            grammars,
            kinds: CatalogKind::ALL.to_vec(),
            interval,
            last_success: Mutex::new(None),
        }
    }

    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = CatalogKind>) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }

    pub fn store(&self) -> &PricingStore {
        &self.store
    }

    pub async fn last_success(&self) -> Option<DateTime<Utc>> {
        *self.last_success.lock().await
    }

    fn next_due(&self, last_success: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
        last_success.map(|at| at + self.interval)
    }

    pub async fn refresh_if_due(&self, source: &dyn CatalogSource) -> RefreshOutcome {
        self.refresh_if_due_at(source, Utc::now()).await
    }

    pub async fn refresh_if_due_at(
        &self,
        source: &dyn CatalogSource,
        now: DateTime<Utc>,
    ) -> RefreshOutcome {
        let mut last_success = self.last_success.lock().await;
        if let Some(next_due) = self.next_due(*last_success).filter(|due| *due > now) {
            return RefreshOutcome::Skipped { next_due };
        }
        let report = self.rebuild(source, now).await;
        if report.is_complete() {
            *last_success = Some(now);
        }
        RefreshOutcome::Ran(report)
    }

    /// Refresh regardless of the interval
    pub async fn refresh(&self, source: &dyn CatalogSource) -> RefreshReport {
        let mut last_success = self.last_success.lock().await;
        let now = Utc::now();
        let report = self.rebuild(source, now).await;
        if report.is_complete() {
            *last_success = Some(now);
        }
        report
    }

    async fn rebuild(&self, source: &dyn CatalogSource, now: DateTime<Utc>) -> RefreshReport {
        let previous = self.store.snapshot().await;
        let mut next = PricingSnapshot::clone(&previous);
        let mut refreshed = Vec::new();
        let mut failed = Vec::new();

        for kind in &self.kinds {
            match self.rebuild_one(source, *kind, &mut next).await {
                Ok(()) => refreshed.push(*kind),
                Err(e) => {
                    error!(catalog = %kind, error = %e, "Catalog rebuild failed, keeping previous prices");
                    failed.push((*kind, e.to_string()));
                }
            }
        }

        if !refreshed.is_empty() {
            next.refreshed_at = Some(now);
            self.store.publish(next).await;
        }

        info!(
            refreshed = refreshed.len(),
            failed = failed.len(),
            "Pricing refresh finished"
        );

        RefreshReport {
            refreshed,
            failed,
            completed_at: now,
        }
    }

    async fn rebuild_one(
        &self,
        source: &dyn CatalogSource,
        kind: CatalogKind,
        next: &mut PricingSnapshot,
    ) -> PricingResult<()> {
        let skus = source.list_skus(kind).await?;
        match kind {
            CatalogKind::Compute => {
                next.compute = Arc::new(build_index(&self.grammars.compute, &skus)?);
            }
            CatalogKind::ObjectStorage => {
                next.object_storage = Arc::new(build_index(&self.grammars.object_storage, &skus)?);
            }
            CatalogKind::Database => {
                next.database = Arc::new(DatabaseCatalog::build(&self.grammars.database, &skus)?);
            }
        }
        Ok(())
    }
}
