//! Cost Collector Service
//!
//! Refreshes the pricing snapshot when it is due, prices the inventory
//! against it and publishes the results as gauges.

use chrono::{DateTime, Duration, Utc};
use domain_pricing::{
    CatalogKind, CatalogSource, ComputeDescriptor, ComputeGrammar, FoldStats, Grammars,
    PricingError, PricingSnapshot, PricingStore, RefreshOutcome, RefreshReport, RefreshScheduler,
};
use eyre::{Result, WrapErr, bail};
use observability::{CostMetrics, InstanceLabels, RefreshTimer};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::inventory::Inventory;

#[derive(Debug, Clone, Serialize)]
pub struct ResourceCost {
    pub resource_type: &'static str,
    pub name: String,
    pub region: String,
    /// `None` when the resource's size is unknown and only unit prices apply
    pub hourly_usd: Option<f64>,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedResource {
    pub resource_type: &'static str,
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CostReport {
    pub priced: Vec<ResourceCost>,
    pub skipped: Vec<SkippedResource>,
}

impl CostReport {
    pub fn total_hourly_usd(&self) -> f64 {
        self.priced.iter().filter_map(|cost| cost.hourly_usd).sum()
    }

    fn skip(&mut self, resource_type: &'static str, name: &str, err: &PricingError) {
        if err.is_lookup_miss() {
            warn!(resource_type, name, error = %err, "No price for resource, skipping");
        } else {
            error!(resource_type, name, error = %err, "Resource cannot be priced, skipping");
        }
        CostMetrics::record_lookup_miss(resource_type, err.kind());
        self.skipped.push(SkippedResource {
            resource_type,
            name: name.to_string(),
            reason: err.to_string(),
        });
    }
}

/// Result of one collection run
#[derive(Debug, Clone, Serialize)]
pub struct CollectionResult {
    /// `None` when the snapshot was still fresh
    pub refresh: Option<RefreshReport>,
    pub priced: usize,
    pub skipped: usize,
    pub total_hourly_usd: f64,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

pub struct CostCollector {
    scheduler: RefreshScheduler,
    source: Box<dyn CatalogSource>,
    inventory_path: PathBuf,
    project: Option<String>,
}

impl CostCollector {
    pub fn new(config: &Config, source: Box<dyn CatalogSource>) -> Self {
        let grammars = Grammars {
            compute: ComputeGrammar::compute_engine().with_hours_per_month(config.hours_per_month),
            object_storage: ComputeGrammar::cloud_storage()
                .with_hours_per_month(config.hours_per_month),
            ..Grammars::default()
        };
        let interval = Duration::hours(i64::from(config.refresh_interval_hours));

        Self {
            scheduler: RefreshScheduler::new(PricingStore::new(), grammars, interval),
            source,
            inventory_path: config.inventory_path.clone(),
            project: config.project.clone(),
        }
    }

    pub fn store(&self) -> &PricingStore {
        self.scheduler.store()
    }

    /// Refresh prices if due (always when `force`), without pricing anything
    pub async fn refresh(&self, force: bool) -> Option<RefreshReport> {
        let mut timer = RefreshTimer::start(if force { "forced" } else { "due" });

        let report = if force {
            Some(self.scheduler.refresh(self.source.as_ref()).await)
        } else {
            match self.scheduler.refresh_if_due(self.source.as_ref()).await {
                RefreshOutcome::Ran(report) => Some(report),
                RefreshOutcome::Skipped { next_due } => {
                    info!(%next_due, "Pricing snapshot is fresh, skipping refresh");
                    None
                }
            }
        };

        let Some(report) = report else {
            timer.discard();
            return None;
        };

        let duration_ms = timer.stop();
        let published = self.store().snapshot().await;
        record_refresh(&report, &published);
        info!(
            refreshed = report.refreshed.len(),
            failed = report.failed.len(),
            duration_ms,
            "Pricing refresh complete"
        );

        Some(report)
    }

    /// Run a collection: refresh if due, then price the inventory
    pub async fn collect(&self, force: bool) -> Result<(CollectionResult, CostReport)> {
        let start = std::time::Instant::now();
        let refresh = self.refresh(force).await;

        let snapshot = self.store().snapshot().await;
        if snapshot.is_empty() {
            let failures = refresh
                .as_ref()
                .map(|report| {
                    report
                        .failed
                        .iter()
                        .map(|(kind, reason)| format!("{kind}: {reason}"))
                        .collect::<Vec<_>>()
                        .join("; ")
                })
                .unwrap_or_default();
            bail!("No pricing data available after refresh ({failures})");
        }

        let inventory = Inventory::load(&self.inventory_path)
            .await
            .wrap_err_with(|| format!("Failed to load inventory from {}", self.inventory_path.display()))?;

        if inventory.is_empty() {
            warn!(path = %self.inventory_path.display(), "Inventory is empty");
        }
        let report = price_inventory(&snapshot, &inventory);

        let result = CollectionResult {
            refresh,
            priced: report.priced.len(),
            skipped: report.skipped.len(),
            total_hourly_usd: report.total_hourly_usd(),
            duration_ms: start.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        };

        info!(
            project = self.project.as_deref().unwrap_or("-"),
            priced = result.priced,
            skipped = result.skipped,
            total_hourly_usd = result.total_hourly_usd,
            "Collection complete"
        );

        Ok((result, report))
    }

    /// Collect on every cron tick until interrupted
    pub async fn run_scheduled(self: Arc<Self>, cron_expr: &str) -> Result<()> {
        info!(cron = cron_expr, "Starting scheduled cost collection");

        if let Err(e) = self.collect(false).await {
            error!(error = %e, "Initial collection failed");
        }

        let mut sched = JobScheduler::new().await?;
        let collector = Arc::clone(&self);

        let job = Job::new_async(cron_expr, move |_uuid, _l| {
            let collector = Arc::clone(&collector);

            Box::pin(async move {
                match collector.collect(false).await {
                    Ok((result, _)) => info!(
                        priced = result.priced,
                        skipped = result.skipped,
                        refreshed = result.refresh.is_some(),
                        "Scheduled collection complete"
                    ),
                    Err(e) => error!(error = %e, "Scheduled collection failed"),
                }
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;
        info!("Scheduler started, waiting for jobs");

        tokio::signal::ctrl_c().await?;
        info!("Shutting down scheduler");
        sched.shutdown().await?;
        Ok(())
    }
}

/// Price every inventory record against a snapshot and publish gauges.
///
/// A resource that cannot be priced is skipped; the rest are unaffected.
pub fn price_inventory(snapshot: &PricingSnapshot, inventory: &Inventory) -> CostReport {
    let mut report = CostReport::default();

    for instance in &inventory.instances {
        let priced = ComputeDescriptor::from_instance(instance).and_then(|descriptor| {
            let cost = snapshot.compute.get_compute_cost(&descriptor)?;
            Ok((descriptor, cost))
        });
        let (descriptor, cost) = match priced {
            Ok(found) => found,
            Err(e) => {
                report.skip("instance", &instance.name, &e);
                continue;
            }
        };

        let model = descriptor.pricing_model().to_string();
        let labels = InstanceLabels {
            instance: &instance.name,
            region: &descriptor.region,
            family: &descriptor.family,
            model: &model,
        };
        CostMetrics::set_instance_unit_prices(labels, cost.cpu_per_hour, cost.ram_per_hour);

        let hourly_usd = match (instance.guest_cpus, instance.memory_mb) {
            (Some(cpus), Some(memory_mb)) => {
                let total = cost.hourly_total(f64::from(cpus), memory_mb as f64 / 1024.0);
                CostMetrics::set_instance_cost(labels, total);
                Some(total)
            }
            _ => None,
        };

        report.priced.push(ResourceCost {
            resource_type: "instance",
            name: instance.name.clone(),
            region: descriptor.region.clone(),
            hourly_usd,
            detail: format!(
                "{} {}: cpu {}/h, ram {}/GiB-h",
                descriptor.family, model, cost.cpu_per_hour, cost.ram_per_hour
            ),
        });
    }

    for disk in &inventory.disks {
        let priced = disk.descriptor().and_then(|descriptor| {
            let hourly = descriptor.hourly_cost(&snapshot.compute)?;
            Ok((descriptor, hourly))
        });
        match priced {
            Ok((descriptor, hourly)) => {
                CostMetrics::set_disk_cost(&disk.name, &descriptor.region, &descriptor.class, hourly);
                report.priced.push(ResourceCost {
                    resource_type: "disk",
                    name: disk.name.clone(),
                    region: descriptor.region,
                    hourly_usd: Some(hourly),
                    detail: format!("{} x {} GiB", descriptor.class, descriptor.size_gib),
                });
            }
            Err(e) => report.skip("disk", &disk.name, &e),
        }
    }

    for database in &inventory.databases {
        match snapshot.database.match_instance_price(database) {
            Ok(found) => {
                CostMetrics::set_database_cost(
                    &database.name,
                    &database.region,
                    &database.tier,
                    found.is_custom,
                    found.price_per_hour,
                );
                report.priced.push(ResourceCost {
                    resource_type: "database",
                    name: database.name.clone(),
                    region: database.region.clone(),
                    hourly_usd: Some(found.price_per_hour),
                    detail: found.description,
                });
            }
            Err(e) => report.skip("database", &database.name, &e),
        }
    }

    for bucket in &inventory.buckets {
        let descriptor = bucket.descriptor();
        match snapshot
            .object_storage
            .get_storage_cost(&descriptor.region, &descriptor.class)
        {
            Ok(per_gib_hour) => {
                CostMetrics::set_bucket_price(&bucket.name, &descriptor.region, &descriptor.class, per_gib_hour);
                report.priced.push(ResourceCost {
                    resource_type: "bucket",
                    name: bucket.name.clone(),
                    region: descriptor.region,
                    hourly_usd: None,
                    detail: format!("{}: {per_gib_hour}/GiB-h", descriptor.class),
                });
            }
            Err(e) => report.skip("bucket", &bucket.name, &e),
        }
    }

    report
}

fn record_refresh(report: &RefreshReport, snapshot: &PricingSnapshot) {
    for kind in &report.refreshed {
        let (entries, stats) = match kind {
            CatalogKind::Compute => (snapshot.compute.stats().facts, snapshot.compute.stats()),
            CatalogKind::ObjectStorage => (
                snapshot.object_storage.stats().facts,
                snapshot.object_storage.stats(),
            ),
            CatalogKind::Database => (snapshot.database.len(), snapshot.database.stats()),
        };
        let catalog = kind.to_string();
        CostMetrics::record_catalog_refreshed(&catalog, entries);
        record_fold_stats(&catalog, stats);
    }

    for (kind, reason) in &report.failed {
        CostMetrics::record_catalog_failed(&kind.to_string(), reason);
    }

    if report.is_complete() {
        CostMetrics::set_last_refresh(report.completed_at.timestamp());
    }
}

fn record_fold_stats(catalog: &str, stats: &FoldStats) {
    for (outcome, count) in [
        ("total", stats.skus),
        ("excluded", stats.excluded),
        ("unparsable", stats.unparsable),
        ("missing_pricing", stats.missing_pricing),
        ("unknown_storage", stats.unknown_storage),
        ("foreign_service", stats.foreign_service),
        ("duplicate", stats.duplicates),
    ] {
        CostMetrics::set_catalog_skus(catalog, outcome, count);
    }
}
