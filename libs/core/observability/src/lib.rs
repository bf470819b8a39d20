//! Metrics for the cost collector.
//!
//! # Example
//!
//! ```rust,ignore
//! use observability::{init_metrics, metrics_router, CostMetrics};
//!
//! init_metrics(Some(Duration::from_secs(2 * 3600)))?;
//! CostMetrics::set_disk_cost("data-1", "us-east1", "pd-ssd", 0.021);
//!
//! let app = metrics_router();
//! ```

pub mod cost;

pub use cost::{CostMetrics, InstanceLabels, RefreshTimer};

pub use metrics::{counter, gauge, histogram, with_local_recorder};

use axum::{Router, routing::get};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use metrics_util::MetricKindMask;
use once_cell::sync::OnceCell;
use std::time::Duration;
use tracing::info;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Prometheus builder whose gauges drop out of the scrape output once they
/// go `gauge_idle_timeout` without an update.
///
/// Cost gauges are set on every collection pass, so a resource that stops
/// being priced disappears instead of exporting its last price forever.
/// Counters and histograms never expire.
pub fn prometheus_builder(gauge_idle_timeout: Option<Duration>) -> PrometheusBuilder {
    PrometheusBuilder::new().idle_timeout(MetricKindMask::GAUGE, gauge_idle_timeout)
}

/// Install the global Prometheus recorder.
///
/// Later calls return the handle from the first successful call.
pub fn init_metrics(
    gauge_idle_timeout: Option<Duration>,
) -> Result<&'static PrometheusHandle, BuildError> {
    METRICS_HANDLE.get_or_try_init(|| {
        let handle = prometheus_builder(gauge_idle_timeout).install_recorder()?;
        info!(?gauge_idle_timeout, "Prometheus metrics recorder initialized");
        describe_metrics();
        Ok(handle)
    })
}

pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Axum handler for `/metrics`
pub async fn metrics_handler() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

/// `/metrics` and `/health` routes
pub fn metrics_router() -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
}

/// Register HELP text for every metric the collector emits
pub fn describe_metrics() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_gauge!(
        cost::INSTANCE_CPU_HOURLY,
        "Hourly USD price of one vCPU of a compute instance"
    );
    describe_gauge!(
        cost::INSTANCE_RAM_HOURLY,
        "Hourly USD price of one GiB of memory of a compute instance"
    );
    describe_gauge!(
        cost::INSTANCE_HOURLY,
        "Hourly USD cost of a compute instance"
    );
    describe_gauge!(cost::DISK_HOURLY, "Hourly USD cost of a persistent disk");
    describe_gauge!(
        cost::DATABASE_HOURLY,
        "Hourly USD cost of a database instance"
    );
    describe_gauge!(
        cost::BUCKET_GIB_HOURLY,
        "Hourly USD price of one GiB stored in a bucket"
    );
    describe_counter!(
        cost::LOOKUP_MISSES,
        "Resources skipped because no price matched"
    );
    describe_counter!(
        cost::REFRESH_TOTAL,
        "Catalog rebuilds by catalog and status"
    );
    describe_histogram!(
        cost::REFRESH_DURATION,
        metrics::Unit::Seconds,
        "Duration of a full pricing refresh"
    );
    describe_gauge!(
        cost::INDEX_ENTRIES,
        "Entries in the published pricing index by catalog"
    );
    describe_gauge!(
        cost::LAST_REFRESH,
        "Unix time of the last complete pricing refresh"
    );
    describe_gauge!(
        cost::CATALOG_SKUS,
        "SKUs seen in the last catalog fold by outcome"
    );
}
