//! Cost gauges and refresh metrics.

use metrics::{Label, counter, gauge, histogram};
use std::time::Instant;

pub const INSTANCE_CPU_HOURLY: &str = "cost_instance_cpu_hourly_usd";
pub const INSTANCE_RAM_HOURLY: &str = "cost_instance_ram_hourly_usd";
pub const INSTANCE_HOURLY: &str = "cost_instance_hourly_usd";
pub const DISK_HOURLY: &str = "cost_disk_hourly_usd";
pub const DATABASE_HOURLY: &str = "cost_database_hourly_usd";
pub const BUCKET_GIB_HOURLY: &str = "cost_bucket_gib_hourly_usd";
pub const LOOKUP_MISSES: &str = "cost_lookup_misses_total";
pub const REFRESH_TOTAL: &str = "pricing_refresh_total";
pub const REFRESH_DURATION: &str = "pricing_refresh_duration_seconds";
pub const INDEX_ENTRIES: &str = "pricing_index_entries";
pub const CATALOG_SKUS: &str = "pricing_catalog_skus";
pub const LAST_REFRESH: &str = "pricing_last_refresh_timestamp_seconds";

/// Labels identifying a compute instance gauge
#[derive(Debug, Clone, Copy)]
pub struct InstanceLabels<'a> {
    pub instance: &'a str,
    pub region: &'a str,
    pub family: &'a str,
    pub model: &'a str,
}

impl InstanceLabels<'_> {
    fn labels(self) -> Vec<Label> {
        vec![
            Label::new("instance", self.instance.to_string()),
            Label::new("region", self.region.to_string()),
            Label::new("family", self.family.to_string()),
            Label::new("model", self.model.to_string()),
        ]
    }
}

pub struct CostMetrics;

impl CostMetrics {
    // =========================================================================
    // Resource cost gauges
    // =========================================================================

    pub fn set_instance_unit_prices(labels: InstanceLabels<'_>, cpu_per_hour: f64, ram_per_hour: f64) {
        gauge!(INSTANCE_CPU_HOURLY, labels.labels()).set(cpu_per_hour);
        gauge!(INSTANCE_RAM_HOURLY, labels.labels()).set(ram_per_hour);
    }

    pub fn set_instance_cost(labels: InstanceLabels<'_>, per_hour: f64) {
        gauge!(INSTANCE_HOURLY, labels.labels()).set(per_hour);
    }

    pub fn set_disk_cost(disk: &str, region: &str, class: &str, per_hour: f64) {
        gauge!(
            DISK_HOURLY,
            "disk" => disk.to_string(),
            "region" => region.to_string(),
            "class" => class.to_string()
        )
        .set(per_hour);
    }

    pub fn set_database_cost(instance: &str, region: &str, tier: &str, custom: bool, per_hour: f64) {
        gauge!(
            DATABASE_HOURLY,
            "instance" => instance.to_string(),
            "region" => region.to_string(),
            "tier" => tier.to_string(),
            "custom" => custom.to_string()
        )
        .set(per_hour);
    }

    pub fn set_bucket_price(bucket: &str, location: &str, class: &str, per_gib_hour: f64) {
        gauge!(
            BUCKET_GIB_HOURLY,
            "bucket" => bucket.to_string(),
            "location" => location.to_string(),
            "class" => class.to_string()
        )
        .set(per_gib_hour);
    }

    /// A resource that could not be priced; `reason` is a short error kind
    pub fn record_lookup_miss(resource_type: &str, reason: &str) {
        counter!(
            LOOKUP_MISSES,
            "resource_type" => resource_type.to_string(),
            "reason" => reason.to_string()
        )
        .increment(1);
    }

    // =========================================================================
    // Refresh metrics
    // =========================================================================

    pub fn record_catalog_refreshed(catalog: &str, entries: usize) {
        counter!(REFRESH_TOTAL, "catalog" => catalog.to_string(), "status" => "success").increment(1);
        gauge!(INDEX_ENTRIES, "catalog" => catalog.to_string()).set(entries as f64);

        tracing::debug!(catalog, entries, "Catalog refreshed");
    }

    pub fn record_catalog_failed(catalog: &str, error: &str) {
        counter!(REFRESH_TOTAL, "catalog" => catalog.to_string(), "status" => "failure").increment(1);

        tracing::warn!(catalog, error, "Catalog refresh failed");
    }

    /// Unix time of the last refresh that rebuilt every catalog
    pub fn set_last_refresh(unix_seconds: i64) {
        gauge!(LAST_REFRESH).set(unix_seconds as f64);
    }

    pub fn set_catalog_skus(catalog: &str, outcome: &str, count: usize) {
        gauge!(
            CATALOG_SKUS,
            "catalog" => catalog.to_string(),
            "outcome" => outcome.to_string()
        )
        .set(count as f64);
    }
}

/// Records the refresh duration when stopped or dropped
pub struct RefreshTimer {
    start: Instant,
    trigger: &'static str,
    stopped: bool,
}

impl RefreshTimer {
    pub fn start(trigger: &'static str) -> Self {
        Self {
            start: Instant::now(),
            trigger,
            stopped: false,
        }
    }

    /// Returns the elapsed milliseconds; zero if already stopped
    pub fn stop(&mut self) -> u64 {
        if self.stopped {
            return 0;
        }
        self.stopped = true;

        let elapsed = self.start.elapsed();
        histogram!(REFRESH_DURATION, "trigger" => self.trigger).record(elapsed.as_secs_f64());
        elapsed.as_millis() as u64
    }
}

impl RefreshTimer {
    /// Drop without recording, for a refresh that did not run
    pub fn discard(mut self) {
        self.stopped = true;
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    fn render(record: impl FnOnce()) -> String {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, record);
        handle.render()
    }

    #[test]
    fn test_instance_gauges_carry_labels() {
        let output = render(|| {
            let labels = InstanceLabels {
                instance: "web-1",
                region: "us-central1",
                family: "n2",
                model: "ondemand",
            };
            CostMetrics::set_instance_unit_prices(labels, 0.031611, 0.004237);
            CostMetrics::set_instance_cost(labels, 0.19);
        });

        assert!(output.contains(INSTANCE_CPU_HOURLY));
        assert!(output.contains(INSTANCE_RAM_HOURLY));
        assert!(output.contains("instance=\"web-1\""));
        assert!(output.contains("0.031611"));
    }

    #[test]
    fn test_database_gauge_marks_custom_tiers() {
        let output = render(|| {
            CostMetrics::set_database_cost("billing", "us-east1", "db-custom-4-8192", true, 0.28);
        });

        assert!(output.contains(DATABASE_HOURLY));
        assert!(output.contains("custom=\"true\""));
    }

    #[test]
    fn test_refresh_counters() {
        let output = render(|| {
            CostMetrics::record_catalog_refreshed("compute", 1200);
            CostMetrics::record_catalog_failed("database", "No SKU found");
            CostMetrics::record_lookup_miss("instance", "region_not_found");
            CostMetrics::set_last_refresh(1_760_000_000);
        });

        assert!(output.contains("status=\"success\""));
        assert!(output.contains("status=\"failure\""));
        assert!(output.contains(INDEX_ENTRIES));
        assert!(output.contains(LOOKUP_MISSES));
        assert!(output.contains(LAST_REFRESH));
    }

    #[test]
    fn test_refresh_timer_stops_once() {
        let output = render(|| {
            let mut timer = RefreshTimer::start("manual");
            timer.stop();
            assert_eq!(timer.stop(), 0);
        });

        assert!(output.contains(REFRESH_DURATION));
    }
}
