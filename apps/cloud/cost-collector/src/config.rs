//! Configuration for the cost collector

use core_config::listen::ListenConfig;
use core_config::{ConfigError, Environment, FromEnv, env_optional, env_or_default, env_parse};
use domain_pricing::HOURS_IN_MONTH;
use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::gcp::BILLING_API_BASE;

/// Twice the default hourly collection schedule
pub const DEFAULT_METRICS_IDLE_SECS: u64 = 2 * 3600;

/// Cloud Billing service ids
pub const COMPUTE_ENGINE_SERVICE_ID: &str = "6F81-5844-456A";
pub const CLOUD_SQL_SERVICE_ID: &str = "9662-B51E-5089";
pub const CLOUD_STORAGE_SERVICE_ID: &str = "95FF-2EF5-5EA1";

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    /// Project label attached to log lines
    pub project: Option<String>,
    pub catalog: CatalogConfig,
    pub inventory_path: PathBuf,
    pub refresh_interval_hours: u32,
    pub hours_per_month: f64,
    pub metrics: Option<ListenConfig>,
    /// Cost gauges not refreshed within this window drop out of `/metrics`.
    /// Must exceed the collection interval; `None` keeps them forever.
    pub metrics_idle_timeout: Option<Duration>,
}

/// Where SKU catalogs come from
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogConfig {
    BillingApi {
        base_url: String,
        api_key: String,
        service_ids: ServiceIds,
    },
    /// `compute.json`, `object_storage.json` and `database.json` in a directory
    Directory(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIds {
    pub compute: String,
    pub object_storage: String,
    pub database: String,
}

impl Default for ServiceIds {
    fn default() -> Self {
        Self {
            compute: COMPUTE_ENGINE_SERVICE_ID.to_string(),
            object_storage: CLOUD_STORAGE_SERVICE_ID.to_string(),
            database: CLOUD_SQL_SERVICE_ID.to_string(),
        }
    }
}

impl FromEnv for CatalogConfig {
    /// `COST_CATALOG_DIR` wins over the billing API
    fn from_env() -> Result<Self, ConfigError> {
        if let Some(dir) = env_optional("COST_CATALOG_DIR") {
            return Ok(CatalogConfig::Directory(PathBuf::from(dir)));
        }

        let api_key = env_optional("GCP_BILLING_API_KEY").ok_or_else(|| ConfigError::InvalidValue {
            key: "GCP_BILLING_API_KEY".to_string(),
            details: "required unless COST_CATALOG_DIR is set".to_string(),
        })?;

        Ok(CatalogConfig::BillingApi {
            base_url: env_or_default("GCP_BILLING_API_BASE", BILLING_API_BASE),
            api_key,
            service_ids: ServiceIds {
                compute: env_or_default("GCP_COMPUTE_SERVICE_ID", COMPUTE_ENGINE_SERVICE_ID),
                object_storage: env_or_default("GCP_STORAGE_SERVICE_ID", CLOUD_STORAGE_SERVICE_ID),
                database: env_or_default("GCP_CLOUDSQL_SERVICE_ID", CLOUD_SQL_SERVICE_ID),
            },
        })
    }
}

impl FromEnv for Config {
    fn from_env() -> Result<Self, ConfigError> {
        let refresh_interval_hours = env_parse("COST_REFRESH_INTERVAL_HOURS", 24u32)?;
        if refresh_interval_hours == 0 {
            return Err(ConfigError::InvalidValue {
                key: "COST_REFRESH_INTERVAL_HOURS".to_string(),
                details: "must be at least 1".to_string(),
            });
        }

        let hours_per_month = env_parse("COST_HOURS_PER_MONTH", HOURS_IN_MONTH)?;
        if !(hours_per_month.is_finite() && hours_per_month > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "COST_HOURS_PER_MONTH".to_string(),
                details: format!("must be positive, got {hours_per_month}"),
            });
        }

        let idle_secs = env_parse("COST_METRICS_IDLE_SECS", DEFAULT_METRICS_IDLE_SECS)?;

        Ok(Config {
            environment: Environment::from_env(),
            project: env_optional("COST_COLLECTOR_PROJECT"),
            catalog: CatalogConfig::from_env()?,
            inventory_path: PathBuf::from(env_or_default("COST_INVENTORY_PATH", "inventory.json")),
            refresh_interval_hours,
            hours_per_month,
            metrics: ListenConfig::from_env_key("COST_METRICS_ADDR")?,
            metrics_idle_timeout: (idle_secs > 0).then(|| Duration::from_secs(idle_secs)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 12] = [
        "COST_CATALOG_DIR",
        "GCP_BILLING_API_BASE",
        "GCP_BILLING_API_KEY",
        "GCP_COMPUTE_SERVICE_ID",
        "GCP_STORAGE_SERVICE_ID",
        "GCP_CLOUDSQL_SERVICE_ID",
        "COST_INVENTORY_PATH",
        "COST_REFRESH_INTERVAL_HOURS",
        "COST_HOURS_PER_MONTH",
        "COST_METRICS_ADDR",
        "COST_METRICS_IDLE_SECS",
        "COST_COLLECTOR_PROJECT",
    ];

    fn with_env(set: &[(&str, &str)], check: impl FnOnce()) {
        let vars: Vec<(&str, Option<&str>)> = VARS
            .iter()
            .map(|key| (*key, set.iter().find(|(k, _)| k == key).map(|(_, v)| *v)))
            .collect();
        temp_env::with_vars(vars, check);
    }

    #[test]
    fn test_defaults_with_api_key() {
        with_env(&[("GCP_BILLING_API_KEY", "secret")], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.refresh_interval_hours, 24);
            assert_eq!(config.hours_per_month, 730.5);
            assert_eq!(config.inventory_path, PathBuf::from("inventory.json"));
            assert!(config.metrics.is_none());
            assert_eq!(config.metrics_idle_timeout, Some(Duration::from_secs(7200)));
            assert_eq!(
                config.catalog,
                CatalogConfig::BillingApi {
                    base_url: BILLING_API_BASE.to_string(),
                    api_key: "secret".to_string(),
                    service_ids: ServiceIds::default(),
                }
            );
        });
    }

    #[test]
    fn test_catalog_dir_wins() {
        with_env(
            &[("COST_CATALOG_DIR", "/var/catalog"), ("GCP_BILLING_API_KEY", "secret")],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.catalog, CatalogConfig::Directory(PathBuf::from("/var/catalog")));
            },
        );
    }

    #[test]
    fn test_missing_catalog_source() {
        with_env(&[], || {
            let err = Config::from_env().unwrap_err();
            assert!(err.to_string().contains("GCP_BILLING_API_KEY"));
        });
    }

    #[test]
    fn test_rejects_non_positive_hours() {
        with_env(
            &[("COST_CATALOG_DIR", "/tmp"), ("COST_HOURS_PER_MONTH", "0")],
            || {
                assert!(matches!(
                    Config::from_env(),
                    Err(ConfigError::InvalidValue { .. })
                ));
            },
        );
    }

    #[test]
    fn test_overrides() {
        with_env(
            &[
                ("COST_CATALOG_DIR", "/tmp"),
                ("COST_REFRESH_INTERVAL_HOURS", "6"),
                ("COST_HOURS_PER_MONTH", "720"),
                ("COST_METRICS_ADDR", "9464"),
                ("COST_METRICS_IDLE_SECS", "0"),
                ("COST_COLLECTOR_PROJECT", "acme-prod"),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.refresh_interval_hours, 6);
                assert_eq!(config.hours_per_month, 720.0);
                assert_eq!(config.metrics.unwrap().addr.port(), 9464);
                assert_eq!(config.project.as_deref(), Some("acme-prod"));
                assert!(config.metrics_idle_timeout.is_none());
            },
        );
    }
}
