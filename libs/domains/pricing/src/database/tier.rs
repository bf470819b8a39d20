//! Cloud SQL tier and metadata resolution.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{PricingError, PricingResult};
use crate::models::{Availability, DatabaseEngine, DatabaseInstance, InstanceSpec, InstanceTraits};

static CUSTOM_TIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^db-custom-(?P<cpu>\d+)-(?P<ram>\d+)$").expect("custom tier pattern compiles")
});

static SHARED_CORE_TIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^db-(?P<family>[a-z0-9]+)-(?P<size>[a-z]+)$").expect("shared core tier pattern compiles")
});

static STANDARD_TIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^db-(?P<family>[a-z0-9]+)-(?P<tier>[a-z]+)-(?P<cpu>\d*)(?:-(?P<ram>\d+))?$")
        .expect("standard tier pattern compiles")
});

/// Decompose a tier identifier such as `db-custom-4-8192`, `db-f1-micro`
/// or `db-n1-standard-2`.
pub fn parse_tier(tier: &str) -> PricingResult<InstanceSpec> {
    let normalized = tier.trim().to_ascii_lowercase();
    let invalid = || PricingError::InvalidTier(tier.to_string());

    if let Some(caps) = CUSTOM_TIER.captures(&normalized) {
        let cpu = parse_number::<u32>(caps.name("cpu").map(|m| m.as_str())).ok_or_else(invalid)?;
        let ram_mb = parse_number::<u64>(caps.name("ram").map(|m| m.as_str())).ok_or_else(invalid)?;
        if cpu == 0 || ram_mb == 0 {
            return Err(invalid());
        }
        return Ok(InstanceSpec {
            cpu,
            ram_mb,
            tier: normalized,
            tier_type: "custom".to_string(),
            is_custom: true,
        });
    }

    if let Some(caps) = SHARED_CORE_TIER.captures(&normalized) {
        let family = caps.name("family").map(|m| m.as_str()).unwrap_or_default();
        let size = caps.name("size").map(|m| m.as_str()).unwrap_or_default();
        let tier_type = format!("{family}-{size}");
        return Ok(InstanceSpec {
            cpu: 0,
            ram_mb: 0,
            tier: normalized,
            tier_type,
            is_custom: false,
        });
    }

    if let Some(caps) = STANDARD_TIER.captures(&normalized) {
        let cpu = parse_number::<u32>(caps.name("cpu").map(|m| m.as_str()))
            .filter(|cpu| *cpu > 0)
            .ok_or_else(invalid)?;
        let ram_mb = parse_number::<u64>(caps.name("ram").map(|m| m.as_str())).unwrap_or(0);
        let tier_type = caps.name("tier").map(|m| m.as_str()).unwrap_or_default().to_string();
        return Ok(InstanceSpec {
            cpu,
            ram_mb,
            tier: normalized,
            tier_type,
            is_custom: false,
        });
    }

    Err(invalid())
}

fn parse_number<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    value.filter(|v| !v.is_empty())?.parse().ok()
}

/// Engine from a version string such as `POSTGRES_15` or `MYSQL_8_0`
pub fn resolve_engine(database_version: &str) -> PricingResult<DatabaseEngine> {
    let upper = database_version.to_ascii_uppercase();
    if upper.contains("MYSQL") {
        Ok(DatabaseEngine::MySql)
    } else if upper.contains("POSTGRES") {
        Ok(DatabaseEngine::Postgres)
    } else {
        Err(PricingError::UnknownEngine(database_version.to_string()))
    }
}

pub fn resolve_availability(availability_type: &str) -> PricingResult<Availability> {
    let upper = availability_type.to_ascii_uppercase();
    if upper.contains("REGIONAL") {
        Ok(Availability::Regional)
    } else if upper.contains("ZONAL") {
        Ok(Availability::Zonal)
    } else {
        Err(PricingError::UnknownAvailability(availability_type.to_string()))
    }
}

/// Everything the matcher needs to know about an instance
pub fn resolve_traits(instance: &DatabaseInstance) -> PricingResult<InstanceTraits> {
    Ok(InstanceTraits {
        region: instance.region.trim().to_lowercase(),
        engine: resolve_engine(&instance.database_version)?,
        availability: resolve_availability(&instance.availability_type)?,
        spec: parse_tier(&instance.tier)?,
    })
}
