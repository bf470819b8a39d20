use strum::IntoStaticStr;
use thiserror::Error;

/// Result type for pricing engine operations
pub type PricingResult<T> = Result<T, PricingError>;

/// Errors surfaced by the pricing engine.
///
/// Structural errors abort an index rebuild. Lookup misses are returned to
/// the caller, which skips the one resource and carries on.
#[derive(Debug, Clone, PartialEq, Error, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum PricingError {
    /// An empty catalog is always a fetch failure
    #[error("No SKU found for service '{0}'")]
    NoSkuFound(String),

    /// A record breaks an assumption the catalog contract guarantees
    #[error("Structural violation in SKU '{sku_id}': {reason}")]
    StructuralViolation { sku_id: String, reason: String },

    #[error("Region not found: {0}")]
    RegionNotFound(String),

    #[error("Machine family '{family}' not found in region '{region}'")]
    FamilyNotFound { region: String, family: String },

    /// The family is priced in the region, but not for this pricing model
    #[error("No {model} prices for machine family '{family}' in region '{region}'")]
    PricingModelNotFound {
        region: String,
        family: String,
        model: String,
    },

    #[error("Storage class '{class}' not found in region '{region}'")]
    StorageClassNotFound { region: String, class: String },

    #[error("Invalid tier: '{0}'")]
    InvalidTier(String),

    #[error("Unknown database engine: '{0}'")]
    UnknownEngine(String),

    #[error("Unknown availability type: '{0}'")]
    UnknownAvailability(String),

    #[error("No price found for tier '{tier}' in region '{region}'")]
    PriceNotFound { tier: String, region: String },

    #[error("Missing {component} component price in region '{region}'")]
    ComponentPriceMissing { component: String, region: String },

    #[error("Invalid resource descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Invalid grammar: {0}")]
    InvalidGrammar(String),

    /// Failure reported by a catalog source
    #[error("Catalog error: {0}")]
    Catalog(String),
}

impl PricingError {
    /// Whether this is a per-resource lookup miss rather than a failure of
    /// the engine or its inputs.
    pub fn is_lookup_miss(&self) -> bool {
        matches!(
            self,
            PricingError::RegionNotFound(_)
                | PricingError::FamilyNotFound { .. }
                | PricingError::PricingModelNotFound { .. }
                | PricingError::StorageClassNotFound { .. }
                | PricingError::PriceNotFound { .. }
                | PricingError::ComponentPriceMissing { .. }
        )
    }

    /// Stable snake_case name of the variant, for metric labels
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

/// Why a SKU produced no priced facts. Never aborts a rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkuRejection {
    #[error("excluded by '{0}'")]
    Excluded(String),

    #[error("description matches no known grammar")]
    Unparsable,

    #[error("missing tiered rate data")]
    MissingPricing,

    #[error("unknown storage class")]
    UnknownStorageClass,

    #[error("belongs to service '{0}'")]
    ForeignService(String),
}
