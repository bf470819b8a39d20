//! The shared classify step of every pricing pipeline.
//!
//! A grammar turns one catalog record into zero or more facts of its own
//! type, or says why it produced none. Compute/storage and database pricing
//! both plug into [`crate::catalog::fold_catalog`] through this trait.

use crate::error::{PricingResult, SkuRejection};
use crate::models::RawSku;

/// Outcome of classifying one SKU
#[derive(Debug, Clone, PartialEq)]
pub enum Classification<F> {
    Facts(Vec<F>),
    Rejected(SkuRejection),
}

impl<F> Classification<F> {
    pub fn facts(self) -> Vec<F> {
        match self {
            Classification::Facts(facts) => facts,
            Classification::Rejected(_) => Vec::new(),
        }
    }

    pub fn rejection(&self) -> Option<&SkuRejection> {
        match self {
            Classification::Facts(_) => None,
            Classification::Rejected(reason) => Some(reason),
        }
    }
}

pub trait SkuGrammar: Send + Sync {
    type Fact;

    /// Billing service this grammar understands, e.g. "Compute Engine"
    fn service(&self) -> &str;

    /// Classify one SKU. `Err` is reserved for structural violations.
    fn classify(&self, sku: &RawSku) -> PricingResult<Classification<Self::Fact>>;
}
