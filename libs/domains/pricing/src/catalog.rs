//! Classify → fold over a whole catalog.

use serde::Serialize;
use tracing::{debug, info, trace};

use crate::compute::ComputeGrammar;
use crate::error::{PricingError, PricingResult, SkuRejection};
use crate::grammar::{Classification, SkuGrammar};
use crate::index::{IndexBuilder, PricingIndex};
use crate::models::RawSku;

/// Counters for one fold over a catalog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FoldStats {
    pub skus: usize,
    pub facts: usize,
    pub excluded: usize,
    pub unparsable: usize,
    pub missing_pricing: usize,
    pub unknown_storage: usize,
    pub foreign_service: usize,
    pub duplicates: usize,
}

impl FoldStats {
    fn record(&mut self, rejection: &SkuRejection) {
        match rejection {
            SkuRejection::Excluded(_) => self.excluded += 1,
            SkuRejection::Unparsable => self.unparsable += 1,
            SkuRejection::MissingPricing => self.missing_pricing += 1,
            SkuRejection::UnknownStorageClass => self.unknown_storage += 1,
            SkuRejection::ForeignService(_) => self.foreign_service += 1,
        }
    }

    pub fn rejected(&self) -> usize {
        self.excluded + self.unparsable + self.missing_pricing + self.unknown_storage + self.foreign_service
    }
}

/// Classify every SKU and hand each fact to `sink`.
///
/// Soft rejections are counted and skipped. Any error from the grammar
/// aborts the fold, and so does an empty catalog.
pub fn fold_catalog<'a, G, I, F>(grammar: &G, skus: I, mut sink: F) -> PricingResult<FoldStats>
where
    G: SkuGrammar,
    I: IntoIterator<Item = &'a RawSku>,
    F: FnMut(G::Fact),
{
    let mut stats = FoldStats::default();

    for sku in skus {
        stats.skus += 1;
        match grammar.classify(sku)? {
            Classification::Facts(facts) => {
                stats.facts += facts.len();
                facts.into_iter().for_each(&mut sink);
            }
            Classification::Rejected(rejection) => {
                match &rejection {
                    SkuRejection::Excluded(term) => {
                        trace!(sku_id = %sku.sku_id, term = %term, "SKU excluded")
                    }
                    SkuRejection::UnknownStorageClass => debug!(
                        sku_id = %sku.sku_id,
                        description = %sku.description,
                        "Dropping storage SKU with unknown class prefix"
                    ),
                    other => debug!(
                        sku_id = %sku.sku_id,
                        description = %sku.description,
                        reason = %other,
                        "Skipping SKU"
                    ),
                }
                stats.record(&rejection);
            }
        }
    }

    if stats.skus == 0 {
        return Err(PricingError::NoSkuFound(grammar.service().to_string()));
    }

    Ok(stats)
}

/// Build a fresh compute/storage index from one service's catalog
pub fn build_index<'a, I>(grammar: &ComputeGrammar, skus: I) -> PricingResult<PricingIndex>
where
    I: IntoIterator<Item = &'a RawSku>,
{
    let mut builder = IndexBuilder::new();
    let stats = fold_catalog(grammar, skus, |fact| {
        builder.insert(fact);
    })?;
    let index = builder.finish(stats);

    info!(
        service = grammar.service(),
        skus = stats.skus,
        facts = stats.facts,
        rejected = stats.rejected(),
        duplicates = index.stats().duplicates,
        families = index.family_count(),
        storage_classes = index.storage_class_count(),
        "Built pricing index"
    );

    Ok(index)
}
