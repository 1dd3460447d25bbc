//! Short-rate models that produce rate trees.

use crate::error::TreeResult;
use crate::tree::RateTree;

/// A short-rate model that can lay out a recombining rate tree.
///
/// Implemented by [`BinomialTreeParams`](crate::binomial::BinomialTreeParams)
/// (fixed perturbation) and [`BdtModel`](crate::bdt::BdtModel) (calibrated
/// to a term structure), so callers can price against either through one
/// seam.
pub trait ShortRateModel: Send + Sync {
    /// Builds the rate tree.
    fn build_tree(&self) -> TreeResult<RateTree>;

    /// Returns the model name.
    fn name(&self) -> &'static str;
}
