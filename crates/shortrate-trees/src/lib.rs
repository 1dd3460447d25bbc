//! # Shortrate Trees
//!
//! Recombining binomial short-rate trees for fixed-income pricing.
//!
//! This crate provides:
//!
//! - **Trees**: [`RateTree`] built from a fixed perturbation ([`binomial`]) or
//!   calibrated to zero-coupon prices with Black-Derman-Toy ([`bdt`])
//! - **State prices**: Arrow-Debreu prices by forward induction
//! - **Valuation**: backward induction for bonds, bond forwards and futures,
//!   bond options, caplets and floorlets, swaps and swaptions
//! - **Market data**: interpolation of a sparse yield ladder into a
//!   calibration target
//!
//! ## Example
//!
//! ```rust
//! use shortrate_trees::prelude::*;
//!
//! let target = CalibrationTarget::from_spot_rates(&[0.040, 0.042, 0.044, 0.045, 0.046], 1.0).unwrap();
//! let calibrated = BdtCalibrator::new(0.10).calibrate(&target).unwrap();
//!
//! let valuer = BackwardInductionValuer::new(&calibrated.tree);
//! let pv = valuer.present_value(&ZeroCouponBond::new(100.0, 5).into()).unwrap();
//! assert!((pv - 100.0 * target.price(5).unwrap()).abs() < 1e-6);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::float_cmp)]
#![allow(clippy::uninlined_format_args)]

pub mod bdt;
pub mod binomial;
pub mod error;
pub mod instruments;
pub mod market;
pub mod model;
pub mod state_prices;
pub mod tree;
pub mod valuation;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bdt::{
        BdtCalibrator, BdtConfig, BdtModel, CalibratedTree, CalibrationPoint, CalibrationReport,
        VolatilityTermStructure,
    };
    pub use crate::binomial::{BinomialTreeParams, ShortRateDynamics};
    pub use crate::error::{TreeError, TreeResult};
    pub use crate::instruments::{
        BondForward, BondFuture, BondOption, CouponBond, ExerciseStyle, Instrument, OptionType,
        Optionlet, Swap, SwapSide, Swaption, ZeroCouponBond,
    };
    pub use crate::market::{CalibrationTarget, MarketRates, RateUnit};
    pub use crate::model::ShortRateModel;
    pub use crate::state_prices::StatePriceLattice;
    pub use crate::tree::RateTree;
    pub use crate::valuation::{BackwardInductionValuer, Valuation, ValuationLattice};
    pub use shortrate_math::solvers::{SolverConfig, SolverMethod};
}

pub use error::{TreeError, TreeResult};
pub use tree::RateTree;
