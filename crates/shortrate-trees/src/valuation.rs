//! Backward-induction valuation on a rate tree.
//!
//! Every instrument is priced by filling a [`ValuationLattice`] from its
//! terminal column back to the root. At each node the continuation value is
//! the risk-neutral expectation of the two successors,
//!
//! ```text
//! E(t, i) = q_up · V(t + 1, i) + q_down · V(t + 1, i + 1)
//! ```
//!
//! discounted over one period at the node's short rate, plus whatever the
//! instrument pays at that node.

use serde::Serialize;

use crate::error::TreeResult;
use crate::instruments::{
    BondForward, BondFuture, BondOption, CouponBond, ExerciseStyle, Instrument, Optionlet, Swap,
    Swaption, ZeroCouponBond,
};
use crate::tree::RateTree;

/// Node values with columns `t = 0..=horizon`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationLattice {
    values: Vec<Vec<f64>>,
}

impl ValuationLattice {
    /// Creates a zero-filled lattice with columns `0..=horizon`.
    #[must_use]
    pub fn with_horizon(horizon: usize) -> Self {
        Self {
            values: (0..=horizon).map(|t| vec![0.0; t + 1]).collect(),
        }
    }

    /// Returns the last column index.
    #[must_use]
    pub fn horizon(&self) -> usize {
        self.values.len() - 1
    }

    /// Returns the value at node `(t, i)`.
    ///
    /// # Panics
    ///
    /// Panics if the node is outside the lattice.
    #[must_use]
    pub fn value(&self, time_step: usize, state: usize) -> f64 {
        self.values[time_step][state]
    }

    /// Returns one column, top node first.
    #[must_use]
    pub fn column(&self, time_step: usize) -> &[f64] {
        &self.values[time_step]
    }

    /// Returns all columns.
    #[must_use]
    pub fn columns(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Returns the root value.
    #[must_use]
    pub fn root(&self) -> f64 {
        self.values[0][0]
    }

    fn set_column(&mut self, time_step: usize, column: Vec<f64>) {
        self.values[time_step] = column;
    }
}

/// Result of pricing one instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Valuation {
    /// Value at the root. For forwards and futures this is the forward or
    /// futures price rather than a present value.
    pub present_value: f64,
    /// Node values, when requested.
    pub lattice: Option<ValuationLattice>,
}

/// Prices instruments by backward induction over one rate tree.
///
/// # Example
///
/// ```rust
/// use shortrate_trees::instruments::ZeroCouponBond;
/// use shortrate_trees::tree::RateTree;
/// use shortrate_trees::valuation::BackwardInductionValuer;
///
/// let tree = RateTree::flat(0.05, 10).unwrap();
/// let pv = BackwardInductionValuer::new(&tree)
///     .present_value(&ZeroCouponBond::new(100.0, 10).into())
///     .unwrap();
/// assert!((pv - 100.0 / 1.05_f64.powi(10)).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct BackwardInductionValuer<'a> {
    tree: &'a RateTree,
    keep_lattice: bool,
}

impl<'a> BackwardInductionValuer<'a> {
    /// Creates a valuer that returns only the root value.
    #[must_use]
    pub fn new(tree: &'a RateTree) -> Self {
        Self {
            tree,
            keep_lattice: false,
        }
    }

    /// Also returns the full valuation lattice.
    #[must_use]
    pub fn with_lattice(mut self, keep_lattice: bool) -> Self {
        self.keep_lattice = keep_lattice;
        self
    }

    /// Returns the tree being walked.
    #[must_use]
    pub fn tree(&self) -> &RateTree {
        self.tree
    }

    /// Prices an instrument.
    ///
    /// # Errors
    ///
    /// - [`TreeError::InvalidParameter`](crate::TreeError::InvalidParameter)
    ///   if the instrument fields are malformed.
    /// - [`TreeError::ShapeMismatch`](crate::TreeError::ShapeMismatch) if the
    ///   instrument needs more periods than the tree covers.
    pub fn value(&self, instrument: &Instrument) -> TreeResult<Valuation> {
        instrument.validate()?;
        self.tree.ensure_covers(instrument.required_steps())?;

        let (present_value, lattice) = match instrument {
            Instrument::ZeroCouponBond(zcb) => self.coupon_bond(&CouponBond::from(*zcb)),
            Instrument::CouponBond(bond) => self.coupon_bond(bond),
            Instrument::BondForward(forward) => self.bond_forward(forward),
            Instrument::BondFuture(future) => self.bond_future(future),
            Instrument::BondOption(option) => self.bond_option(option),
            Instrument::Optionlet(optionlet) => self.optionlet(optionlet),
            Instrument::Swap(swap) => self.swap(swap),
            Instrument::Swaption(swaption) => self.swaption(swaption),
        };

        log::debug!(
            "{instrument} valued at {present_value} on a {}-step tree",
            self.tree.steps()
        );
        Ok(Valuation {
            present_value,
            lattice: self.keep_lattice.then_some(lattice),
        })
    }

    /// Prices an instrument and returns only the root value.
    pub fn present_value(&self, instrument: &Instrument) -> TreeResult<f64> {
        Ok(self.value(instrument)?.present_value)
    }

    /// Fills columns `to..from` of `lattice` from column `from`.
    ///
    /// `rule(t, i, rate, expectation)` returns the node value.
    fn roll_back<F>(&self, lattice: &mut ValuationLattice, from: usize, to: usize, rule: F)
    where
        F: Fn(usize, usize, f64, f64) -> f64,
    {
        let q_up = self.tree.q_up();
        let q_down = self.tree.q_down();
        for t in (to..from).rev() {
            let next = lattice.column(t + 1);
            let column: Vec<f64> = self
                .tree
                .column(t)
                .iter()
                .enumerate()
                .map(|(i, &rate)| {
                    let expectation = q_up * next[i] + q_down * next[i + 1];
                    rule(t, i, rate, expectation)
                })
                .collect();
            log::trace!("column {t}: {column:?}");
            lattice.set_column(t, column);
        }
    }

    /// Bond lattice paying coupons only at dates after `coupons_after`.
    fn bond_lattice(&self, bond: &CouponBond, coupons_after: usize) -> ValuationLattice {
        let dt = self.tree.dt();
        let maturity = bond.maturity;
        let mut lattice = ValuationLattice::with_horizon(maturity);
        lattice.set_column(maturity, vec![bond.cash_flow(maturity, dt); maturity + 1]);
        self.roll_back(&mut lattice, maturity, 0, |t, _, rate, expectation| {
            let coupon = if t > coupons_after { bond.cash_flow(t, dt) } else { 0.0 };
            coupon + expectation / (1.0 + rate * dt)
        });
        lattice
    }

    fn coupon_bond(&self, bond: &CouponBond) -> (f64, ValuationLattice) {
        let lattice = self.bond_lattice(bond, 0);
        (lattice.root(), lattice)
    }

    fn bond_forward(&self, forward: &BondForward) -> (f64, ValuationLattice) {
        let lattice = self.bond_lattice(&forward.bond, forward.delivery);
        let unit_zcb = CouponBond::from(ZeroCouponBond::new(1.0, forward.delivery));
        let discount = self.bond_lattice(&unit_zcb, 0).root();
        (lattice.root() / discount, lattice)
    }

    fn bond_future(&self, future: &BondFuture) -> (f64, ValuationLattice) {
        let delivery = future.delivery;
        let mut lattice = self.bond_lattice(&future.bond, delivery);
        // Marked to market each period: no discounting before delivery
        self.roll_back(&mut lattice, delivery, 0, |_, _, _, expectation| expectation);
        (lattice.root(), lattice)
    }

    fn bond_option(&self, option: &BondOption) -> (f64, ValuationLattice) {
        let dt = self.tree.dt();
        let bond = &option.bond;
        let bond_values = self.bond_lattice(bond, 0);
        let ex_coupon = |t: usize, i: usize| bond_values.value(t, i) - bond.cash_flow(t, dt);
        let intrinsic = |t: usize, i: usize| option.option_type.payoff(ex_coupon(t, i), option.strike);

        let expiry = option.expiry;
        let mut lattice = ValuationLattice::with_horizon(expiry);
        lattice.set_column(expiry, (0..=expiry).map(|i| intrinsic(expiry, i)).collect());
        self.roll_back(&mut lattice, expiry, 0, |t, i, rate, expectation| {
            let continuation = expectation / (1.0 + rate * dt);
            match option.exercise {
                ExerciseStyle::European => continuation,
                ExerciseStyle::American => continuation.max(intrinsic(t, i)),
            }
        });
        (lattice.root(), lattice)
    }

    fn optionlet(&self, optionlet: &Optionlet) -> (f64, ValuationLattice) {
        let dt = self.tree.dt();
        let fixing = optionlet.maturity - 1;
        let mut lattice = ValuationLattice::with_horizon(optionlet.maturity);
        self.roll_back(&mut lattice, optionlet.maturity, 0, |t, _, rate, expectation| {
            let payment = if t == fixing {
                optionlet.notional * optionlet.option_type.payoff(rate, optionlet.strike) * dt
            } else {
                0.0
            };
            (payment + expectation) / (1.0 + rate * dt)
        });
        (lattice.root(), lattice)
    }

    fn swap_lattice(&self, swap: &Swap) -> ValuationLattice {
        let dt = self.tree.dt();
        let mut lattice = ValuationLattice::with_horizon(swap.maturity);
        self.roll_back(&mut lattice, swap.maturity, 0, |_, _, rate, expectation| {
            (swap.net_payment(rate, dt) + expectation) / (1.0 + rate * dt)
        });
        lattice
    }

    fn swap(&self, swap: &Swap) -> (f64, ValuationLattice) {
        let lattice = self.swap_lattice(swap);
        (lattice.root(), lattice)
    }

    fn swaption(&self, swaption: &Swaption) -> (f64, ValuationLattice) {
        let dt = self.tree.dt();
        let expiry = swaption.expiry;
        let mut lattice = self.swap_lattice(&swaption.swap);
        let exercised: Vec<f64> = lattice.column(expiry).iter().map(|v| v.max(0.0)).collect();
        lattice.set_column(expiry, exercised);
        self.roll_back(&mut lattice, expiry, 0, |_, _, rate, expectation| {
            expectation / (1.0 + rate * dt)
        });
        (lattice.root(), lattice)
    }
}
