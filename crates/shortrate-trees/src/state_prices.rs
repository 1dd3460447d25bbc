//! Arrow-Debreu state prices.
//!
//! `Q[t][i]` is today's price of a security paying 1 at node `(t, i)` and
//! nothing elsewhere. With `Q[0][0] = 1` the lattice is filled forward:
//!
//! ```text
//! Q[t+1][i] = q_up · Q[t][i] · δ(t, i) + q_down · Q[t][i-1] · δ(t, i-1)
//! ```
//!
//! where `δ(t, i)` is the one-period discount factor at the node. The sum of
//! column `t` is the price of a zero-coupon bond maturing at `t`, which makes
//! this the natural object for forward calibration.

use serde::Serialize;

use crate::tree::RateTree;

/// Arrow-Debreu prices over a rate tree, columns `t = 0..=N`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatePriceLattice {
    prices: Vec<Vec<f64>>,
}

impl StatePriceLattice {
    /// Runs forward induction over every column of `tree`.
    #[must_use]
    pub fn from_tree(tree: &RateTree) -> Self {
        let mut prices = Vec::with_capacity(tree.steps() + 1);
        prices.push(vec![1.0]);
        for t in 0..tree.steps() {
            let next = advance(&prices[t], tree.column(t), tree.dt(), tree.q_up());
            prices.push(next);
        }
        Self { prices }
    }

    /// Returns the number of periods covered.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.prices.len() - 1
    }

    /// Returns the state price of node `(t, i)`.
    ///
    /// # Panics
    ///
    /// Panics if the node is outside the lattice.
    #[must_use]
    pub fn price_at(&self, time_step: usize, state: usize) -> f64 {
        self.prices[time_step][state]
    }

    /// Returns one column of state prices.
    #[must_use]
    pub fn column(&self, time_step: usize) -> &[f64] {
        &self.prices[time_step]
    }

    /// Returns every column, `t = 0` first.
    #[must_use]
    pub fn columns(&self) -> &[Vec<f64>] {
        &self.prices
    }

    /// Price of a unit-face zero-coupon bond maturing at `maturity`.
    ///
    /// Returns `None` beyond the horizon.
    #[must_use]
    pub fn zcb_price(&self, maturity: usize) -> Option<f64> {
        self.prices.get(maturity).map(|column| column.iter().sum())
    }

    /// Unit-face zero-coupon prices for maturities `1..=N`.
    #[must_use]
    pub fn zcb_prices(&self) -> Vec<f64> {
        self.prices[1..]
            .iter()
            .map(|column| column.iter().sum())
            .collect()
    }

    /// Annually-compounded spot rates for maturities `1..=N`.
    ///
    /// `dt` is the period length in years.
    #[must_use]
    pub fn spot_rates(&self, dt: f64) -> Vec<f64> {
        self.zcb_prices()
            .iter()
            .enumerate()
            .map(|(k, &price)| spot_rate_from_price(price, (k + 1) as f64 * dt))
            .collect()
    }
}

/// Advances one column of state prices through one column of rates.
///
/// `state` has `t + 1` entries, `rates` the matching `t + 1` short rates;
/// the result has `t + 2` entries.
pub(crate) fn advance(state: &[f64], rates: &[f64], dt: f64, q_up: f64) -> Vec<f64> {
    let q_down = 1.0 - q_up;
    let mut next = vec![0.0; state.len() + 1];
    for (i, (&q, &r)) in state.iter().zip(rates).enumerate() {
        let discounted = q / (1.0 + r * dt);
        next[i] += q_up * discounted;
        next[i + 1] += q_down * discounted;
    }
    next
}

/// Annually-compounded rate implied by a unit-face price over `years`.
#[must_use]
pub fn spot_rate_from_price(price: f64, years: f64) -> f64 {
    price.powf(-1.0 / years) - 1.0
}

/// Unit-face price of a zero-coupon bond at an annually-compounded rate.
#[must_use]
pub fn price_from_spot_rate(rate: f64, years: f64) -> f64 {
    (1.0 + rate).powf(-years)
}
