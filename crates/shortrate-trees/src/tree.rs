//! Recombining short-rate tree.
//!
//! Storage follows a triangular layout: column `t` holds `t + 1` nodes and
//! node `i` counts the down-moves taken to reach it.

use serde::Serialize;

use crate::error::{ensure_finite, ensure_positive, ensure_probability, TreeError, TreeResult};
use crate::state_prices::StatePriceLattice;

/// Default risk-neutral probability of an up move.
pub const DEFAULT_Q_UP: f64 = 0.5;

/// Default period length in years.
pub const DEFAULT_DT: f64 = 1.0;

/// A recombining binomial tree of one-period short rates.
///
/// `rates[t][i]` is the short rate applicable over `[t, t + 1]` at node
/// `i`. The successors of `(t, i)` are `(t + 1, i)` after an up move and
/// `(t + 1, i + 1)` after a down move, so up-down and down-up paths meet.
///
/// ```text
///              (2,0)
///             /
///        (1,0)
///       /     \
///  (0,0)       (2,1)
///       \     /
///        (1,1)
///             \
///              (2,2)
/// ```
///
/// A tree with `N` columns has a horizon of `N` periods: it can discount
/// any cash flow paid at `t <= N`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateTree {
    /// Period length in years.
    dt: f64,
    /// Risk-neutral probability of an up move.
    q_up: f64,
    /// `rates[t][i]`, `t = 0..N`, `i = 0..=t`.
    rates: Vec<Vec<f64>>,
}

impl RateTree {
    /// Creates a tree from explicit rate columns.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidParameter`] if there are no columns,
    /// column `t` does not hold exactly `t + 1` rates, a rate is not finite,
    /// a one-period discount factor would be non-positive (`1 + r·dt <= 0`),
    /// `dt <= 0`, or `q_up` is outside `(0, 1)`.
    pub fn from_rates(rates: Vec<Vec<f64>>, dt: f64, q_up: f64) -> TreeResult<Self> {
        ensure_positive("dt", dt)?;
        ensure_probability("q_up", q_up)?;
        if rates.is_empty() {
            return Err(TreeError::invalid_parameter(
                "rates",
                "a tree needs at least one time step",
            ));
        }
        for (t, column) in rates.iter().enumerate() {
            if column.len() != t + 1 {
                return Err(TreeError::invalid_parameter(
                    "rates",
                    format!("column {t} holds {} nodes, expected {}", column.len(), t + 1),
                ));
            }
            for &rate in column {
                ensure_finite("rates", rate)?;
                if 1.0 + rate * dt <= 0.0 {
                    return Err(TreeError::invalid_parameter(
                        "rates",
                        format!("rate {rate} at step {t} gives a non-positive discount factor"),
                    ));
                }
            }
        }
        Ok(Self { dt, q_up, rates })
    }

    /// Creates a tree with the same rate at every node.
    pub fn flat(rate: f64, steps: usize) -> TreeResult<Self> {
        let rates = (0..steps).map(|t| vec![rate; t + 1]).collect();
        Self::from_rates(rates, DEFAULT_DT, DEFAULT_Q_UP)
    }

    /// Returns the number of time steps (rate columns).
    ///
    /// This is also the horizon in periods.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.rates.len()
    }

    /// Returns the period length in years.
    #[must_use]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Returns the probability of an up move.
    #[must_use]
    pub fn q_up(&self) -> f64 {
        self.q_up
    }

    /// Returns the probability of a down move.
    #[must_use]
    pub fn q_down(&self) -> f64 {
        1.0 - self.q_up
    }

    /// Returns the number of nodes at the given time step.
    ///
    /// This is always `time_step + 1` for a recombining tree.
    #[must_use]
    pub fn states_at(&self, time_step: usize) -> usize {
        time_step + 1
    }

    /// Returns the short rate at the given node.
    ///
    /// # Panics
    ///
    /// Panics if `time_step >= steps()` or `state > time_step`.
    #[must_use]
    pub fn rate_at(&self, time_step: usize, state: usize) -> f64 {
        self.rates[time_step][state]
    }

    /// Returns the one-period discount factor `1 / (1 + r·dt)` at a node.
    ///
    /// # Panics
    ///
    /// Panics if the node is outside the tree.
    #[must_use]
    pub fn discount_factor(&self, time_step: usize, state: usize) -> f64 {
        1.0 / (1.0 + self.rates[time_step][state] * self.dt)
    }

    /// Returns the rates of one column, top (all up moves) first.
    #[must_use]
    pub fn column(&self, time_step: usize) -> &[f64] {
        &self.rates[time_step]
    }

    /// Returns all rate columns.
    #[must_use]
    pub fn columns(&self) -> &[Vec<f64>] {
        &self.rates
    }

    /// Returns the time in years at the given step.
    #[must_use]
    pub fn time_at_step(&self, time_step: usize) -> f64 {
        time_step as f64 * self.dt
    }

    /// Returns the horizon in years.
    #[must_use]
    pub fn maturity(&self) -> f64 {
        self.steps() as f64 * self.dt
    }

    /// Fails with [`TreeError::ShapeMismatch`] unless the tree covers
    /// `periods` periods.
    pub fn ensure_covers(&self, periods: usize) -> TreeResult<()> {
        if periods > self.steps() {
            Err(TreeError::shape_mismatch(periods, self.steps()))
        } else {
            Ok(())
        }
    }

    /// Computes Arrow-Debreu state prices by forward induction.
    #[must_use]
    pub fn state_prices(&self) -> StatePriceLattice {
        StatePriceLattice::from_tree(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn three_step_tree() -> RateTree {
        RateTree::from_rates(
            vec![vec![0.06], vec![0.075, 0.045], vec![0.09, 0.06, 0.03]],
            1.0,
            0.5,
        )
        .unwrap()
    }

    #[test]
    fn test_tree_creation() {
        let tree = three_step_tree();
        assert_eq!(tree.steps(), 3);
        assert_eq!(tree.states_at(2), 3);
        assert_relative_eq!(tree.rate_at(1, 1), 0.045, epsilon = 1e-12);
        assert_relative_eq!(tree.q_down(), 0.5, epsilon = 1e-12);
        assert_eq!(tree.column(2), &[0.09, 0.06, 0.03]);
    }

    #[test]
    fn test_flat_tree() {
        let tree = RateTree::flat(0.04, 5).unwrap();
        assert_eq!(tree.steps(), 5);
        assert!(tree.columns().iter().flatten().all(|&r| (r - 0.04).abs() < 1e-15));
    }

    #[test]
    fn test_discount_factor() {
        let tree = three_step_tree();
        assert_relative_eq!(tree.discount_factor(0, 0), 1.0 / 1.06, epsilon = 1e-12);
    }

    #[test]
    fn test_discount_factor_with_dt() {
        let tree = RateTree::from_rates(vec![vec![0.08]], 0.5, 0.5).unwrap();
        assert_relative_eq!(tree.discount_factor(0, 0), 1.0 / 1.04, epsilon = 1e-12);
        assert_relative_eq!(tree.maturity(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(tree.time_at_step(1), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_non_triangular() {
        let result = RateTree::from_rates(vec![vec![0.05], vec![0.05]], 1.0, 0.5);
        assert!(matches!(result, Err(TreeError::InvalidParameter { name: "rates", .. })));
    }

    #[test]
    fn test_rejects_empty_and_bad_probability() {
        assert!(RateTree::from_rates(vec![], 1.0, 0.5).is_err());
        assert!(RateTree::from_rates(vec![vec![0.05]], 1.0, 0.0).is_err());
        assert!(RateTree::from_rates(vec![vec![0.05]], 0.0, 0.5).is_err());
    }

    #[test]
    fn test_rejects_rate_below_minus_one() {
        let result = RateTree::from_rates(vec![vec![-1.0]], 1.0, 0.5);
        assert!(result.is_err());
    }

    #[test]
    fn test_ensure_covers() {
        let tree = three_step_tree();
        assert!(tree.ensure_covers(3).is_ok());
        assert_eq!(
            tree.ensure_covers(4),
            Err(TreeError::ShapeMismatch {
                required: 4,
                available: 3
            })
        );
    }
}
