//! Bracketed root-finding algorithms.
//!
//! Every solver here takes a bracket `[lo, hi]` whose endpoints have
//! function values of opposite sign, and fails with
//! [`MathError::InvalidBracket`](crate::MathError::InvalidBracket) otherwise.
//!
//! - [`bisection`]: halves the bracket every iteration
//! - [`brent`]: inverse quadratic / secant steps with a bisection fallback
//! - [`newton_bracketed`]: Newton steps with an analytic derivative, kept
//!   inside the bracket
//!
//! | Solver | Convergence | Needs |
//! |--------|-------------|-------|
//! | Bisection | Linear | Bracket |
//! | Brent | Superlinear | Bracket |
//! | Newton (bracketed) | Quadratic near the root | Bracket + derivative |
//!
//! # Example
//!
//! ```rust
//! use shortrate_math::solvers::{brent, SolverConfig};
//!
//! // One-period discount factor at 5%: find r with 1 / (1 + r) = 0.952381
//! let f = |r: f64| 1.0 / (1.0 + r) - 0.952_381;
//! let result = brent(f, 0.0, 1.0, &SolverConfig::default()).unwrap();
//! assert!((result.root - 0.05).abs() < 1e-6);
//! ```

mod bisection;
mod brent;
mod newton;

pub use bisection::bisection;
pub use brent::brent;
pub use newton::newton_bracketed;

use serde::{Deserialize, Serialize};

use crate::error::{MathError, MathResult};

/// Default tolerance for root-finding algorithms.
pub const DEFAULT_TOLERANCE: f64 = 1e-12;

/// Default maximum iterations for root-finding algorithms.
pub const DEFAULT_MAX_ITERATIONS: u32 = 200;

/// Configuration for root-finding algorithms.
///
/// `tolerance` is applied both to the residual `|f(x)|` and to the width of
/// the remaining bracket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Tolerance for convergence.
    pub tolerance: f64,
    /// Maximum number of iterations.
    pub max_iterations: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl SolverConfig {
    /// Creates a new solver configuration.
    #[must_use]
    pub fn new(tolerance: f64, max_iterations: u32) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }

    /// Sets the tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the maximum iterations.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Checks that the configuration can drive a solver.
    pub fn validate(&self) -> MathResult<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(MathError::invalid_input(format!(
                "tolerance must be positive and finite, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(MathError::invalid_input("max_iterations must be at least 1"));
        }
        Ok(())
    }
}

/// Result of a root-finding iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverResult {
    /// The root found.
    pub root: f64,
    /// Number of iterations used.
    pub iterations: u32,
    /// Final residual (function value at root).
    pub residual: f64,
}

/// Selects one of the bracketed root finders at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverMethod {
    /// Plain bisection.
    Bisection,
    /// Brent's method.
    #[default]
    Brent,
    /// Newton-Raphson with bisection safeguard.
    Newton,
}

impl SolverMethod {
    /// Solves `f(x) = 0` on `[lo, hi]`.
    ///
    /// `df` is only evaluated by [`SolverMethod::Newton`].
    pub fn solve<F, D>(
        self,
        f: F,
        df: D,
        lo: f64,
        hi: f64,
        config: &SolverConfig,
    ) -> MathResult<SolverResult>
    where
        F: Fn(f64) -> f64,
        D: Fn(f64) -> f64,
    {
        match self {
            Self::Bisection => bisection(f, lo, hi, config),
            Self::Brent => brent(f, lo, hi, config),
            Self::Newton => newton_bracketed(f, df, lo, hi, None, config),
        }
    }

    /// Returns the solver name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bisection => "Bisection",
            Self::Brent => "Brent",
            Self::Newton => "Newton (bracketed)",
        }
    }
}

/// Evaluates `f` at both ends of the bracket and checks for a sign change.
///
/// Returns the ordered bracket with its function values.
pub(crate) fn checked_bracket<F>(f: &F, a: f64, b: f64) -> MathResult<(f64, f64, f64, f64)>
where
    F: Fn(f64) -> f64,
{
    if !(a.is_finite() && b.is_finite()) || a == b {
        return Err(MathError::invalid_input(format!(
            "bracket [{a}, {b}] must have two distinct finite endpoints"
        )));
    }
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    let f_lo = f(lo);
    let f_hi = f(hi);
    if f_lo.is_nan() || f_hi.is_nan() {
        return Err(MathError::invalid_input(format!(
            "function is undefined at the bracket [{lo}, {hi}]"
        )));
    }
    if f_lo * f_hi > 0.0 {
        return Err(MathError::InvalidBracket {
            a: lo,
            b: hi,
            fa: f_lo,
            fb: f_hi,
        });
    }
    Ok((lo, hi, f_lo, f_hi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Price of an annual-pay bond per 100 face at yield `y`.
    fn bond_price(y: f64, coupon: f64, years: i32) -> f64 {
        let mut pv = 0.0;
        for t in 1..=years {
            pv += coupon / (1.0 + y).powi(t);
        }
        pv + 100.0 / (1.0 + y).powi(years)
    }

    fn bond_price_derivative(y: f64, coupon: f64, years: i32) -> f64 {
        let mut dpv = 0.0;
        for t in 1..=years {
            dpv -= f64::from(t) * coupon / (1.0 + y).powi(t + 1);
        }
        dpv - f64::from(years) * 100.0 / (1.0 + y).powi(years + 1)
    }

    #[test]
    fn test_solver_config() {
        let config = SolverConfig::default()
            .with_tolerance(1e-8)
            .with_max_iterations(50);

        assert!((config.tolerance - 1e-8).abs() < f64::EPSILON);
        assert_eq!(config.max_iterations, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_solver_config_rejects_bad_values() {
        assert!(SolverConfig::new(0.0, 10).validate().is_err());
        assert!(SolverConfig::new(f64::NAN, 10).validate().is_err());
        assert!(SolverConfig::new(1e-10, 0).validate().is_err());
    }

    #[test]
    fn test_all_methods_agree_on_ytm() {
        let f = |y: f64| bond_price(y, 6.0, 7) - 98.0;
        let df = |y: f64| bond_price_derivative(y, 6.0, 7);
        let config = SolverConfig::default();

        let roots: Vec<f64> = [SolverMethod::Bisection, SolverMethod::Brent, SolverMethod::Newton]
            .iter()
            .map(|m| m.solve(f, df, 0.0, 0.2, &config).unwrap().root)
            .collect();

        assert_relative_eq!(roots[0], roots[1], epsilon = 1e-9);
        assert_relative_eq!(roots[1], roots[2], epsilon = 1e-9);
        assert!(roots[1] > 0.06);
    }

    #[test]
    fn test_par_bond_yield_equals_coupon() {
        let f = |y: f64| bond_price(y, 5.0, 10) - 100.0;
        let result = SolverMethod::Brent
            .solve(f, |_| 0.0, 0.01, 0.10, &SolverConfig::default())
            .unwrap();
        assert_relative_eq!(result.root, 0.05, epsilon = 1e-10);
    }

    #[test]
    fn test_method_names() {
        assert_eq!(SolverMethod::Brent.name(), "Brent");
        assert_eq!(SolverMethod::default(), SolverMethod::Brent);
    }

    #[test]
    fn test_method_deserialises_lowercase() {
        let method: SolverMethod = serde_json::from_str("\"newton\"").unwrap();
        assert_eq!(method, SolverMethod::Newton);
    }

    #[test]
    fn test_checked_bracket_orders_endpoints() {
        let f = |x: f64| x - 1.0;
        let (lo, hi, f_lo, f_hi) = checked_bracket(&f, 3.0, 0.0).unwrap();
        assert_eq!((lo, hi), (0.0, 3.0));
        assert!(f_lo < 0.0 && f_hi > 0.0);
    }

    #[test]
    fn test_checked_bracket_rejects_degenerate() {
        let f = |x: f64| x;
        assert!(checked_bracket(&f, 1.0, 1.0).is_err());
        assert!(checked_bracket(&f, f64::NEG_INFINITY, 1.0).is_err());
    }
}
