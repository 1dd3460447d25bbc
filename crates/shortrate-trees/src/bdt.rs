//! Black-Derman-Toy calibration.
//!
//! The BDT tree fixes the relative spacing of each column from the
//! volatility and solves for its base level `a_t`:
//!
//! ```text
//! r(t, i) = a_t · exp(2 σ_t √dt · (t − i))
//! ```
//!
//! Calibration runs forward one column at a time. With the state prices of
//! column `t` known, the price of the zero-coupon bond maturing at `t + 1`
//! is a monotone function of `a_t`:
//!
//! ```text
//! P(t + 1) = Σ_i Q[t][i] / (1 + a_t · k_i · dt),   k_i = exp(2 σ_t √dt · (t − i))
//! ```
//!
//! so each step is a one-dimensional root find. Once solved, the column is
//! frozen and the state prices are advanced to `t + 1`.

use serde::{Deserialize, Serialize};
use shortrate_math::solvers::{SolverConfig, SolverMethod};
use shortrate_math::MathError;

use crate::error::{ensure_non_negative, ensure_positive, ensure_probability, TreeError, TreeResult};
use crate::market::CalibrationTarget;
use crate::model::ShortRateModel;
use crate::state_prices::{advance, spot_rate_from_price};
use crate::tree::{RateTree, DEFAULT_DT, DEFAULT_Q_UP};

/// Default lower bound for the level search.
pub const DEFAULT_LEVEL_FLOOR: f64 = 1e-10;

/// Default upper bound for the level search.
pub const DEFAULT_LEVEL_CAP: f64 = 1.0;

/// Short-rate volatility per time step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VolatilityTermStructure {
    /// The same volatility at every step.
    Flat(f64),
    /// `σ_t` for `t = 0, 1, ...`.
    PerStep(Vec<f64>),
}

impl VolatilityTermStructure {
    /// Returns the volatility applied to column `time_step`.
    ///
    /// # Panics
    ///
    /// Panics if a per-step structure is shorter than `time_step + 1`.
    /// [`validate`](Self::validate) rules this out.
    #[must_use]
    pub fn at(&self, time_step: usize) -> f64 {
        match self {
            Self::Flat(sigma) => *sigma,
            Self::PerStep(sigmas) => sigmas[time_step],
        }
    }

    /// Checks that the structure covers `steps` columns with finite,
    /// non-negative volatilities.
    pub fn validate(&self, steps: usize) -> TreeResult<()> {
        match self {
            Self::Flat(sigma) => ensure_non_negative("volatility", *sigma),
            Self::PerStep(sigmas) => {
                if sigmas.len() < steps {
                    return Err(TreeError::invalid_parameter(
                        "volatility",
                        format!("{} volatilities given for {steps} steps", sigmas.len()),
                    ));
                }
                sigmas
                    .iter()
                    .try_for_each(|&sigma| ensure_non_negative("volatility", sigma))
            }
        }
    }
}

impl From<f64> for VolatilityTermStructure {
    fn from(sigma: f64) -> Self {
        Self::Flat(sigma)
    }
}

/// Numerical settings for BDT calibration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BdtConfig {
    /// Root finder used for every level.
    pub solver: SolverMethod,
    /// Tolerance and iteration cap.
    pub solver_config: SolverConfig,
    /// Search bracket `(lo, hi)` for the level `a_t`.
    pub level_bounds: (f64, f64),
    /// Period length in years.
    pub dt: f64,
    /// Risk-neutral probability of an up move.
    pub q_up: f64,
}

impl Default for BdtConfig {
    fn default() -> Self {
        Self {
            solver: SolverMethod::default(),
            solver_config: SolverConfig::default(),
            level_bounds: (DEFAULT_LEVEL_FLOOR, DEFAULT_LEVEL_CAP),
            dt: DEFAULT_DT,
            q_up: DEFAULT_Q_UP,
        }
    }
}

impl BdtConfig {
    /// Sets the root finder.
    #[must_use]
    pub fn with_solver(mut self, solver: SolverMethod) -> Self {
        self.solver = solver;
        self
    }

    /// Sets tolerance and iteration cap.
    #[must_use]
    pub fn with_solver_config(mut self, solver_config: SolverConfig) -> Self {
        self.solver_config = solver_config;
        self
    }

    /// Sets the level search bracket.
    #[must_use]
    pub fn with_level_bounds(mut self, lo: f64, hi: f64) -> Self {
        self.level_bounds = (lo, hi);
        self
    }

    /// Sets the period length in years.
    #[must_use]
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    /// Sets the probability of an up move.
    #[must_use]
    pub fn with_q_up(mut self, q_up: f64) -> Self {
        self.q_up = q_up;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> TreeResult<()> {
        self.solver_config.validate()?;
        ensure_positive("dt", self.dt)?;
        ensure_probability("q_up", self.q_up)?;
        let (lo, hi) = self.level_bounds;
        ensure_positive("level_bounds", lo)?;
        ensure_positive("level_bounds", hi)?;
        if lo >= hi {
            return Err(TreeError::invalid_parameter(
                "level_bounds",
                format!("lower bound {lo} is not below upper bound {hi}"),
            ));
        }
        Ok(())
    }
}

/// Fit quality for one maturity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationPoint {
    /// Maturity in periods.
    pub maturity: usize,
    /// Target unit-face price.
    pub target_price: f64,
    /// Tree-implied unit-face price.
    pub model_price: f64,
    /// Calibrated level `a_t` of the column feeding this maturity.
    pub level: f64,
    /// Root-finder iterations.
    pub iterations: u32,
    /// `model_price - target_price`.
    pub residual: f64,
}

/// Per-maturity repricing report of a calibration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationReport {
    /// Root finder used.
    pub solver: SolverMethod,
    /// One entry per maturity, shortest first.
    pub points: Vec<CalibrationPoint>,
}

impl CalibrationReport {
    /// Largest absolute price residual.
    #[must_use]
    pub fn max_abs_residual(&self) -> f64 {
        self.points
            .iter()
            .map(|p| p.residual.abs())
            .fold(0.0, f64::max)
    }

    /// Total root-finder iterations across all steps.
    #[must_use]
    pub fn total_iterations(&self) -> u32 {
        self.points.iter().map(|p| p.iterations).sum()
    }

    /// Returns `true` if every residual is within `tolerance`.
    #[must_use]
    pub fn is_within(&self, tolerance: f64) -> bool {
        self.max_abs_residual() <= tolerance
    }
}

/// A BDT tree together with its levels and repricing report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibratedTree {
    /// The calibrated rate tree.
    pub tree: RateTree,
    /// Level `a_t` of each column.
    pub levels: Vec<f64>,
    /// Per-maturity fit.
    pub report: CalibrationReport,
}

impl CalibratedTree {
    /// Tree-implied unit-face zero-coupon prices, maturity 1 first.
    #[must_use]
    pub fn zcb_prices(&self) -> Vec<f64> {
        self.report.points.iter().map(|p| p.model_price).collect()
    }

    /// Tree-implied annually-compounded spot rates `(1/P)^(1/T) − 1`.
    #[must_use]
    pub fn spot_rates(&self) -> Vec<f64> {
        let dt = self.tree.dt();
        self.report
            .points
            .iter()
            .map(|p| spot_rate_from_price(p.model_price, p.maturity as f64 * dt))
            .collect()
    }
}

/// Calibrates a BDT tree to zero-coupon prices, one column at a time.
///
/// # Example
///
/// ```rust
/// use shortrate_trees::bdt::BdtCalibrator;
/// use shortrate_trees::market::CalibrationTarget;
///
/// let target = CalibrationTarget::from_spot_rates(&[0.040, 0.042, 0.045, 0.047], 1.0).unwrap();
/// let calibrated = BdtCalibrator::new(0.10).calibrate(&target).unwrap();
///
/// assert_eq!(calibrated.tree.steps(), 4);
/// assert!(calibrated.report.is_within(1e-10));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BdtCalibrator {
    volatility: VolatilityTermStructure,
    config: BdtConfig,
}

impl BdtCalibrator {
    /// Creates a calibrator with default numerical settings.
    #[must_use]
    pub fn new(volatility: impl Into<VolatilityTermStructure>) -> Self {
        Self {
            volatility: volatility.into(),
            config: BdtConfig::default(),
        }
    }

    /// Replaces the numerical settings.
    #[must_use]
    pub fn with_config(mut self, config: BdtConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the volatility term structure.
    #[must_use]
    pub fn volatility(&self) -> &VolatilityTermStructure {
        &self.volatility
    }

    /// Returns the numerical settings.
    #[must_use]
    pub fn config(&self) -> &BdtConfig {
        &self.config
    }

    /// Calibrates a tree with one column per target maturity.
    ///
    /// # Errors
    ///
    /// - [`TreeError::InvalidParameter`] for a bad volatility structure or
    ///   configuration.
    /// - [`TreeError::CalibrationFailure`] naming the first maturity whose
    ///   level bracket shows no sign change or whose root find does not
    ///   converge.
    pub fn calibrate(&self, target: &CalibrationTarget) -> TreeResult<CalibratedTree> {
        let steps = target.len();
        self.volatility.validate(steps)?;
        self.config.validate()?;
        if (target.dt() - self.config.dt).abs() > 1e-12 * self.config.dt {
            return Err(TreeError::invalid_parameter(
                "dt",
                format!(
                    "target prices use {}-year periods, calibrator is configured for {}",
                    target.dt(),
                    self.config.dt
                ),
            ));
        }

        let BdtConfig {
            solver,
            solver_config,
            level_bounds: (lo, hi),
            dt,
            q_up,
        } = self.config;

        let mut state = vec![1.0];
        let mut rates: Vec<Vec<f64>> = Vec::with_capacity(steps);
        let mut levels = Vec::with_capacity(steps);
        let mut points = Vec::with_capacity(steps);

        for (t, (maturity, target_price)) in target.points().enumerate() {
            let spacing = spacing_factors(t, self.volatility.at(t), dt);

            let objective = |a: f64| zcb_price_for_level(&state, &spacing, a, dt) - target_price;
            let derivative = |a: f64| zcb_price_derivative(&state, &spacing, a, dt);

            let solved = solver
                .solve(objective, derivative, lo, hi, &solver_config)
                .map_err(|err| step_failure(maturity, lo, hi, err))?;
            let level = solved.root;

            if (level - lo) <= (hi - lo) * 1e-9 || (hi - level) <= (hi - lo) * 1e-9 {
                log::warn!(
                    "BDT level for maturity {maturity} sits at its bound: a = {level:e}, bracket [{lo:e}, {hi:e}]"
                );
            }

            let column: Vec<f64> = spacing.iter().map(|k| level * k).collect();
            state = advance(&state, &column, dt, q_up);
            let model_price: f64 = state.iter().sum();

            log::debug!(
                "BDT step {t}: maturity {maturity}, a = {level:.10}, {} iterations, residual {:e}",
                solved.iterations,
                model_price - target_price
            );

            points.push(CalibrationPoint {
                maturity,
                target_price,
                model_price,
                level,
                iterations: solved.iterations,
                residual: model_price - target_price,
            });
            levels.push(level);
            rates.push(column);
        }

        let tree = RateTree::from_rates(rates, dt, q_up)?;
        Ok(CalibratedTree {
            tree,
            levels,
            report: CalibrationReport { solver, points },
        })
    }
}

/// `k_i = exp(2σ√dt · (t − i))` for `i = 0..=t`.
fn spacing_factors(time_step: usize, sigma: f64, dt: f64) -> Vec<f64> {
    let width = 2.0 * sigma * dt.sqrt();
    (0..=time_step)
        .map(|i| (width * (time_step - i) as f64).exp())
        .collect()
}

fn zcb_price_for_level(state: &[f64], spacing: &[f64], level: f64, dt: f64) -> f64 {
    state
        .iter()
        .zip(spacing)
        .map(|(q, k)| q / (1.0 + level * k * dt))
        .sum()
}

fn zcb_price_derivative(state: &[f64], spacing: &[f64], level: f64, dt: f64) -> f64 {
    -state
        .iter()
        .zip(spacing)
        .map(|(q, k)| {
            let growth = 1.0 + level * k * dt;
            q * k * dt / (growth * growth)
        })
        .sum::<f64>()
}

fn step_failure(maturity: usize, lo: f64, hi: f64, err: MathError) -> TreeError {
    match err {
        MathError::InvalidBracket { fa, fb, .. } => TreeError::calibration_failure(
            maturity,
            format!(
                "no sign change over level bracket [{lo:e}, {hi:e}] (pricing errors {fa:e}, {fb:e})"
            ),
        ),
        MathError::ConvergenceFailed {
            iterations,
            residual,
        } => TreeError::calibration_failure(
            maturity,
            format!("root finder did not converge in {iterations} iterations (residual {residual:e})"),
        ),
        other => TreeError::Math(other),
    }
}

/// A BDT tree calibrated on demand to a fixed target.
#[derive(Debug, Clone, PartialEq)]
pub struct BdtModel {
    calibrator: BdtCalibrator,
    target: CalibrationTarget,
}

impl BdtModel {
    /// Creates the model.
    #[must_use]
    pub fn new(calibrator: BdtCalibrator, target: CalibrationTarget) -> Self {
        Self { calibrator, target }
    }

    /// Runs the calibration and keeps the full report.
    pub fn calibrate(&self) -> TreeResult<CalibratedTree> {
        self.calibrator.calibrate(&self.target)
    }
}

impl ShortRateModel for BdtModel {
    fn build_tree(&self) -> TreeResult<RateTree> {
        self.calibrate().map(|calibrated| calibrated.tree)
    }

    fn name(&self) -> &'static str {
        "Black-Derman-Toy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn upward_target() -> CalibrationTarget {
        CalibrationTarget::from_spot_rates(&[0.040, 0.042, 0.044, 0.046, 0.047, 0.048], 1.0).unwrap()
    }

    #[test]
    fn test_first_level_matches_one_period_price() {
        let target = CalibrationTarget::from_prices(vec![1.0 / 1.05]).unwrap();
        let calibrated = BdtCalibrator::new(0.2).calibrate(&target).unwrap();
        assert_relative_eq!(calibrated.levels[0], 0.05, epsilon = 1e-12);
        assert_relative_eq!(calibrated.tree.rate_at(0, 0), 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_reprices_every_maturity() {
        let target = upward_target();
        let calibrated = BdtCalibrator::new(0.15).calibrate(&target).unwrap();
        let lattice = calibrated.tree.state_prices();

        for (maturity, price) in target.points() {
            assert_relative_eq!(lattice.zcb_price(maturity).unwrap(), price, epsilon = 1e-10);
        }
        assert!(calibrated.report.is_within(1e-10));
        assert_eq!(calibrated.report.points.len(), 6);
    }

    #[test]
    fn test_column_spacing_fixed_by_volatility() {
        let sigma = 0.12;
        let calibrated = BdtCalibrator::new(sigma).calibrate(&upward_target()).unwrap();
        let tree = &calibrated.tree;
        for t in 1..tree.steps() {
            for i in 0..t {
                assert_relative_eq!(
                    tree.rate_at(t, i) / tree.rate_at(t, i + 1),
                    (2.0 * sigma).exp(),
                    max_relative = 1e-12
                );
            }
            assert_relative_eq!(tree.rate_at(t, t), calibrated.levels[t], epsilon = 1e-15);
        }
    }

    #[test]
    fn test_zero_volatility_is_deterministic() {
        let target = CalibrationTarget::from_spot_rates(&[0.05; 5], 1.0).unwrap();
        let calibrated = BdtCalibrator::new(0.0).calibrate(&target).unwrap();
        for column in calibrated.tree.columns() {
            assert!(column.iter().all(|&r| (r - column[0]).abs() < 1e-15));
            assert_relative_eq!(column[0], 0.05, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_all_solvers_agree() {
        let target = upward_target();
        let levels: Vec<Vec<f64>> = [SolverMethod::Bisection, SolverMethod::Brent, SolverMethod::Newton]
            .into_iter()
            .map(|solver| {
                BdtCalibrator::new(0.1)
                    .with_config(BdtConfig::default().with_solver(solver))
                    .calibrate(&target)
                    .unwrap()
                    .levels
            })
            .collect();

        for step in 0..target.len() {
            assert_relative_eq!(levels[0][step], levels[1][step], epsilon = 1e-10);
            assert_relative_eq!(levels[1][step], levels[2][step], epsilon = 1e-10);
        }
    }

    #[test]
    fn test_per_step_volatility() {
        let vols = VolatilityTermStructure::PerStep(vec![0.0, 0.1, 0.2, 0.15, 0.1, 0.1]);
        let calibrated = BdtCalibrator::new(vols).calibrate(&upward_target()).unwrap();
        assert_relative_eq!(
            calibrated.tree.rate_at(2, 0) / calibrated.tree.rate_at(2, 1),
            0.4_f64.exp(),
            max_relative = 1e-12
        );
        assert!(calibrated.report.is_within(1e-10));
    }

    #[test]
    fn test_per_step_volatility_too_short() {
        let vols = VolatilityTermStructure::PerStep(vec![0.1, 0.1]);
        let result = BdtCalibrator::new(vols).calibrate(&upward_target());
        assert!(matches!(result, Err(TreeError::InvalidParameter { name: "volatility", .. })));
    }

    #[test]
    fn test_negative_volatility_rejected() {
        let result = BdtCalibrator::new(-0.1).calibrate(&upward_target());
        assert!(matches!(result, Err(TreeError::InvalidParameter { .. })));
    }

    #[test]
    fn test_no_sign_change_names_maturity() {
        // P(2) > P(1) would need a negative rate, below the level floor
        let target = CalibrationTarget::from_prices(vec![0.95, 0.97]).unwrap();
        let result = BdtCalibrator::new(0.1).calibrate(&target);
        match result {
            Err(TreeError::CalibrationFailure { maturity, reason }) => {
                assert_eq!(maturity, 2);
                assert!(reason.contains("no sign change"));
            }
            other => panic!("expected calibration failure, got {other:?}"),
        }
    }

    #[test]
    fn test_iteration_cap_reported_as_failure() {
        let config = BdtConfig::default()
            .with_solver(SolverMethod::Bisection)
            .with_solver_config(SolverConfig::default().with_max_iterations(1));
        let result = BdtCalibrator::new(0.1).with_config(config).calibrate(&upward_target());
        assert!(matches!(
            result,
            Err(TreeError::CalibrationFailure { maturity: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_bounds() {
        let config = BdtConfig::default().with_level_bounds(0.5, 0.1);
        let result = BdtCalibrator::new(0.1).with_config(config).calibrate(&upward_target());
        assert!(matches!(result, Err(TreeError::InvalidParameter { name: "level_bounds", .. })));
    }

    #[test]
    fn test_spot_rates_match_target() {
        let spots = [0.040, 0.042, 0.044, 0.046, 0.047, 0.048];
        let target = CalibrationTarget::from_spot_rates(&spots, 1.0).unwrap();
        let calibrated = BdtCalibrator::new(0.1).calibrate(&target).unwrap();
        for (implied, expected) in calibrated.spot_rates().iter().zip(spots) {
            assert_relative_eq!(*implied, expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_semiannual_steps() {
        let target = CalibrationTarget::from_spot_rates(&[0.04, 0.041, 0.042, 0.043], 0.5).unwrap();
        let calibrated = BdtCalibrator::new(0.1)
            .with_config(BdtConfig::default().with_dt(0.5))
            .calibrate(&target)
            .unwrap();
        assert_relative_eq!(calibrated.tree.dt(), 0.5, epsilon = 1e-15);
        assert!(calibrated.report.is_within(1e-10));
    }

    #[test]
    fn test_period_length_mismatch_rejected() {
        let target = CalibrationTarget::from_spot_rates(&[0.04, 0.041, 0.042, 0.043], 0.5).unwrap();
        let result = BdtCalibrator::new(0.1).calibrate(&target);
        assert!(matches!(result, Err(TreeError::InvalidParameter { name: "dt", .. })));
    }

    #[test]
    fn test_config_from_toml() {
        let config: BdtConfig = toml::from_str(
            r#"
            solver = "newton"
            level_bounds = [1e-8, 0.5]
            [solver_config]
            tolerance = 1e-10
            "#,
        )
        .unwrap();
        assert_eq!(config.solver, SolverMethod::Newton);
        assert_eq!(config.level_bounds, (1e-8, 0.5));
        assert_eq!(config.solver_config.max_iterations, 200);
        assert_relative_eq!(config.q_up, 0.5, epsilon = 1e-15);
    }

    #[test]
    fn test_model_builds_calibrated_tree() {
        let model = BdtModel::new(BdtCalibrator::new(0.1), upward_target());
        assert_eq!(model.name(), "Black-Derman-Toy");
        assert_eq!(model.build_tree().unwrap().steps(), 6);
    }
}
