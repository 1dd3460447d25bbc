//! Calibration targets and market-rate ladders.
//!
//! Market data arrives as a sparse ladder of observed yields (for example
//! the 1, 2, 3, 5, 7, 10, 20 and 30-year Treasury points). [`MarketRates`]
//! fills the integer maturities in between by linear interpolation and
//! turns them into the zero-coupon prices a [`CalibrationTarget`] holds.

use serde::{Deserialize, Serialize};
use shortrate_math::interpolation::LinearInterpolator;

use crate::error::{ensure_finite, ensure_positive, TreeError, TreeResult};
use crate::state_prices::{price_from_spot_rate, spot_rate_from_price};
use crate::tree::DEFAULT_DT;

/// Unit in which observed rates are quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateUnit {
    /// 0.045 means 4.5%.
    #[default]
    Decimal,
    /// 4.5 means 4.5%.
    Percent,
}

impl RateUnit {
    /// Converts a quoted rate to decimal form.
    #[must_use]
    pub fn to_decimal(self, rate: f64) -> f64 {
        match self {
            Self::Decimal => rate,
            Self::Percent => rate / 100.0,
        }
    }
}

/// Observed zero-coupon prices for consecutive maturities `1..=M`.
///
/// Prices are per unit face. Entry `k - 1` is the price of the bond maturing
/// after `k` periods of `dt` years.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationTarget {
    prices: Vec<f64>,
    dt: f64,
}

impl CalibrationTarget {
    /// Creates a target from unit-face prices for maturities `1..=prices.len()`
    /// with annual periods.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidParameter`] if `prices` is empty or a price
    /// is not finite and positive.
    pub fn from_prices(prices: Vec<f64>) -> TreeResult<Self> {
        if prices.is_empty() {
            return Err(TreeError::invalid_parameter(
                "prices",
                "a calibration target needs at least one maturity",
            ));
        }
        for &price in &prices {
            ensure_positive("prices", price)?;
        }
        Ok(Self {
            prices,
            dt: DEFAULT_DT,
        })
    }

    /// Sets the period length the prices refer to.
    pub fn with_dt(mut self, dt: f64) -> TreeResult<Self> {
        ensure_positive("dt", dt)?;
        self.dt = dt;
        Ok(self)
    }

    /// Creates a target from `(maturity, price)` pairs.
    ///
    /// Maturities must run `1, 2, ..., M` without gaps.
    pub fn from_points(points: &[(usize, f64)]) -> TreeResult<Self> {
        for (expected, &(maturity, _)) in (1..).zip(points) {
            if maturity != expected {
                return Err(TreeError::invalid_parameter(
                    "maturity",
                    format!("expected maturity {expected}, got {maturity}"),
                ));
            }
        }
        Self::from_prices(points.iter().map(|&(_, price)| price).collect())
    }

    /// Creates a target from annually-compounded spot rates.
    ///
    /// Rate `k - 1` applies to maturity `k`, i.e. `k·dt` years.
    pub fn from_spot_rates(rates: &[f64], dt: f64) -> TreeResult<Self> {
        ensure_positive("dt", dt)?;
        let mut prices = Vec::with_capacity(rates.len());
        for (k, &rate) in rates.iter().enumerate() {
            ensure_finite("rates", rate)?;
            if rate <= -1.0 {
                return Err(TreeError::invalid_parameter(
                    "rates",
                    format!("spot rate {rate} at maturity {} is not above -100%", k + 1),
                ));
            }
            prices.push(price_from_spot_rate(rate, (k + 1) as f64 * dt));
        }
        Self::from_prices(prices)?.with_dt(dt)
    }

    /// Returns the number of maturities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Returns `true` if there are no maturities.
    ///
    /// Always `false` for a validated target.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Returns the target price for `maturity` (1-based).
    #[must_use]
    pub fn price(&self, maturity: usize) -> Option<f64> {
        maturity
            .checked_sub(1)
            .and_then(|index| self.prices.get(index).copied())
    }

    /// Returns the period length in years.
    #[must_use]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Returns all target prices, maturity 1 first.
    #[must_use]
    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    /// Returns `(maturity, price)` pairs.
    pub fn points(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        (1..).zip(self.prices.iter().copied())
    }

    /// Annually-compounded spot rates implied by the target prices.
    #[must_use]
    pub fn spot_rates(&self) -> Vec<f64> {
        self.points()
            .map(|(k, price)| spot_rate_from_price(price, k as f64 * self.dt))
            .collect()
    }
}

/// Sparse ladder of observed annually-compounded yields.
///
/// # Example
///
/// ```rust
/// use shortrate_trees::market::{MarketRates, RateUnit};
///
/// let rates = MarketRates::new(
///     vec![(1.0, 4.10), (2.0, 4.00), (5.0, 3.85), (10.0, 4.05)],
///     RateUnit::Percent,
/// )
/// .unwrap();
///
/// let target = rates.to_target(10, 1.0).unwrap();
/// assert_eq!(target.len(), 10);
/// ```
#[derive(Debug, Clone)]
pub struct MarketRates {
    interpolator: LinearInterpolator,
}

impl MarketRates {
    /// Creates a ladder from `(maturity in years, quoted rate)` pairs.
    ///
    /// Maturities must be positive and strictly increasing.
    pub fn new(points: Vec<(f64, f64)>, unit: RateUnit) -> TreeResult<Self> {
        if points.is_empty() {
            return Err(TreeError::invalid_parameter(
                "market_rates",
                "at least one observation is required",
            ));
        }
        let mut maturities = Vec::with_capacity(points.len());
        let mut rates = Vec::with_capacity(points.len());
        for (maturity, quoted) in points {
            ensure_positive("maturity", maturity)?;
            ensure_finite("market_rates", quoted)?;
            maturities.push(maturity);
            rates.push(unit.to_decimal(quoted));
        }
        if maturities.windows(2).any(|w| w[1] <= w[0]) {
            return Err(TreeError::invalid_parameter(
                "maturity",
                "observed maturities must be strictly increasing",
            ));
        }
        let interpolator = LinearInterpolator::new(maturities, rates)?.with_flat_extrapolation();
        Ok(Self { interpolator })
    }

    /// Returns the decimal yield at `years`, interpolated between
    /// observations and held flat outside them.
    pub fn yield_at(&self, years: f64) -> TreeResult<f64> {
        Ok(self.interpolator.interpolate(years)?)
    }

    /// Returns the observed maturities in years.
    #[must_use]
    pub fn maturities(&self) -> &[f64] {
        self.interpolator.xs()
    }

    /// Returns the spot rates at `k·dt` years for `k = 1..=horizon`.
    pub fn spot_ladder(&self, horizon: usize, dt: f64) -> TreeResult<Vec<f64>> {
        ensure_positive("dt", dt)?;
        (1..=horizon)
            .map(|k| self.yield_at(k as f64 * dt))
            .collect()
    }

    /// Builds a calibration target for maturities `1..=horizon`.
    pub fn to_target(&self, horizon: usize, dt: f64) -> TreeResult<CalibrationTarget> {
        if horizon == 0 {
            return Err(TreeError::invalid_parameter(
                "horizon",
                "must be at least 1",
            ));
        }
        let ladder = self.spot_ladder(horizon, dt)?;
        log::debug!(
            "interpolated {} observations onto a {horizon}-period ladder",
            self.maturities().len()
        );
        CalibrationTarget::from_spot_rates(&ladder, dt)
    }
}
