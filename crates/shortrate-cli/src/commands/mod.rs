//! CLI command implementations.

pub mod calibrate;
pub mod price;
pub mod tree;

// Re-export submodules for convenience
pub use calibrate::CalibrateArgs;
pub use price::PriceArgs;
pub use tree::TreeArgs;

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use serde::Deserialize;

use shortrate_trees::binomial::{BinomialTreeParams, ShortRateDynamics};
use shortrate_trees::market::{MarketRates, RateUnit};
use shortrate_trees::tree::{DEFAULT_DT, DEFAULT_Q_UP};

use crate::config::TreeSection;
use crate::error::{CliError, CliResult};

/// Default root short rate, percent.
pub const DEFAULT_RATE_PCT: f64 = 5.0;

/// Default binomial volatility, percent.
pub const DEFAULT_VOLATILITY_PCT: f64 = 10.0;

/// Default number of binomial steps.
pub const DEFAULT_STEPS: usize = 10;

/// Short-rate dynamics choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelChoice {
    /// r·exp(±σ√dt)
    #[default]
    Lognormal,
    /// r ± σ√dt
    Normal,
    /// r·u and r·d
    Factors,
}

/// Binomial tree flags, shared by `price` and `tree`.
///
/// Rates and volatilities are in percent.
#[derive(Args, Debug, Clone, Default)]
pub struct LatticeArgs {
    /// Root short rate in percent [default: 5]
    #[arg(short, long, global = true)]
    pub rate: Option<f64>,

    /// Short-rate dynamics [default: lognormal]
    #[arg(short, long, value_enum, global = true)]
    pub model: Option<ModelChoice>,

    /// Short-rate volatility in percent, for lognormal and normal trees [default: 10]
    #[arg(long, global = true)]
    pub volatility: Option<f64>,

    /// Up factor, for factor trees
    #[arg(long, global = true)]
    pub up: Option<f64>,

    /// Down factor, for factor trees
    #[arg(long, global = true)]
    pub down: Option<f64>,

    /// Risk-neutral probability of an up move [default: 0.5]
    #[arg(long, global = true)]
    pub q_up: Option<f64>,

    /// Period length in years [default: 1]
    #[arg(long, global = true)]
    pub dt: Option<f64>,

    /// Number of time steps [default: 10, or the instrument's life when pricing]
    #[arg(short, long, global = true)]
    pub steps: Option<usize>,
}

impl LatticeArgs {
    /// Merges flags over the `[tree]` config section into tree parameters.
    ///
    /// `min_steps` raises the default step count so an instrument fits.
    pub fn resolve(&self, config: &TreeSection, min_steps: usize) -> CliResult<BinomialTreeParams> {
        let rate = self.rate.or(config.rate).unwrap_or(DEFAULT_RATE_PCT) / 100.0;
        let model = self.model.or(config.model).unwrap_or_default();
        let steps = self
            .steps
            .or(config.steps)
            .unwrap_or_else(|| DEFAULT_STEPS.max(min_steps));

        let dynamics = match model {
            ModelChoice::Lognormal | ModelChoice::Normal => {
                let volatility =
                    self.volatility.or(config.volatility).unwrap_or(DEFAULT_VOLATILITY_PCT) / 100.0;
                if model == ModelChoice::Lognormal {
                    ShortRateDynamics::Lognormal { volatility }
                } else {
                    ShortRateDynamics::Normal { volatility }
                }
            }
            ModelChoice::Factors => {
                let up = self
                    .up
                    .or(config.up)
                    .ok_or_else(|| CliError::invalid_argument("up", "required for a factor tree"))?;
                let down = self
                    .down
                    .or(config.down)
                    .ok_or_else(|| CliError::invalid_argument("down", "required for a factor tree"))?;
                ShortRateDynamics::Factors { up, down }
            }
        };

        Ok(BinomialTreeParams::new(rate, steps, dynamics)
            .with_q_up(self.q_up.or(config.q_up).unwrap_or(DEFAULT_Q_UP))
            .with_dt(self.dt.or(config.dt).unwrap_or(DEFAULT_DT)))
    }
}

/// Market yield ladder flags, shared by `calibrate` and `price`.
#[derive(Args, Debug, Clone, Default)]
pub struct MarketArgs {
    /// Inline yields as MATURITY:RATE pairs, e.g. "1:4.1,2:4.0,5:3.9"
    #[arg(long, global = true)]
    pub rates: Option<String>,

    /// CSV file with maturity,rate columns
    #[arg(long, global = true, conflicts_with = "rates")]
    pub rates_file: Option<PathBuf>,

    /// Rates are decimals (0.041) rather than percent (4.1)
    #[arg(long, global = true)]
    pub decimal: bool,
}

impl MarketArgs {
    /// Returns `true` if any market data was supplied.
    pub fn is_present(&self) -> bool {
        self.rates.is_some() || self.rates_file.is_some()
    }

    /// Loads the market ladder.
    pub fn load(&self) -> CliResult<MarketRates> {
        let points = match (&self.rates, &self.rates_file) {
            (Some(inline), _) => parse_rate_points(inline)?,
            (None, Some(path)) => read_rate_file(path)?,
            (None, None) => return Err(CliError::MissingMarketData),
        };
        let unit = if self.decimal {
            RateUnit::Decimal
        } else {
            RateUnit::Percent
        };
        tracing::debug!("Loaded {} market yields", points.len());
        Ok(MarketRates::new(points, unit)?)
    }
}

/// Parses `"1:4.1,2:4.0"` into `(maturity, rate)` pairs.
pub fn parse_rate_points(input: &str) -> CliResult<Vec<(f64, f64)>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (maturity, rate) = pair
                .split_once(':')
                .ok_or_else(|| CliError::InvalidRatePoint(pair.to_string()))?;
            let maturity = maturity
                .trim()
                .parse::<f64>()
                .map_err(|_| CliError::InvalidRatePoint(pair.to_string()))?;
            let rate = rate
                .trim()
                .parse::<f64>()
                .map_err(|_| CliError::InvalidRatePoint(pair.to_string()))?;
            Ok((maturity, rate))
        })
        .collect()
}

/// One row of a rates file.
#[derive(Debug, Deserialize)]
struct RateRecord {
    maturity: f64,
    rate: f64,
}

/// Reads `(maturity, rate)` pairs from a CSV file with a header row.
pub fn read_rate_file(path: &Path) -> CliResult<Vec<(f64, f64)>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    reader
        .deserialize::<RateRecord>()
        .map(|record| {
            let record = record?;
            Ok((record.maturity, record.rate))
        })
        .collect()
}

/// Converts a percentage flag to a decimal, rejecting non-finite input.
pub fn percent_to_decimal(name: &'static str, value: f64) -> CliResult<f64> {
    if value.is_finite() {
        Ok(value / 100.0)
    } else {
        Err(CliError::invalid_argument(name, format!("must be finite, got {value}")))
    }
}
