//! Calibrate command implementation.

use anyhow::Result;
use clap::{Args, ValueEnum};
use serde::Serialize;
use tabled::Tabled;

use shortrate_math::solvers::{SolverConfig, SolverMethod};
use shortrate_trees::bdt::{BdtCalibrator, BdtConfig, CalibratedTree};
use shortrate_trees::market::MarketRates;
use shortrate_trees::tree::DEFAULT_DT;

use crate::cli::OutputFormat;
use crate::commands::MarketArgs;
use crate::config::{AppConfig, CalibrationSection};
use crate::output::{
    print_lattice, print_lattice_csv, print_output, print_success, print_warning, KeyValue,
    OutputOptions,
};

/// Default BDT short-rate volatility, percent.
pub const DEFAULT_BDT_VOLATILITY_PCT: f64 = 0.25;

/// Default calibration horizon in periods.
pub const DEFAULT_HORIZON: usize = 30;

/// Default face value for reported prices.
pub const DEFAULT_FACE: f64 = 100.0;

/// Residual above which the fit is reported as poor.
const RESIDUAL_WARNING: f64 = 1e-6;

/// Root finder choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SolverChoice {
    /// Plain bisection
    Bisection,
    /// Brent's method
    Brent,
    /// Newton-Raphson with bisection safeguard
    Newton,
}

impl From<SolverChoice> for SolverMethod {
    fn from(choice: SolverChoice) -> Self {
        match choice {
            SolverChoice::Bisection => SolverMethod::Bisection,
            SolverChoice::Brent => SolverMethod::Brent,
            SolverChoice::Newton => SolverMethod::Newton,
        }
    }
}

/// Arguments for the calibrate command.
#[derive(Args, Debug)]
pub struct CalibrateArgs {
    #[command(flatten)]
    pub market: MarketArgs,

    /// Short-rate volatility in percent [default: 0.25]
    #[arg(long)]
    pub volatility: Option<f64>,

    /// Root finder [default: brent]
    #[arg(long, value_enum)]
    pub solver: Option<SolverChoice>,

    /// Solver tolerance [default: 1e-12]
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Solver iteration cap [default: 200]
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Lower bound of the level search, decimal [default: 1e-10]
    #[arg(long)]
    pub lower_bound: Option<f64>,

    /// Upper bound of the level search, decimal [default: 1]
    #[arg(long)]
    pub upper_bound: Option<f64>,

    /// Number of periods to calibrate [default: 30]
    #[arg(long)]
    pub horizon: Option<usize>,

    /// Period length in years [default: 1]
    #[arg(long)]
    pub dt: Option<f64>,

    /// Face value for reported prices [default: 100]
    #[arg(long)]
    pub face: Option<f64>,

    /// Print the calibrated rate tree
    #[arg(long)]
    pub show_tree: bool,
}

/// Solver settings from the `[calibration]` config section.
pub(crate) fn bdt_config(section: &CalibrationSection) -> BdtConfig {
    let defaults = BdtConfig::default();
    let solver_config = SolverConfig::new(
        section
            .tolerance
            .unwrap_or(defaults.solver_config.tolerance),
        section
            .max_iterations
            .unwrap_or(defaults.solver_config.max_iterations),
    );
    let (lo, hi) = section.bounds.unwrap_or(defaults.level_bounds);
    defaults
        .with_solver(section.solver.unwrap_or(defaults.solver))
        .with_solver_config(solver_config)
        .with_level_bounds(lo, hi)
}

impl CalibrateArgs {
    /// Overlays the flags on the config file settings.
    fn to_config(&self, section: &CalibrationSection) -> BdtConfig {
        let base = bdt_config(section);
        let solver_config = SolverConfig::new(
            self.tolerance.unwrap_or(base.solver_config.tolerance),
            self.max_iterations
                .unwrap_or(base.solver_config.max_iterations),
        );
        let lo = self.lower_bound.unwrap_or(base.level_bounds.0);
        let hi = self.upper_bound.unwrap_or(base.level_bounds.1);
        base.with_solver(self.solver.map_or(base.solver, SolverMethod::from))
            .with_solver_config(solver_config)
            .with_level_bounds(lo, hi)
            .with_dt(self.dt.unwrap_or(DEFAULT_DT))
    }
}

/// One maturity of the calibration report.
#[derive(Debug, Clone, Serialize, Tabled)]
struct CalibrationRow {
    #[tabled(rename = "Maturity")]
    maturity: usize,
    #[tabled(rename = "Market Yield")]
    market_yield: String,
    #[tabled(rename = "Target Price")]
    target_price: String,
    #[tabled(rename = "Model Price")]
    model_price: String,
    #[tabled(rename = "Model Spot")]
    model_spot: String,
    #[tabled(rename = "Level")]
    level: String,
    #[tabled(rename = "Iterations")]
    iterations: u32,
    #[tabled(rename = "Residual")]
    residual: String,
}

/// Machine-readable calibration point.
#[derive(Debug, Serialize)]
struct PointRecord {
    maturity: usize,
    market_yield: f64,
    target_price: f64,
    model_price: f64,
    model_spot: f64,
    level: f64,
    iterations: u32,
    residual: f64,
}

/// Machine-readable calibration result.
#[derive(Debug, Serialize)]
struct CalibrationOutput<'a> {
    solver: &'static str,
    volatility: f64,
    dt: f64,
    face: f64,
    max_abs_residual: f64,
    points: Vec<PointRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rates: Option<&'a [Vec<f64>]>,
}

fn point_records(
    calibrated: &CalibratedTree,
    market: &MarketRates,
    dt: f64,
    face: f64,
) -> Result<Vec<PointRecord>> {
    let spots = calibrated.spot_rates();
    calibrated
        .report
        .points
        .iter()
        .zip(spots)
        .map(|(point, model_spot)| {
            Ok(PointRecord {
                maturity: point.maturity,
                market_yield: market.yield_at(point.maturity as f64 * dt)?,
                target_price: point.target_price * face,
                model_price: point.model_price * face,
                model_spot,
                level: point.level,
                iterations: point.iterations,
                residual: point.residual,
            })
        })
        .collect()
}

/// Execute the calibrate command.
pub fn execute(args: CalibrateArgs, config: &AppConfig, output: OutputOptions) -> Result<()> {
    let section = &config.calibration;
    let bdt = args.to_config(section);
    let horizon = args.horizon.or(section.horizon).unwrap_or(DEFAULT_HORIZON);
    let face = args.face.or(section.face).unwrap_or(DEFAULT_FACE);
    let volatility = args
        .volatility
        .or(section.volatility)
        .unwrap_or(DEFAULT_BDT_VOLATILITY_PCT)
        / 100.0;

    let market = args.market.load()?;
    let target = market.to_target(horizon, bdt.dt)?;
    tracing::info!(
        "Calibrating {horizon} periods with {} at σ = {volatility}",
        bdt.solver.name()
    );
    let calibrated = BdtCalibrator::new(volatility)
        .with_config(bdt)
        .calibrate(&target)?;

    let records = point_records(&calibrated, &market, bdt.dt, face)?;
    let max_residual = calibrated.report.max_abs_residual();

    match output.format {
        OutputFormat::Table => {
            output.header("BDT Calibration");
            let summary = vec![
                KeyValue::new("Solver", bdt.solver.name()),
                KeyValue::new("Volatility", output.percent(volatility)),
                KeyValue::new("Periods", horizon.to_string()),
                KeyValue::new("dt (years)", bdt.dt.to_string()),
                KeyValue::new(
                    "Total Iterations",
                    calibrated.report.total_iterations().to_string(),
                ),
                KeyValue::new("Max |Residual|", format!("{max_residual:.3e}")),
            ];
            print_output(&summary, output.format)?;

            output.header("Repricing");
            let rows: Vec<CalibrationRow> = records
                .iter()
                .map(|r| CalibrationRow {
                    maturity: r.maturity,
                    market_yield: output.percent(r.market_yield),
                    target_price: output.number(r.target_price),
                    model_price: output.number(r.model_price),
                    model_spot: output.percent(r.model_spot),
                    level: output.percent(r.level),
                    iterations: r.iterations,
                    residual: format!("{:.3e}", r.residual),
                })
                .collect();
            print_output(&rows, output.format)?;

            if args.show_tree {
                output.header("Short-Rate Tree");
                print_lattice(calibrated.tree.columns(), |r| output.percent(r));
            }

            if max_residual > RESIDUAL_WARNING {
                print_warning(&format!(
                    "Largest repricing error {max_residual:.3e} exceeds {RESIDUAL_WARNING:e}"
                ));
            } else if !output.quiet {
                print_success(&format!("Calibrated {horizon} periods"));
            }
        }
        OutputFormat::Json => {
            let report = CalibrationOutput {
                solver: bdt.solver.name(),
                volatility,
                dt: bdt.dt,
                face,
                max_abs_residual: max_residual,
                points: records,
                rates: args.show_tree.then(|| calibrated.tree.columns()),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Csv => {
            if args.show_tree {
                print_lattice_csv(calibrated.tree.columns())?;
            } else {
                let mut wtr = csv::Writer::from_writer(std::io::stdout());
                for record in &records {
                    wtr.serialize(record)?;
                }
                wtr.flush()?;
            }
        }
        OutputFormat::Minimal => {
            for record in &records {
                println!("{}", output.number(record.model_price));
            }
        }
    }

    Ok(())
}
