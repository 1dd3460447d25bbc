//! Price command implementation.
//!
//! Prices one instrument by backward induction, either on a binomial tree
//! built from the tree flags or, when market yields are given, on a
//! Black-Derman-Toy tree calibrated to them.

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;

use shortrate_trees::bdt::{BdtCalibrator, BdtModel};
use shortrate_trees::instruments::{
    BondForward, BondFuture, BondOption, CouponBond, ExerciseStyle, Instrument, OptionType,
    Optionlet, Swap, SwapSide, Swaption, ZeroCouponBond,
};
use shortrate_trees::model::ShortRateModel;
use shortrate_trees::tree::{DEFAULT_DT, DEFAULT_Q_UP};
use shortrate_trees::valuation::{BackwardInductionValuer, ValuationLattice};

use crate::cli::OutputFormat;
use crate::commands::calibrate::{bdt_config, DEFAULT_BDT_VOLATILITY_PCT};
use crate::commands::{percent_to_decimal, LatticeArgs, MarketArgs};
use crate::config::AppConfig;
use crate::error::CliResult;
use crate::output::{print_lattice, print_lattice_csv, print_output, KeyValue, OutputOptions};

/// Arguments for the price command.
#[derive(Args, Debug)]
pub struct PriceArgs {
    #[command(subcommand)]
    pub instrument: InstrumentCommand,

    #[command(flatten)]
    pub lattice: LatticeArgs,

    #[command(flatten)]
    pub market: MarketArgs,

    /// Print the valuation lattice
    #[arg(long, global = true)]
    pub show_lattice: bool,
}

/// Instruments that can be priced.
#[derive(Subcommand, Debug)]
pub enum InstrumentCommand {
    /// Zero-coupon bond
    Zcb(BondArgs),

    /// Bullet coupon bond
    Bond(BondArgs),

    /// Forward on a coupon bond
    Forward(DeliveryArgs),

    /// Future on a coupon bond
    Future(DeliveryArgs),

    /// Option on a coupon bond
    #[command(name = "option")]
    BondOption(BondOptionArgs),

    /// Caplet on the short rate, paid in arrears
    Caplet(OptionletArgs),

    /// Floorlet on the short rate, paid in arrears
    Floorlet(OptionletArgs),

    /// Fixed-for-floating swap
    Swap(SwapArgs),

    /// European swaption
    Swaption(SwaptionArgs),
}

/// Bond parameters.
#[derive(Args, Debug)]
pub struct BondArgs {
    /// Maturity in periods
    #[arg(long)]
    pub maturity: usize,

    /// Annual coupon rate in percent (ignored for zcb)
    #[arg(long, default_value = "0")]
    pub coupon: f64,

    /// Face value
    #[arg(long, default_value = "100")]
    pub face: f64,
}

impl BondArgs {
    fn to_bond(&self) -> CliResult<CouponBond> {
        Ok(CouponBond::new(
            self.face,
            percent_to_decimal("coupon", self.coupon)?,
            self.maturity,
        ))
    }
}

/// Forward and future parameters.
#[derive(Args, Debug)]
pub struct DeliveryArgs {
    #[command(flatten)]
    pub bond: BondArgs,

    /// Delivery date in periods
    #[arg(long)]
    pub delivery: usize,
}

/// Option type choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OptionTypeChoice {
    /// Call
    #[default]
    Call,
    /// Put
    Put,
}

impl From<OptionTypeChoice> for OptionType {
    fn from(choice: OptionTypeChoice) -> Self {
        match choice {
            OptionTypeChoice::Call => OptionType::Call,
            OptionTypeChoice::Put => OptionType::Put,
        }
    }
}

/// Bond option parameters.
#[derive(Args, Debug)]
pub struct BondOptionArgs {
    #[command(flatten)]
    pub bond: BondArgs,

    /// Call or put
    #[arg(long = "type", value_enum, default_value = "call")]
    pub option_type: OptionTypeChoice,

    /// Strike price in face units
    #[arg(long)]
    pub strike: f64,

    /// Expiry in periods
    #[arg(long)]
    pub expiry: usize,

    /// Allow exercise at any step up to expiry
    #[arg(long)]
    pub american: bool,
}

/// Caplet and floorlet parameters.
#[derive(Args, Debug)]
pub struct OptionletArgs {
    /// Payment date in periods; the rate is fixed one period earlier
    #[arg(long)]
    pub maturity: usize,

    /// Strike rate in percent
    #[arg(long)]
    pub strike: f64,

    /// Notional amount
    #[arg(long, default_value = "1")]
    pub notional: f64,
}

/// Swap side choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SideChoice {
    /// Pay fixed
    #[default]
    Payer,
    /// Receive fixed
    Receiver,
}

impl From<SideChoice> for SwapSide {
    fn from(choice: SideChoice) -> Self {
        match choice {
            SideChoice::Payer => SwapSide::Payer,
            SideChoice::Receiver => SwapSide::Receiver,
        }
    }
}

/// Swap parameters.
#[derive(Args, Debug)]
pub struct SwapArgs {
    /// Last payment date in periods
    #[arg(long)]
    pub maturity: usize,

    /// Fixed rate in percent
    #[arg(long)]
    pub fixed_rate: f64,

    /// Notional amount
    #[arg(long, default_value = "1")]
    pub notional: f64,

    /// Payer or receiver
    #[arg(long, value_enum, default_value = "payer")]
    pub side: SideChoice,
}

impl SwapArgs {
    fn to_swap(&self) -> CliResult<Swap> {
        Ok(Swap {
            notional: self.notional,
            fixed_rate: percent_to_decimal("fixed-rate", self.fixed_rate)?,
            maturity: self.maturity,
            side: self.side.into(),
        })
    }
}

/// Swaption parameters.
#[derive(Args, Debug)]
pub struct SwaptionArgs {
    #[command(flatten)]
    pub swap: SwapArgs,

    /// Expiry in periods
    #[arg(long)]
    pub expiry: usize,
}

impl InstrumentCommand {
    /// Builds the instrument descriptor.
    pub fn to_instrument(&self) -> CliResult<Instrument> {
        let instrument = match self {
            Self::Zcb(args) => ZeroCouponBond::new(args.face, args.maturity).into(),
            Self::Bond(args) => args.to_bond()?.into(),
            Self::Forward(args) => BondForward {
                bond: args.bond.to_bond()?,
                delivery: args.delivery,
            }
            .into(),
            Self::Future(args) => BondFuture {
                bond: args.bond.to_bond()?,
                delivery: args.delivery,
            }
            .into(),
            Self::BondOption(args) => BondOption {
                bond: args.bond.to_bond()?,
                option_type: args.option_type.into(),
                strike: args.strike,
                expiry: args.expiry,
                exercise: if args.american {
                    ExerciseStyle::American
                } else {
                    ExerciseStyle::European
                },
            }
            .into(),
            Self::Caplet(args) => Optionlet::caplet(
                args.notional,
                percent_to_decimal("strike", args.strike)?,
                args.maturity,
            )
            .into(),
            Self::Floorlet(args) => Optionlet::floorlet(
                args.notional,
                percent_to_decimal("strike", args.strike)?,
                args.maturity,
            )
            .into(),
            Self::Swap(args) => args.to_swap()?.into(),
            Self::Swaption(args) => Swaption {
                swap: args.swap.to_swap()?,
                expiry: args.expiry,
            }
            .into(),
        };
        Ok(instrument)
    }
}

/// Machine-readable pricing result.
#[derive(Debug, Serialize)]
struct PriceReport<'a> {
    instrument: &'a Instrument,
    model: &'static str,
    steps: usize,
    value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    lattice: Option<&'a ValuationLattice>,
}

/// Builds the pricing model: BDT when market yields are given, binomial
/// otherwise.
fn build_model(
    args: &PriceArgs,
    config: &AppConfig,
    min_steps: usize,
) -> Result<Box<dyn ShortRateModel>> {
    if !args.market.is_present() {
        let params = args.lattice.resolve(&config.tree, min_steps)?;
        return Ok(Box::new(params));
    }

    let horizon = args
        .lattice
        .steps
        .or(config.calibration.horizon)
        .unwrap_or(min_steps);
    let dt = args.lattice.dt.or(config.tree.dt).unwrap_or(DEFAULT_DT);
    let q_up = args.lattice.q_up.or(config.tree.q_up).unwrap_or(DEFAULT_Q_UP);
    let volatility = args
        .lattice
        .volatility
        .or(config.calibration.volatility)
        .unwrap_or(DEFAULT_BDT_VOLATILITY_PCT)
        / 100.0;

    let target = args.market.load()?.to_target(horizon, dt)?;
    let bdt = bdt_config(&config.calibration).with_dt(dt).with_q_up(q_up);
    let calibrator = BdtCalibrator::new(volatility).with_config(bdt);
    let model: Box<dyn ShortRateModel> = Box::new(BdtModel::new(calibrator, target));
    Ok(model)
}

/// Execute the price command.
pub fn execute(args: PriceArgs, config: &AppConfig, output: OutputOptions) -> Result<()> {
    let instrument = args.instrument.to_instrument()?;
    instrument.validate()?;

    let model = build_model(&args, config, instrument.required_steps())?;
    tracing::info!("Pricing {instrument} on a {} tree", model.name());
    let tree = model.build_tree()?;

    let valuation = BackwardInductionValuer::new(&tree)
        .with_lattice(args.show_lattice)
        .value(&instrument)?;

    let value_label = match instrument {
        Instrument::BondForward(_) => "Forward Price",
        Instrument::BondFuture(_) => "Futures Price",
        _ => "Present Value",
    };

    match output.format {
        OutputFormat::Table => {
            output.header("Pricing Results");
            let rows = vec![
                KeyValue::new("Instrument", instrument.kind()),
                KeyValue::new("Model", model.name()),
                KeyValue::new("Steps", tree.steps().to_string()),
                KeyValue::new("dt (years)", tree.dt().to_string()),
                KeyValue::new(value_label, output.number(valuation.present_value)),
            ];
            print_output(&rows, output.format)?;
            if let Some(lattice) = &valuation.lattice {
                output.header("Valuation Lattice");
                print_lattice(lattice.columns(), |v| output.number(v));
            }
        }
        OutputFormat::Json => {
            let report = PriceReport {
                instrument: &instrument,
                model: model.name(),
                steps: tree.steps(),
                value: valuation.present_value,
                lattice: valuation.lattice.as_ref(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Csv => match &valuation.lattice {
            Some(lattice) => print_lattice_csv(lattice.columns())?,
            None => {
                let rows = vec![
                    KeyValue::new("instrument", instrument.kind()),
                    KeyValue::new("model", model.name()),
                    KeyValue::new("steps", tree.steps().to_string()),
                    KeyValue::new("value", valuation.present_value.to_string()),
                ];
                print_output(&rows, output.format)?;
            }
        },
        OutputFormat::Minimal => println!("{}", output.number(valuation.present_value)),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bond_args() -> BondArgs {
        BondArgs {
            maturity: 5,
            coupon: 4.0,
            face: 100.0,
        }
    }

    fn bdt_args(lattice: LatticeArgs) -> PriceArgs {
        PriceArgs {
            instrument: InstrumentCommand::Bond(bond_args()),
            lattice,
            market: MarketArgs {
                rates: Some("1:4,2:4.2,3:4.4,5:4.6".to_string()),
                ..MarketArgs::default()
            },
            show_lattice: false,
        }
    }

    #[test]
    fn test_bdt_tree_uses_q_up_flag() {
        let args = bdt_args(LatticeArgs {
            q_up: Some(0.3),
            ..LatticeArgs::default()
        });
        let tree = build_model(&args, &AppConfig::default(), 5)
            .unwrap()
            .build_tree()
            .unwrap();
        assert!((tree.q_up() - 0.3).abs() < 1e-15);
    }

    #[test]
    fn test_bdt_tree_uses_q_up_from_config() {
        let mut config = AppConfig::default();
        config.tree.q_up = Some(0.4);
        let tree = build_model(&bdt_args(LatticeArgs::default()), &config, 5)
            .unwrap()
            .build_tree()
            .unwrap();
        assert!((tree.q_up() - 0.4).abs() < 1e-15);
    }

    #[test]
    fn test_bdt_steps_flag_is_not_raised() {
        let args = bdt_args(LatticeArgs {
            steps: Some(3),
            ..LatticeArgs::default()
        });
        let tree = build_model(&args, &AppConfig::default(), 5)
            .unwrap()
            .build_tree()
            .unwrap();
        assert_eq!(tree.steps(), 3);

        let tree = build_model(&bdt_args(LatticeArgs::default()), &AppConfig::default(), 5)
            .unwrap()
            .build_tree()
            .unwrap();
        assert_eq!(tree.steps(), 5);
    }

    #[test]
    fn test_bond_coupon_is_converted_from_percent() {
        let bond = bond_args().to_bond().unwrap();
        assert!((bond.coupon_rate - 0.04).abs() < 1e-15);
    }

    #[test]
    fn test_zcb_ignores_coupon() {
        let instrument = InstrumentCommand::Zcb(bond_args()).to_instrument().unwrap();
        assert!(matches!(instrument, Instrument::ZeroCouponBond(ZeroCouponBond { maturity: 5, .. })));
    }

    #[test]
    fn test_american_flag() {
        let command = InstrumentCommand::BondOption(BondOptionArgs {
            bond: bond_args(),
            option_type: OptionTypeChoice::Put,
            strike: 98.0,
            expiry: 2,
            american: true,
        });
        match command.to_instrument().unwrap() {
            Instrument::BondOption(option) => {
                assert_eq!(option.exercise, ExerciseStyle::American);
                assert_eq!(option.option_type, OptionType::Put);
            }
            other => panic!("unexpected instrument {other:?}"),
        }
    }

    #[test]
    fn test_swaption_rates_in_percent() {
        let command = InstrumentCommand::Swaption(SwaptionArgs {
            swap: SwapArgs {
                maturity: 6,
                fixed_rate: 5.0,
                notional: 1.0,
                side: SideChoice::Receiver,
            },
            expiry: 2,
        });
        match command.to_instrument().unwrap() {
            Instrument::Swaption(swaption) => {
                assert!((swaption.swap.fixed_rate - 0.05).abs() < 1e-15);
                assert_eq!(swaption.swap.side, SwapSide::Receiver);
            }
            other => panic!("unexpected instrument {other:?}"),
        }
    }
}
