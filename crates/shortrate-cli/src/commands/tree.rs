//! Tree command implementation.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use shortrate_trees::model::ShortRateModel;

use crate::cli::OutputFormat;
use crate::commands::LatticeArgs;
use crate::config::AppConfig;
use crate::output::{print_lattice, print_lattice_csv, print_output, KeyValue, OutputOptions};

/// Arguments for the tree command.
#[derive(Args, Debug)]
pub struct TreeArgs {
    #[command(flatten)]
    pub lattice: LatticeArgs,

    /// Also print state prices and the implied zero-coupon curve
    #[arg(long)]
    pub state_prices: bool,
}

/// One maturity of the implied curve.
#[derive(Debug, Clone, Serialize, Tabled)]
struct CurveRow {
    #[tabled(rename = "Maturity")]
    maturity: usize,
    #[tabled(rename = "ZCB Price")]
    zcb_price: String,
    #[tabled(rename = "Spot Rate")]
    spot_rate: String,
}

/// Machine-readable tree.
#[derive(Debug, Serialize)]
struct TreeOutput<'a> {
    model: &'static str,
    steps: usize,
    dt: f64,
    q_up: f64,
    rates: &'a [Vec<f64>],
    #[serde(skip_serializing_if = "Option::is_none")]
    state_prices: Option<&'a [Vec<f64>]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    zcb_prices: Option<Vec<f64>>,
}

/// Execute the tree command.
pub fn execute(args: TreeArgs, config: &AppConfig, output: OutputOptions) -> Result<()> {
    let params = args.lattice.resolve(&config.tree, 0)?;
    let tree = params.build_tree()?;
    tracing::info!("Built {}-step {} tree", tree.steps(), params.name());

    let state_prices = args.state_prices.then(|| tree.state_prices());

    match output.format {
        OutputFormat::Table => {
            output.header("Rate Tree");
            let summary = vec![
                KeyValue::new("Model", params.name()),
                KeyValue::new("Steps", tree.steps().to_string()),
                KeyValue::new("dt (years)", tree.dt().to_string()),
                KeyValue::new("q (up)", tree.q_up().to_string()),
                KeyValue::new("Root Rate", output.percent(tree.rate_at(0, 0))),
            ];
            print_output(&summary, output.format)?;
            print_lattice(tree.columns(), |r| output.percent(r));

            if let Some(lattice) = &state_prices {
                output.header("State Prices");
                print_lattice(lattice.columns(), |q| output.number(q));

                output.header("Implied Curve");
                let rows: Vec<CurveRow> = lattice
                    .zcb_prices()
                    .iter()
                    .zip(lattice.spot_rates(tree.dt()))
                    .enumerate()
                    .map(|(k, (&price, spot))| CurveRow {
                        maturity: k + 1,
                        zcb_price: output.number(price),
                        spot_rate: output.percent(spot),
                    })
                    .collect();
                print_output(&rows, output.format)?;
            }
        }
        OutputFormat::Json => {
            let report = TreeOutput {
                model: params.name(),
                steps: tree.steps(),
                dt: tree.dt(),
                q_up: tree.q_up(),
                rates: tree.columns(),
                state_prices: state_prices.as_ref().map(|l| l.columns()),
                zcb_prices: state_prices.as_ref().map(|l| l.zcb_prices()),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Csv => match &state_prices {
            Some(lattice) => print_lattice_csv(lattice.columns())?,
            None => print_lattice_csv(tree.columns())?,
        },
        OutputFormat::Minimal => println!("{}", output.number(tree.rate_at(0, 0))),
    }

    Ok(())
}
