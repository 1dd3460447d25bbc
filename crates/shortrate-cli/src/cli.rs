//! CLI argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::Deserialize;

use crate::commands::{CalibrateArgs, PriceArgs, TreeArgs};

/// Shortrate - binomial short-rate lattices for fixed income pricing
#[derive(Parser)]
#[command(name = "shortrate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format [default: table]
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// TOML configuration file with [tree], [calibration] and [output] sections
    #[arg(short, long, global = true, env = "SHORTRATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Price an instrument by backward induction on a rate tree
    Price(PriceArgs),

    /// Calibrate a Black-Derman-Toy tree to market yields
    Calibrate(CalibrateArgs),

    /// Build and display a binomial rate tree
    Tree(TreeArgs),
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
    /// Minimal output (just the value)
    Minimal,
}
