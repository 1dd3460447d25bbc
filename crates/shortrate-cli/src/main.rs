//! Shortrate CLI - binomial short-rate lattices from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Print a 3-step lognormal tree, r0 = 5%, σ = 10%
//! shortrate tree --rate 5 --volatility 10 --steps 3
//!
//! # Price a 10-period 4% bond on a binomial tree
//! shortrate price bond --coupon 4 --maturity 10 --rate 5 --volatility 10
//!
//! # Price an American put on a BDT tree calibrated to market yields
//! shortrate price option --type put --american --strike 98 --expiry 3 \
//!     --coupon 4 --maturity 10 --rates 1:3.59,2:3.50,5:3.60,10:4.02
//!
//! # Calibrate BDT and show the repricing table
//! shortrate calibrate --rates-file treasury.csv --volatility 0.25 --horizon 30
//! ```

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod commands;
mod config;
mod error;
mod output;

use cli::{Cli, Commands};
use config::AppConfig;
use output::OutputOptions;

/// Installs the stderr log subscriber.
///
/// `-v` flags win over `RUST_LOG`; without either only warnings are shown.
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = match (quiet, verbose) {
        (true, _) => EnvFilter::new("error"),
        (false, 0) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        (false, 1) => EnvFilter::new("info"),
        (false, 2) => EnvFilter::new("debug"),
        (false, _) => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let config = AppConfig::load(cli.config.as_deref())?;
    let output = OutputOptions::resolve(cli.format, cli.quiet, &config);

    // Execute command
    match cli.command {
        Commands::Price(args) => commands::price::execute(args, &config, output)?,
        Commands::Calibrate(args) => commands::calibrate::execute(args, &config, output)?,
        Commands::Tree(args) => commands::tree::execute(args, &config, output)?,
    }

    Ok(())
}
