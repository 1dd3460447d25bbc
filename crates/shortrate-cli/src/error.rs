//! CLI error types.

use shortrate_trees::TreeError;
use thiserror::Error;

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Malformed inline rate ladder.
    #[error("Invalid rate point: {0}. Use MATURITY:RATE, e.g. 1:4.1,2:4.0")]
    InvalidRatePoint(String),

    /// Neither inline rates nor a rates file were given.
    #[error("Missing market data: pass --rates or --rates-file")]
    MissingMarketData,

    /// Invalid command-line argument.
    #[error("Invalid argument {name}: {reason}")]
    InvalidArgument {
        /// Flag name.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model construction, calibration or pricing error.
    #[error(transparent)]
    Model(#[from] TreeError),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }
}

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;
