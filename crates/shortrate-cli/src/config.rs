//! Optional TOML configuration file.
//!
//! Every value is optional. Command-line flags take precedence over the file,
//! and anything left unset falls back to the built-in defaults. Rates and
//! volatilities are in percent, as on the command line.
//!
//! ```toml
//! [tree]
//! rate = 5.0
//! model = "lognormal"
//! volatility = 10.0
//! steps = 10
//!
//! [calibration]
//! volatility = 0.25
//! solver = "brent"
//! tolerance = 1e-12
//! bounds = [1e-10, 1.0]
//! horizon = 30
//! face = 100.0
//!
//! [output]
//! format = "table"
//! precision = 6
//! ```

use std::path::Path;

use serde::Deserialize;
use shortrate_math::solvers::SolverMethod;

use crate::cli::OutputFormat;
use crate::commands::ModelChoice;
use crate::error::{CliError, CliResult};

/// Settings loaded from `--config`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Binomial tree defaults.
    pub tree: TreeSection,
    /// BDT calibration defaults.
    pub calibration: CalibrationSection,
    /// Output defaults.
    pub output: OutputSection,
}

/// `[tree]` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TreeSection {
    pub rate: Option<f64>,
    pub model: Option<ModelChoice>,
    pub volatility: Option<f64>,
    pub up: Option<f64>,
    pub down: Option<f64>,
    pub q_up: Option<f64>,
    pub dt: Option<f64>,
    pub steps: Option<usize>,
}

/// `[calibration]` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalibrationSection {
    pub volatility: Option<f64>,
    pub solver: Option<SolverMethod>,
    pub tolerance: Option<f64>,
    pub max_iterations: Option<u32>,
    pub bounds: Option<(f64, f64)>,
    pub horizon: Option<usize>,
    pub face: Option<f64>,
}

/// `[output]` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    pub format: Option<OutputFormat>,
    pub precision: Option<usize>,
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
            .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Loads `path` if given, otherwise returns the defaults.
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => {
                tracing::info!("Loading configuration from {}", path.display());
                Self::from_file(path)
            }
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_full_config() {
        let config = AppConfig::from_toml(
            r#"
            [tree]
            rate = 6.0
            model = "factors"
            up = 1.25
            down = 0.9
            steps = 10

            [calibration]
            volatility = 0.25
            solver = "newton"
            bounds = [1e-8, 0.5]
            horizon = 20

            [output]
            format = "json"
            precision = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.tree.model, Some(ModelChoice::Factors));
        assert_eq!(config.tree.steps, Some(10));
        assert_eq!(config.calibration.solver, Some(SolverMethod::Newton));
        assert_eq!(config.calibration.bounds, Some((1e-8, 0.5)));
        assert_eq!(config.output.format, Some(OutputFormat::Json));
        assert_eq!(config.output.precision, Some(4));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(AppConfig::from_toml("[tree]\nsigma = 0.1\n").is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = AppConfig::from_file(Path::new("/nonexistent/shortrate.toml"));
        assert!(matches!(result, Err(CliError::Io(_))));
    }
}
