//! Error types for tree construction, calibration and valuation.

use shortrate_math::MathError;
use thiserror::Error;

/// A specialized Result type for lattice operations.
pub type TreeResult<T> = Result<T, TreeError>;

/// Errors that can occur while building, calibrating or walking a tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    /// Malformed tree-construction or instrument input.
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Offending parameter.
        name: &'static str,
        /// Description of what's invalid.
        reason: String,
    },

    /// A calibration step could not match its target price.
    #[error("Calibration failed at maturity {maturity}: {reason}")]
    CalibrationFailure {
        /// Maturity (in periods) of the zero-coupon bond being matched.
        maturity: usize,
        /// Description of the failure.
        reason: String,
    },

    /// The instrument needs more periods than the tree covers.
    #[error("Shape mismatch: instrument needs {required} periods, tree covers {available}")]
    ShapeMismatch {
        /// Periods the instrument needs.
        required: usize,
        /// Periods the tree covers.
        available: usize,
    },

    /// Numerical routine error.
    #[error("Math error: {0}")]
    Math(#[from] MathError),
}

impl TreeError {
    /// Creates an invalid parameter error.
    #[must_use]
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Creates a calibration failure error.
    #[must_use]
    pub fn calibration_failure(maturity: usize, reason: impl Into<String>) -> Self {
        Self::CalibrationFailure {
            maturity,
            reason: reason.into(),
        }
    }

    /// Creates a shape mismatch error.
    #[must_use]
    pub fn shape_mismatch(required: usize, available: usize) -> Self {
        Self::ShapeMismatch {
            required,
            available,
        }
    }
}

/// Fails with [`TreeError::InvalidParameter`] unless `value` is finite.
pub(crate) fn ensure_finite(name: &'static str, value: f64) -> TreeResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(TreeError::invalid_parameter(
            name,
            format!("must be finite, got {value}"),
        ))
    }
}

/// Fails with [`TreeError::InvalidParameter`] unless `value` is finite and > 0.
pub(crate) fn ensure_positive(name: &'static str, value: f64) -> TreeResult<()> {
    ensure_finite(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(TreeError::invalid_parameter(
            name,
            format!("must be positive, got {value}"),
        ))
    }
}

/// Fails with [`TreeError::InvalidParameter`] unless `value` is finite and >= 0.
pub(crate) fn ensure_non_negative(name: &'static str, value: f64) -> TreeResult<()> {
    ensure_finite(name, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(TreeError::invalid_parameter(
            name,
            format!("must not be negative, got {value}"),
        ))
    }
}

/// Fails unless `q_up` is a proper probability strictly inside (0, 1).
pub(crate) fn ensure_probability(name: &'static str, q_up: f64) -> TreeResult<()> {
    if q_up.is_finite() && q_up > 0.0 && q_up < 1.0 {
        Ok(())
    } else {
        Err(TreeError::invalid_parameter(
            name,
            format!("must lie strictly between 0 and 1, got {q_up}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TreeError::invalid_parameter("volatility", "must be positive, got 0");
        assert_eq!(
            err.to_string(),
            "Invalid parameter volatility: must be positive, got 0"
        );

        let err = TreeError::shape_mismatch(10, 5);
        assert!(err.to_string().contains("needs 10 periods"));

        let err = TreeError::calibration_failure(7, "no sign change");
        assert!(err.to_string().contains("maturity 7"));
    }

    #[test]
    fn test_from_math_error() {
        let err: TreeError = MathError::insufficient_data(1, 0).into();
        assert!(matches!(err, TreeError::Math(_)));
    }

    #[test]
    fn test_guards() {
        assert!(ensure_positive("x", 1.0).is_ok());
        assert!(ensure_positive("x", 0.0).is_err());
        assert!(ensure_non_negative("x", 0.0).is_ok());
        assert!(ensure_non_negative("x", -1e-9).is_err());
        assert!(ensure_finite("x", f64::INFINITY).is_err());
        assert!(ensure_probability("q_up", 0.5).is_ok());
        assert!(ensure_probability("q_up", 1.0).is_err());
        assert!(ensure_probability("q_up", f64::NAN).is_err());
    }
}
