//! # Shortrate Math
//!
//! Numerical building blocks for the Shortrate lattice library.
//!
//! This crate provides:
//!
//! - **Solvers**: Bracketed 1-D root finders (Bisection, Brent, safeguarded Newton)
//! - **Interpolation**: Piecewise-linear interpolation over a maturity ladder
//!
//! Everything works on `f64`. Lattice calibration calls a root finder once
//! per time step, so the solvers never allocate.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::uninlined_format_args)]

pub mod error;
pub mod interpolation;
pub mod solvers;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{MathError, MathResult};
    pub use crate::interpolation::LinearInterpolator;
    pub use crate::solvers::{
        bisection, brent, newton_bracketed, SolverConfig, SolverMethod, SolverResult,
    };
}

pub use error::{MathError, MathResult};
