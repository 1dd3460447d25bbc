//! Bisection root-finding algorithm.

use crate::error::{MathError, MathResult};
use crate::solvers::{checked_bracket, SolverConfig, SolverResult};

/// Bisection root-finding algorithm.
///
/// Halves `[a, b]` until the residual or the half-width drops below
/// `config.tolerance`. Slow, but it cannot leave the bracket.
///
/// # Example
///
/// ```rust
/// use shortrate_math::solvers::{bisection, SolverConfig};
///
/// let f = |x: f64| x * x - 2.0;
/// let result = bisection(f, 1.0, 2.0, &SolverConfig::default()).unwrap();
/// assert!((result.root - std::f64::consts::SQRT_2).abs() < 1e-10);
/// ```
pub fn bisection<F>(f: F, a: f64, b: f64, config: &SolverConfig) -> MathResult<SolverResult>
where
    F: Fn(f64) -> f64,
{
    let (mut lo, mut hi, mut f_lo, f_hi) = checked_bracket(&f, a, b)?;

    if f_lo.abs() < config.tolerance {
        return Ok(SolverResult {
            root: lo,
            iterations: 0,
            residual: f_lo,
        });
    }
    if f_hi.abs() < config.tolerance {
        return Ok(SolverResult {
            root: hi,
            iterations: 0,
            residual: f_hi,
        });
    }

    let mut mid = lo;
    let mut f_mid = f_lo;

    for iteration in 1..=config.max_iterations {
        mid = 0.5 * (lo + hi);
        f_mid = f(mid);

        if f_mid.abs() < config.tolerance || 0.5 * (hi - lo) < config.tolerance {
            return Ok(SolverResult {
                root: mid,
                iterations: iteration,
                residual: f_mid,
            });
        }

        if f_lo * f_mid < 0.0 {
            hi = mid;
        } else {
            lo = mid;
            f_lo = f_mid;
        }
    }

    log::debug!(
        "bisection exhausted {} iterations at x = {mid}",
        config.max_iterations
    );
    Err(MathError::convergence_failed(
        config.max_iterations,
        f_mid.abs(),
    ))
}
