//! Brent's root-finding algorithm.

use crate::error::{MathError, MathResult};
use crate::solvers::{checked_bracket, SolverConfig, SolverResult};

/// Brent's root-finding algorithm.
///
/// Keeps a bracket `[b, c]` around the root and takes inverse quadratic or
/// secant steps from the best point `b`, falling back to bisection whenever
/// the interpolated step would not shrink the bracket fast enough.
///
/// Converges when `|f(b)| < tolerance` or the bracket half-width is within
/// `tolerance / 2` (plus a relative machine-epsilon term).
///
/// # Example
///
/// ```rust
/// use shortrate_math::solvers::{brent, SolverConfig};
///
/// let f = |x: f64| x * x * x - x - 2.0;
/// let result = brent(f, 1.0, 2.0, &SolverConfig::default()).unwrap();
/// assert!(f(result.root).abs() < 1e-10);
/// ```
pub fn brent<F>(f: F, a: f64, b: f64, config: &SolverConfig) -> MathResult<SolverResult>
where
    F: Fn(f64) -> f64,
{
    let (lo, hi, f_lo, f_hi) = checked_bracket(&f, a, b)?;

    let (mut a, mut b) = (lo, hi);
    let (mut fa, mut fb) = (f_lo, f_hi);
    let mut c = b;
    let mut fc = fb;
    let mut d = b - a;
    let mut e = d;

    for iteration in 0..config.max_iterations {
        // Re-establish a bracket [b, c] after the last step.
        if fb * fc > 0.0 {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        // b is always the better of the two bracket ends.
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol = 2.0 * f64::EPSILON * b.abs() + 0.5 * config.tolerance;
        let half_width = 0.5 * (c - b);

        if half_width.abs() <= tol || fb.abs() < config.tolerance {
            return Ok(SolverResult {
                root: b,
                iterations: iteration,
                residual: fb,
            });
        }

        if e.abs() >= tol && fa.abs() > fb.abs() {
            let s = fb / fa;
            let (mut p, mut q) = if a == c {
                // Secant
                (2.0 * half_width * s, 1.0 - s)
            } else {
                // Inverse quadratic interpolation
                let qa = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * half_width * qa * (qa - r) - (b - a) * (r - 1.0)),
                    (qa - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            }
            p = p.abs();

            let limit_interp = 3.0 * half_width * q - (tol * q).abs();
            let limit_prev = (e * q).abs();
            if 2.0 * p < limit_interp.min(limit_prev) {
                e = d;
                d = p / q;
            } else {
                d = half_width;
                e = d;
            }
        } else {
            d = half_width;
            e = d;
        }

        a = b;
        fa = fb;
        if d.abs() > tol {
            b += d;
        } else {
            b += tol.copysign(half_width);
        }
        fb = f(b);
    }

    log::debug!(
        "brent exhausted {} iterations at x = {b}",
        config.max_iterations
    );
    Err(MathError::convergence_failed(
        config.max_iterations,
        fb.abs(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cubic() {
        let f = |x: f64| x * x * x - x - 2.0;
        let result = brent(f, 1.0, 2.0, &SolverConfig::default()).unwrap();
        assert!(f(result.root).abs() < 1e-10);
    }

    #[test]
    fn test_sqrt_2() {
        let f = |x: f64| x * x - 2.0;
        let result = brent(f, 0.0, 2.0, &SolverConfig::default()).unwrap();
        assert_relative_eq!(result.root, std::f64::consts::SQRT_2, epsilon = 1e-10);
    }

    #[test]
    fn test_faster_than_bisection() {
        let f = |x: f64| (x - 0.037).exp() - 1.0;
        let config = SolverConfig::default();

        let brent_result = brent(f, 0.0, 1.0, &config).unwrap();
        let bisection_result = crate::solvers::bisection(f, 0.0, 1.0, &config).unwrap();

        assert_relative_eq!(brent_result.root, 0.037, epsilon = 1e-10);
        assert!(brent_result.iterations < bisection_result.iterations);
    }

    #[test]
    fn test_invalid_bracket() {
        let f = |x: f64| x * x + 1.0;
        let result = brent(f, -1.0, 1.0, &SolverConfig::default());
        assert!(matches!(result, Err(MathError::InvalidBracket { .. })));
    }

    #[test]
    fn test_steep_discount_function() {
        // Sum of state prices discounted at a level a: 0.5 / (1 + a) + 0.5 / (1 + 1.2a)
        let target = 0.93;
        let f = |a: f64| 0.5 / (1.0 + a) + 0.5 / (1.0 + 1.2 * a) - target;
        let result = brent(f, 1e-10, 1.0, &SolverConfig::default()).unwrap();
        assert!(f(result.root).abs() < 1e-12);
    }

    #[test]
    fn test_root_at_bracket_end() {
        let f = |x: f64| x - 2.0;
        let result = brent(f, 0.0, 2.0, &SolverConfig::default()).unwrap();
        assert_relative_eq!(result.root, 2.0, epsilon = 1e-12);
    }
}
