//! Newton-Raphson with a bisection safeguard.

use crate::error::{MathError, MathResult};
use crate::solvers::{checked_bracket, SolverConfig, SolverResult};

/// Newton-Raphson iteration confined to a bracket.
///
/// Takes the step `x - f(x) / f'(x)` whenever it lands strictly inside the
/// current bracket and the derivative is usable, and bisects otherwise. The
/// bracket is narrowed with the sign of every new evaluation, so the method
/// never diverges.
///
/// # Arguments
///
/// * `f` - The function for which to find a root
/// * `df` - Its derivative
/// * `a`, `b` - Bracket with `f(a) * f(b) <= 0`
/// * `initial_guess` - Starting point; the bracket midpoint when `None`
/// * `config` - Solver configuration
///
/// # Example
///
/// ```rust
/// use shortrate_math::solvers::{newton_bracketed, SolverConfig};
///
/// let f = |x: f64| x * x - 2.0;
/// let df = |x: f64| 2.0 * x;
/// let result = newton_bracketed(f, df, 0.0, 2.0, Some(1.5), &SolverConfig::default()).unwrap();
/// assert!((result.root - std::f64::consts::SQRT_2).abs() < 1e-10);
/// ```
pub fn newton_bracketed<F, DF>(
    f: F,
    df: DF,
    a: f64,
    b: f64,
    initial_guess: Option<f64>,
    config: &SolverConfig,
) -> MathResult<SolverResult>
where
    F: Fn(f64) -> f64,
    DF: Fn(f64) -> f64,
{
    let (mut lo, mut hi, f_lo, f_hi) = checked_bracket(&f, a, b)?;

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

    // Orientation: true when f increases from lo to hi.
    let increasing = f_lo < 0.0;

    let mut x = match initial_guess {
        Some(guess) if guess > lo && guess < hi => guess,
        _ => 0.5 * (lo + hi),
    };
    let mut fx = f(x);

    for iteration in 1..=config.max_iterations {
        if fx.abs() < config.tolerance {
            return Ok(SolverResult {
                root: x,
                iterations: iteration - 1,
                residual: fx,
            });
        }

        if (fx < 0.0) == increasing {
            lo = x;
        } else {
            hi = x;
        }

        let dfx = df(x);
        let newton = if dfx.abs() > f64::MIN_POSITIVE && dfx.is_finite() {
            Some(x - fx / dfx)
        } else {
            None
        };

        let next = match newton {
            Some(candidate) if candidate > lo && candidate < hi => candidate,
            _ => 0.5 * (lo + hi),
        };

        let step = next - x;
        x = next;
        fx = f(x);

        if step.abs() < config.tolerance || (hi - lo) < config.tolerance {
            return Ok(SolverResult {
                root: x,
                iterations: iteration,
                residual: fx,
            });
        }
    }

    if fx.abs() < config.tolerance {
        return Ok(SolverResult {
            root: x,
            iterations: config.max_iterations,
            residual: fx,
        });
    }
    log::debug!(
        "bracketed newton exhausted {} iterations at x = {x}",
        config.max_iterations
    );
    Err(MathError::convergence_failed(
        config.max_iterations,
        fx.abs(),
    ))
}
