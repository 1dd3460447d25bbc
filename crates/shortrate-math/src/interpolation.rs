//! Linear interpolation.

use crate::error::{MathError, MathResult};

/// Linear interpolation between data points.
///
/// Connects consecutive points with straight lines. Outside the data range
/// it either fails or, with [`with_flat_extrapolation`], holds the nearest
/// end value.
///
/// [`with_flat_extrapolation`]: LinearInterpolator::with_flat_extrapolation
///
/// # Example
///
/// ```rust
/// use shortrate_math::interpolation::LinearInterpolator;
///
/// // 1y, 2y, 5y yields; the 3y and 4y points are interpolated.
/// let interp = LinearInterpolator::new(vec![1.0, 2.0, 5.0], vec![0.040, 0.043, 0.049]).unwrap();
/// let y3 = interp.interpolate(3.0).unwrap();
/// assert!((y3 - 0.045).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct LinearInterpolator {
    xs: Vec<f64>,
    ys: Vec<f64>,
    flat_extrapolation: bool,
}

impl LinearInterpolator {
    /// Creates a new linear interpolator.
    ///
    /// `xs` must be strictly increasing, finite, and at least one point long.
    /// A single point interpolates to a constant.
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> MathResult<Self> {
        if xs.is_empty() {
            return Err(MathError::insufficient_data(1, 0));
        }
        if xs.len() != ys.len() {
            return Err(MathError::invalid_input(format!(
                "xs and ys must have same length: {} vs {}",
                xs.len(),
                ys.len()
            )));
        }
        if xs.iter().chain(ys.iter()).any(|v| !v.is_finite()) {
            return Err(MathError::invalid_input("data points must be finite"));
        }
        if xs.windows(2).any(|w| w[1] <= w[0]) {
            return Err(MathError::invalid_input(
                "x values must be strictly increasing",
            ));
        }

        Ok(Self {
            xs,
            ys,
            flat_extrapolation: false,
        })
    }

    /// Holds the first/last value outside the data range.
    #[must_use]
    pub fn with_flat_extrapolation(mut self) -> Self {
        self.flat_extrapolation = true;
        self
    }

    /// Returns the interpolated value at `x`.
    pub fn interpolate(&self, x: f64) -> MathResult<f64> {
        let n = self.xs.len();
        let (min, max) = (self.xs[0], self.xs[n - 1]);

        if x < min || x > max {
            if !self.flat_extrapolation {
                return Err(MathError::ExtrapolationNotAllowed { x, min, max });
            }
            return Ok(if x < min { self.ys[0] } else { self.ys[n - 1] });
        }
        if n == 1 {
            return Ok(self.ys[0]);
        }

        // Index of the first knot strictly greater than x, clamped to a segment.
        let upper = self.xs.partition_point(|&knot| knot <= x).clamp(1, n - 1);
        let (x0, x1) = (self.xs[upper - 1], self.xs[upper]);
        let (y0, y1) = (self.ys[upper - 1], self.ys[upper]);
        let weight = (x - x0) / (x1 - x0);
        Ok(y0 + weight * (y1 - y0))
    }

    /// Returns the x coordinates.
    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    /// Returns the y coordinates.
    pub fn ys(&self) -> &[f64] {
        &self.ys
    }
}
