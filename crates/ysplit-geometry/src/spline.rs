//! Cubic spline interpolation for splitter edge curves.
//!
//! Each splitter edge is a smooth curve through a handful of control knots.
//! The spline stores the second derivative $M_i$ at every knot; between knots
//! $x_i$ and $x_{i+1}$ the curve is
//!
//! $$y(x) = a\,y_i + b\,y_{i+1} + \frac{(a^3 - a) M_i + (b^3 - b) M_{i+1}}{6} h^2$$
//!
//! with $h = x_{i+1} - x_i$, $a = (x_{i+1} - x)/h$ and $b = 1 - a$. The
//! boundary condition only changes the first and last rows of the linear
//! system for $M$.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Minimum number of data points for a cubic interpolant.
pub const MIN_SPLINE_POINTS: usize = 4;

/// End condition closing the spline's linear system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplineBoundary {
    /// Third derivative continuous across the second and second-to-last
    /// knots. Reproduces any cubic exactly.
    #[default]
    NotAKnot,
    /// Zero second derivative at both ends.
    Natural,
}

/// A cubic spline interpolator for real-valued data.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    /// Sorted x values (knots).
    xs: Vec<f64>,
    /// Corresponding y values.
    ys: Vec<f64>,
    /// Second derivatives at each knot (computed during construction).
    y2s: Vec<f64>,
}

impl CubicSpline {
    /// Construct a cubic spline from data points.
    ///
    /// # Arguments
    /// * `xs` - Strictly increasing, finite x values (at least 4).
    /// * `ys` - Corresponding y values (same length as `xs`).
    /// * `boundary` - End condition.
    ///
    /// # Errors
    /// [`GeometryError::LengthMismatch`] if the lengths differ,
    /// [`GeometryError::InvalidDomain`] if there are too few points or `xs`
    /// is not strictly increasing.
    pub fn new(
        xs: Vec<f64>,
        ys: Vec<f64>,
        boundary: SplineBoundary,
    ) -> Result<Self, GeometryError> {
        if xs.len() != ys.len() {
            return Err(GeometryError::LengthMismatch {
                expected: xs.len(),
                actual: ys.len(),
            });
        }
        if xs.len() < MIN_SPLINE_POINTS {
            return Err(GeometryError::InvalidDomain(format!(
                "cubic spline needs at least {} points, got {}",
                MIN_SPLINE_POINTS,
                xs.len()
            )));
        }
        check_strictly_increasing(&xs)?;

        let y2s = solve_second_derivatives(&xs, &ys, boundary)?;
        Ok(Self { xs, ys, y2s })
    }

    /// Interval `[x_first, x_last]` covered by the knots.
    pub fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    /// Evaluate the spline at a given x value.
    ///
    /// Extrapolation beyond the data range uses the boundary polynomial.
    pub fn evaluate(&self, x: f64) -> f64 {
        let (lo, hi) = self.interval(x);
        let h = self.xs[hi] - self.xs[lo];
        let a = (self.xs[hi] - x) / h;
        let b = (x - self.xs[lo]) / h;

        a * self.ys[lo]
            + b * self.ys[hi]
            + ((a * a * a - a) * self.y2s[lo] + (b * b * b - b) * self.y2s[hi]) * h * h / 6.0
    }

    /// Indices of the knots enclosing `x`, clamped to the first or last
    /// interval outside the domain.
    fn interval(&self, x: f64) -> (usize, usize) {
        let mut lo = 0;
        let mut hi = self.xs.len() - 1;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self.xs[mid] > x {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        (lo, hi)
    }
}

fn check_strictly_increasing(xs: &[f64]) -> Result<(), GeometryError> {
    if let Some(i) = xs.iter().position(|x| !x.is_finite()) {
        return Err(GeometryError::InvalidDomain(format!(
            "knot {} is not finite ({})",
            i, xs[i]
        )));
    }
    for i in 1..xs.len() {
        if xs[i] <= xs[i - 1] {
            return Err(GeometryError::InvalidDomain(format!(
                "knots must be strictly increasing: x[{}] = {:e} <= x[{}] = {:e}",
                i,
                xs[i],
                i - 1,
                xs[i - 1]
            )));
        }
    }
    Ok(())
}

/// Assemble and solve the $n \times n$ system for the knot second derivatives.
///
/// Interior rows are the usual continuity equations
/// $h_{i-1} M_{i-1} + 2(h_{i-1} + h_i) M_i + h_i M_{i+1} = 6(s_i - s_{i-1})$.
fn solve_second_derivatives(
    xs: &[f64],
    ys: &[f64],
    boundary: SplineBoundary,
) -> Result<Vec<f64>, GeometryError> {
    let n = xs.len();
    let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
    let slope: Vec<f64> = (0..n - 1).map(|i| (ys[i + 1] - ys[i]) / h[i]).collect();

    let mut a = DMatrix::<f64>::zeros(n, n);
    let mut rhs = DVector::<f64>::zeros(n);

    for i in 1..n - 1 {
        a[(i, i - 1)] = h[i - 1];
        a[(i, i)] = 2.0 * (h[i - 1] + h[i]);
        a[(i, i + 1)] = h[i];
        rhs[i] = 6.0 * (slope[i] - slope[i - 1]);
    }

    match boundary {
        SplineBoundary::Natural => {
            a[(0, 0)] = 1.0;
            a[(n - 1, n - 1)] = 1.0;
        }
        SplineBoundary::NotAKnot => {
            // (M1 - M0) / h0 = (M2 - M1) / h1, and the mirror at the far end.
            a[(0, 0)] = h[1];
            a[(0, 1)] = -(h[0] + h[1]);
            a[(0, 2)] = h[0];

            let (p, q) = (h[n - 3], h[n - 2]);
            a[(n - 1, n - 3)] = q;
            a[(n - 1, n - 2)] = -(p + q);
            a[(n - 1, n - 1)] = p;
        }
    }

    let solution = a.lu().solve(&rhs).ok_or_else(|| {
        GeometryError::InvalidDomain("spline system is singular".into())
    })?;
    Ok(solution.iter().copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_spline_passes_through_data_points() {
        let xs = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = vec![2.0, 3.0, 5.0, 4.0, 1.0];
        for boundary in [SplineBoundary::NotAKnot, SplineBoundary::Natural] {
            let spline = CubicSpline::new(xs.clone(), ys.clone(), boundary).unwrap();

            for (x, y) in xs.iter().zip(ys.iter()) {
                let result = spline.evaluate(*x);
                assert!(
                    (result - y).abs() < 1e-10,
                    "Spline({}) = {} but expected {}",
                    x,
                    result,
                    y
                );
            }
        }
    }

    #[test]
    fn test_not_a_knot_reproduces_cubic() {
        let f = |x: f64| 0.5 * x * x * x - 2.0 * x * x + x - 3.0;
        let xs = vec![-1.0, -0.2, 0.5, 1.7, 2.0, 3.1];
        let ys: Vec<f64> = xs.iter().map(|&x| f(x)).collect();
        let spline = CubicSpline::new(xs, ys, SplineBoundary::NotAKnot).unwrap();

        for i in 0..=40 {
            let x = -1.0 + 4.1 * i as f64 / 40.0;
            assert_abs_diff_eq!(spline.evaluate(x), f(x), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_natural_end_curvature_is_zero() {
        let xs = vec![0.0, 1.0, 2.5, 3.0, 4.0];
        let ys = vec![1.0, -1.0, 2.0, 0.5, 0.0];
        let spline = CubicSpline::new(xs, ys, SplineBoundary::Natural).unwrap();
        let y2 = &spline.y2s;
        assert_abs_diff_eq!(y2[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(y2[y2.len() - 1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_micrometre_scale_knots() {
        // Knots as small as the splitter's (1e-7 m spacing) must stay well conditioned.
        let xs: Vec<f64> = (0..8).map(|i| -1.1e-6 + i as f64 * 0.3e-6).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 0.75e-6 + 0.5 * x).collect();
        let spline = CubicSpline::new(xs, ys, SplineBoundary::NotAKnot).unwrap();
        assert_abs_diff_eq!(spline.evaluate(0.0), 0.75e-6, epsilon = 1e-18);
        assert_abs_diff_eq!(spline.evaluate(0.2e-6), 0.85e-6, epsilon = 1e-18);
    }

    #[test]
    fn test_interval_clamps_outside_domain() {
        let xs = vec![-0.05e-6, 0.0, 0.5e-6, 1.0e-6, 1.1e-6];
        let ys = vec![0.0, 0.0, 0.3e-6, 0.75e-6, 0.75e-6];
        let spline = CubicSpline::new(xs, ys, SplineBoundary::NotAKnot).unwrap();
        assert_eq!(spline.interval(-1.0e-6), (0, 1));
        assert_eq!(spline.interval(0.0), (1, 2));
        assert_eq!(spline.interval(0.7e-6), (2, 3));
        assert_eq!(spline.interval(2.0e-6), (3, 4));
        assert_eq!(spline.evaluate(0.5e-6), 0.3e-6);
    }

    #[test]
    fn test_rejects_too_few_points() {
        let err = CubicSpline::new(vec![0.0, 1.0, 2.0], vec![0.0; 3], SplineBoundary::default())
            .unwrap_err();
        assert!(matches!(err, GeometryError::InvalidDomain(_)));
    }

    #[test]
    fn test_rejects_non_increasing_knots() {
        let err = CubicSpline::new(
            vec![0.0, 1.0, 1.0, 2.0],
            vec![0.0; 4],
            SplineBoundary::default(),
        )
        .unwrap_err();
        assert!(matches!(err, GeometryError::InvalidDomain(_)));

        let err = CubicSpline::new(
            vec![0.0, f64::NAN, 2.0, 3.0],
            vec![0.0; 4],
            SplineBoundary::default(),
        )
        .unwrap_err();
        assert!(matches!(err, GeometryError::InvalidDomain(_)));
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let err = CubicSpline::new(vec![0.0, 1.0, 2.0, 3.0], vec![0.0; 5], SplineBoundary::default())
            .unwrap_err();
        assert_eq!(err, GeometryError::LengthMismatch { expected: 4, actual: 5 });
    }
}
