//! Knot sets and evenly spaced sampling grids.
//!
//! A [`KnotSet`] holds the fixed x-positions of one edge's control values
//! plus the overhang margins that extend the fitted curve a little way into
//! the straight waveguides on either side.

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// `count` evenly spaced values from `start` to `stop` inclusive.
///
/// The final value is pinned exactly to `stop`; a single value yields
/// `[start]` and zero values yield an empty vector.
pub fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (count - 1) as f64;
            let mut values: Vec<f64> = (0..count).map(|i| start + i as f64 * step).collect();
            values[count - 1] = stop;
            values
        }
    }
}

/// Fixed x-positions of an edge's control knots and their overhang margins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnotSet {
    /// Knot x-positions (m), strictly increasing.
    xs: Vec<f64>,
    /// Outward extension before the first knot (m).
    overhang_left: f64,
    /// Outward extension after the last knot (m).
    overhang_right: f64,
}

impl KnotSet {
    /// Build a knot set from explicit positions.
    ///
    /// # Errors
    /// [`GeometryError::InvalidDomain`] if there are fewer than two knots, the
    /// positions are not strictly increasing, or an overhang is not a
    /// positive finite distance.
    pub fn new(xs: Vec<f64>, overhang_left: f64, overhang_right: f64) -> Result<Self, GeometryError> {
        if xs.len() < 2 {
            return Err(GeometryError::InvalidDomain(format!(
                "a knot set needs at least 2 knots, got {}",
                xs.len()
            )));
        }
        for (name, margin) in [("left", overhang_left), ("right", overhang_right)] {
            if !(margin.is_finite() && margin > 0.0) {
                return Err(GeometryError::InvalidDomain(format!(
                    "{} overhang must be positive, got {:e}",
                    name, margin
                )));
            }
        }
        if xs.iter().any(|x| !x.is_finite()) || xs.windows(2).any(|w| w[1] <= w[0]) {
            return Err(GeometryError::InvalidDomain(
                "knot positions must be finite and strictly increasing".into(),
            ));
        }
        Ok(Self {
            xs,
            overhang_left,
            overhang_right,
        })
    }

    /// `count` knots evenly spaced over `[start, stop]`.
    pub fn uniform(
        start: f64,
        stop: f64,
        count: usize,
        overhang_left: f64,
        overhang_right: f64,
    ) -> Result<Self, GeometryError> {
        Self::new(linspace(start, stop, count), overhang_left, overhang_right)
    }

    /// Number of (unextended) knots, i.e. control values this edge takes.
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Unextended knot positions.
    pub fn positions(&self) -> &[f64] {
        &self.xs
    }

    pub fn first(&self) -> f64 {
        self.xs[0]
    }

    pub fn last(&self) -> f64 {
        self.xs[self.xs.len() - 1]
    }

    /// Domain of the extended knot set: `[first - left, last + right]`.
    pub fn extended_domain(&self) -> (f64, f64) {
        (
            self.first() - self.overhang_left,
            self.last() + self.overhang_right,
        )
    }

    /// Knot positions with one overhang point prepended and appended.
    pub fn extended_positions(&self) -> Vec<f64> {
        let (lo, hi) = self.extended_domain();
        let mut xs = Vec::with_capacity(self.xs.len() + 2);
        xs.push(lo);
        xs.extend_from_slice(&self.xs);
        xs.push(hi);
        xs
    }

    /// Control values matched to [`extended_positions`](Self::extended_positions):
    /// the first and last values are repeated at the overhang points, which
    /// flattens the curve where it meets the straight waveguides.
    ///
    /// # Errors
    /// [`GeometryError::LengthMismatch`] if `values` does not have one entry
    /// per knot.
    pub fn extend_values(&self, values: &[f64]) -> Result<Vec<f64>, GeometryError> {
        if values.len() != self.xs.len() {
            return Err(GeometryError::LengthMismatch {
                expected: self.xs.len(),
                actual: values.len(),
            });
        }
        let mut ys = Vec::with_capacity(values.len() + 2);
        ys.push(values[0]);
        ys.extend_from_slice(values);
        ys.push(values[values.len() - 1]);
        Ok(ys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linspace_endpoints_are_exact() {
        let xs = linspace(-1.1e-6, 1.1e-6, 100);
        assert_eq!(xs.len(), 100);
        assert_eq!(xs[0], -1.1e-6);
        assert_eq!(xs[99], 1.1e-6);
        assert!(xs.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_linspace_degenerate_counts() {
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(0.5, 1.0, 1), vec![0.5]);
    }

    #[test]
    fn test_extension_repeats_end_values() {
        let knots = KnotSet::uniform(0.0, 1.0e-6, 4, 0.05e-6, 0.1e-6).unwrap();
        let xs = knots.extended_positions();
        assert_eq!(xs.len(), 6);
        assert_eq!(xs[0], -0.05e-6);
        assert_eq!(xs[5], 1.0e-6 + 0.1e-6);

        let ys = knots.extend_values(&[0.0, 0.2, 0.4, 0.7]).unwrap();
        assert_eq!(ys, vec![0.0, 0.0, 0.2, 0.4, 0.7, 0.7]);
    }

    #[test]
    fn test_extension_rejects_wrong_length() {
        let knots = KnotSet::uniform(0.0, 1.0, 5, 0.1, 0.1).unwrap();
        assert_eq!(
            knots.extend_values(&[1.0, 2.0]).unwrap_err(),
            GeometryError::LengthMismatch { expected: 5, actual: 2 }
        );
    }

    #[test]
    fn test_rejects_bad_overhang_and_order() {
        assert!(KnotSet::uniform(0.0, 1.0, 5, 0.0, 0.1).is_err());
        assert!(KnotSet::uniform(0.0, 1.0, 5, 0.1, f64::NAN).is_err());
        assert!(KnotSet::new(vec![0.0, 0.5, 0.5], 0.1, 0.1).is_err());
        assert!(KnotSet::uniform(1.0, 0.0, 5, 0.1, 0.1).is_err());
        assert!(KnotSet::uniform(0.0, 1.0, 1, 0.1, 0.1).is_err());
    }
}
