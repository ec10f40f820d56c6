//! Control vectors and their declared bounds.
//!
//! The optimizer proposes control values; nothing downstream may repair an
//! out-of-range proposal, so [`validate`] reports the first offending index
//! instead of clamping.

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// A closed interval `[lower, upper]` (m).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub lower: f64,
    pub upper: f64,
}

impl Bound {
    pub const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Whether `value` lies inside the interval. NaN never does.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    pub fn midpoint(&self) -> f64 {
        0.5 * (self.lower + self.upper)
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Finite with `lower <= upper`.
    pub fn is_well_formed(&self) -> bool {
        self.lower.is_finite() && self.upper.is_finite() && self.lower <= self.upper
    }

    /// As an `(lower, upper)` pair, the form optimizers take.
    pub fn as_pair(&self) -> (f64, f64) {
        (self.lower, self.upper)
    }
}

/// Check `values` against `bounds` element by element.
///
/// # Errors
/// [`GeometryError::LengthMismatch`] if the lengths differ, otherwise
/// [`GeometryError::OutOfBounds`] for the first value outside its bound.
pub fn validate(values: &[f64], bounds: &[Bound]) -> Result<(), GeometryError> {
    if values.len() != bounds.len() {
        return Err(GeometryError::LengthMismatch {
            expected: bounds.len(),
            actual: values.len(),
        });
    }
    for (index, (&value, bound)) in values.iter().zip(bounds).enumerate() {
        if !bound.contains(value) {
            return Err(GeometryError::OutOfBounds {
                index,
                value,
                lower: bound.lower,
                upper: bound.upper,
            });
        }
    }
    Ok(())
}

/// A control vector split into its outer-edge and inner-edge parts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitControls<'a> {
    pub outer: &'a [f64],
    /// Empty for single-edge splitters.
    pub inner: &'a [f64],
}

/// Split `values` positionally: the first `outer_len` values drive the outer
/// edge, the rest the inner edge.
pub fn split(values: &[f64], outer_len: usize) -> Result<SplitControls<'_>, GeometryError> {
    if values.len() < outer_len {
        return Err(GeometryError::LengthMismatch {
            expected: outer_len,
            actual: values.len(),
        });
    }
    let (outer, inner) = values.split_at(outer_len);
    Ok(SplitControls { outer, inner })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_is_closed() {
        let b = Bound::new(0.24e-6, 0.28e-6);
        assert!(b.contains(0.24e-6));
        assert!(b.contains(0.28e-6));
        assert!(!b.contains(0.2800001e-6));
        assert!(!b.contains(f64::NAN));
        assert!(!b.contains(f64::INFINITY));
    }

    #[test]
    fn test_validate_reports_first_offender() {
        let bounds = [Bound::new(0.0, 1.0); 4];
        assert!(validate(&[0.0, 0.5, 1.0, 0.2], &bounds).is_ok());

        let err = validate(&[0.0, 1.5, -1.0, 0.2], &bounds).unwrap_err();
        assert_eq!(
            err,
            GeometryError::OutOfBounds { index: 1, value: 1.5, lower: 0.0, upper: 1.0 }
        );
    }

    #[test]
    fn test_validate_rejects_wrong_length() {
        let bounds = [Bound::new(0.0, 1.0); 3];
        assert_eq!(
            validate(&[0.5; 4], &bounds).unwrap_err(),
            GeometryError::LengthMismatch { expected: 3, actual: 4 }
        );
    }

    #[test]
    fn test_split() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let parts = split(&values, 3).unwrap();
        assert_eq!(parts.outer, &[1.0, 2.0, 3.0]);
        assert_eq!(parts.inner, &[4.0, 5.0]);

        let parts = split(&values, 5).unwrap();
        assert!(parts.inner.is_empty());
        assert!(split(&values, 6).is_err());
    }
}
