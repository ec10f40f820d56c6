//! Planar linear maps for splitter footprints.
//!
//! The assembler uses the x-axis reflection to build the lower half of the
//! splitter, and the exporters use the uniform scale to convert metres to
//! micrometres.

use nalgebra::{Matrix2, Vector2};

/// Metres to micrometres.
pub const METRES_TO_MICROMETRES: f64 = 1e6;

/// A linear map of the plane fixing the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform2 {
    /// 2x2 reflection/scale matrix.
    pub matrix: Matrix2<f64>,
}

impl Default for Transform2 {
    fn default() -> Self {
        Self {
            matrix: Matrix2::identity(),
        }
    }
}

impl Transform2 {
    /// Uniform scale about the origin.
    pub fn uniform_scale(factor: f64) -> Self {
        Self {
            matrix: Matrix2::identity() * factor,
        }
    }

    /// Reflection about the x-axis: `(x, y) -> (x, -y)`.
    pub fn mirror_x_axis() -> Self {
        Self {
            matrix: Matrix2::from_diagonal(&Vector2::new(1.0, -1.0)),
        }
    }

    /// Apply this map to a point.
    pub fn apply(&self, point: &[f64; 2]) -> [f64; 2] {
        let result = self.matrix * Vector2::new(point[0], point[1]);
        [result.x, result.y]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_transform() {
        let t = Transform2::default();
        assert_eq!(t.apply(&[1.0, -2.0]), [1.0, -2.0]);
    }

    #[test]
    fn test_mirror_negates_y_only() {
        let t = Transform2::mirror_x_axis();
        assert_eq!(t.apply(&[0.3e-6, 1.25e-6]), [0.3e-6, -1.25e-6]);
    }

    #[test]
    fn test_micrometre_scale_is_exact() {
        let t = Transform2::uniform_scale(METRES_TO_MICROMETRES);
        let p = [-1.1e-6, 0.2537e-6];
        assert_eq!(t.apply(&p), [p[0] * 1e6, p[1] * 1e6]);
    }

    #[test]
    fn test_mirror_is_an_involution() {
        let t = Transform2::mirror_x_axis();
        let p = [0.45e-6, 0.0312e-6];
        assert_eq!(t.apply(&t.apply(&p)), p);
    }
}
