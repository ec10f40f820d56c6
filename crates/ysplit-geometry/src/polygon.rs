//! Closed splitter polygons and their assembly from two sampled edges.
//!
//! The upper half of the splitter is bounded by the outer edge (running left
//! to right) and the inner edge (running back from the output port to the
//! bifurcation). The lower half is the reflection of the upper half about the
//! x-axis, traversed so that the four runs join into one loop:
//!
//! ```text
//!   outer  ──────────────────────▶
//!                          ◀────── inner
//!                          ──────▶ mirrored inner
//!   mirrored outer ◀──────────────
//! ```
//!
//! The order is load-bearing: a run traversed the wrong way folds the
//! outline back across itself.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::edge::SampledEdge;
use crate::transform::{Transform2, METRES_TO_MICROMETRES};

/// Relative tolerance below which an orientation is treated as collinear.
const COLLINEAR_TOLERANCE: f64 = 1e-9;

/// One closed loop of `(x, y)` vertices. The closing edge from the last
/// vertex back to the first is implicit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub vertices: Vec<[f64; 2]>,
}

impl Polygon {
    pub fn new(vertices: Vec<[f64; 2]>) -> Self {
        Self { vertices }
    }

    /// Join the outer and inner edges of the upper half with their
    /// reflections into the splitter outline.
    pub fn assemble(outer: &SampledEdge, inner: &SampledEdge) -> Self {
        let mirror = Transform2::mirror_x_axis();
        let mut vertices = Vec::with_capacity(2 * (outer.len() + inner.len()));

        vertices.extend(outer.points());
        vertices.extend(inner.points().rev());
        vertices.extend(inner.points().map(|p| mirror.apply(&p)));
        vertices.extend(outer.points().rev().map(|p| mirror.apply(&p)));

        Self { vertices }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Axis-aligned bounding box: returns `(min_corner, max_corner)`.
    pub fn bounding_box(&self) -> Option<([f64; 2], [f64; 2])> {
        let first = *self.vertices.first()?;
        Some(self.vertices.iter().fold((first, first), |(lo, hi), v| {
            (
                [lo[0].min(v[0]), lo[1].min(v[1])],
                [hi[0].max(v[0]), hi[1].max(v[1])],
            )
        }))
    }

    /// Leftmost vertex (smallest x, first occurrence).
    pub fn leftmost(&self) -> Option<[f64; 2]> {
        self.vertices
            .iter()
            .copied()
            .reduce(|best, v| if v[0] < best[0] { v } else { best })
    }

    /// Signed area by the shoelace formula (positive when counter-clockwise).
    pub fn signed_area(&self) -> f64 {
        let n = self.vertices.len();
        (0..n)
            .map(|i| {
                let a = self.vertices[i];
                let b = self.vertices[(i + 1) % n];
                a[0] * b[1] - b[0] * a[1]
            })
            .sum::<f64>()
            / 2.0
    }

    /// Whether every vertex `(x, y)` has a partner `(x, -y)` within `tolerance`.
    pub fn is_symmetric_about_x_axis(&self, tolerance: f64) -> bool {
        let mut sorted = self.vertices.clone();
        sorted.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));

        self.vertices.iter().all(|v| {
            let target = [v[0], -v[1]];
            let start = sorted.partition_point(|p| p[0] < target[0] - tolerance);
            sorted[start..]
                .iter()
                .take_while(|p| p[0] <= target[0] + tolerance)
                .any(|p| (p[1] - target[1]).abs() <= tolerance)
        })
    }

    /// First pair of non-adjacent edges that properly cross, as edge indices
    /// `(i, j)` with `i < j`. Edge `i` runs from vertex `i` to vertex `i + 1`
    /// (wrapping). Edges that only touch at a shared vertex do not count.
    pub fn find_self_intersection(&self) -> Option<(usize, usize)> {
        let n = self.vertices.len();
        if n < 4 {
            return None;
        }
        let edge = |i: usize| (self.vertices[i], self.vertices[(i + 1) % n]);

        for i in 0..n {
            let (a0, a1) = edge(i);
            for j in (i + 2)..n {
                if i == 0 && j == n - 1 {
                    continue; // adjacent across the seam
                }
                let (b0, b1) = edge(j);
                if !boxes_overlap(a0, a1, b0, b1) {
                    continue;
                }
                if segments_cross(a0, a1, b0, b1) {
                    return Some((i, j));
                }
            }
        }
        None
    }

    /// Whether the loop has no crossing edges.
    pub fn is_simple(&self) -> bool {
        self.find_self_intersection().is_none()
    }

    /// Copy with every coordinate multiplied by `factor`, order preserved.
    pub fn scaled(&self, factor: f64) -> Self {
        let t = Transform2::uniform_scale(factor);
        Self {
            vertices: self.vertices.iter().map(|v| t.apply(v)).collect(),
        }
    }

    /// Copy in micrometres (coordinates multiplied by exactly `1e6`).
    pub fn to_micrometres(&self) -> Self {
        self.scaled(METRES_TO_MICROMETRES)
    }

    /// Vertices as an `N x 2` matrix, the layout hosts expect for polygon
    /// solids.
    pub fn to_array(&self) -> Array2<f64> {
        let mut out = Array2::zeros((self.vertices.len(), 2));
        for (mut row, v) in out.rows_mut().into_iter().zip(&self.vertices) {
            row[0] = v[0];
            row[1] = v[1];
        }
        out
    }
}

fn boxes_overlap(a0: [f64; 2], a1: [f64; 2], b0: [f64; 2], b1: [f64; 2]) -> bool {
    a0[0].min(a1[0]) <= b0[0].max(b1[0])
        && b0[0].min(b1[0]) <= a0[0].max(a1[0])
        && a0[1].min(a1[1]) <= b0[1].max(b1[1])
        && b0[1].min(b1[1]) <= a0[1].max(a1[1])
}

/// Sign of the turn `p -> q -> r`, with near-collinear turns reported as 0.
fn orientation(p: [f64; 2], q: [f64; 2], r: [f64; 2]) -> i8 {
    let (ux, uy) = (q[0] - p[0], q[1] - p[1]);
    let (vx, vy) = (r[0] - p[0], r[1] - p[1]);
    let cross = ux * vy - uy * vx;
    let scale = (ux * ux + uy * uy).sqrt() * (vx * vx + vy * vy).sqrt();
    if cross.abs() <= COLLINEAR_TOLERANCE * scale {
        0
    } else if cross > 0.0 {
        1
    } else {
        -1
    }
}

/// Proper crossing: each segment strictly separates the other's endpoints.
fn segments_cross(a0: [f64; 2], a1: [f64; 2], b0: [f64; 2], b1: [f64; 2]) -> bool {
    let o1 = orientation(a0, a1, b0);
    let o2 = orientation(a0, a1, b1);
    let o3 = orientation(b0, b1, a0);
    let o4 = orientation(b0, b1, a1);
    o1 * o2 < 0 && o3 * o4 < 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(points: &[[f64; 2]]) -> SampledEdge {
        SampledEdge {
            xs: points.iter().map(|p| p[0]).collect(),
            ys: points.iter().map(|p| p[1]).collect(),
        }
    }

    fn wedge() -> (SampledEdge, SampledEdge) {
        let outer = edge(&[[-2.0, 1.0], [0.0, 2.0], [2.0, 3.0]]);
        let inner = edge(&[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]);
        (outer, inner)
    }

    #[test]
    fn test_assembly_order() {
        let (outer, inner) = wedge();
        let poly = Polygon::assemble(&outer, &inner);
        assert_eq!(
            poly.vertices,
            vec![
                [-2.0, 1.0], [0.0, 2.0], [2.0, 3.0],
                [2.0, 2.0], [1.0, 1.0], [0.0, 0.0],
                [0.0, -0.0], [1.0, -1.0], [2.0, -2.0],
                [2.0, -3.0], [0.0, -2.0], [-2.0, -1.0],
            ]
        );
        assert!(poly.is_simple());
        assert!(poly.is_symmetric_about_x_axis(1e-12));
    }

    #[test]
    fn test_reversed_run_self_intersects() {
        let (outer, inner) = wedge();
        let mirror = Transform2::mirror_x_axis();

        // Lower outer traversed forward instead of reversed.
        let mut vertices: Vec<[f64; 2]> = outer.points().collect();
        vertices.extend(inner.points().rev());
        vertices.extend(inner.points().map(|p| mirror.apply(&p)));
        vertices.extend(outer.points().map(|p| mirror.apply(&p)));
        assert!(!Polygon::new(vertices).is_simple());

        // Upper outer traversed right to left.
        let mut vertices: Vec<[f64; 2]> = outer.points().rev().collect();
        vertices.extend(inner.points().rev());
        vertices.extend(inner.points().map(|p| mirror.apply(&p)));
        vertices.extend(outer.points().rev().map(|p| mirror.apply(&p)));
        assert!(!Polygon::new(vertices).is_simple());
    }

    #[test]
    fn test_bowtie_is_not_simple() {
        let poly = Polygon::new(vec![[0.0, 0.0], [1.0, 1.0], [1.0, 0.0], [0.0, 1.0]]);
        assert_eq!(poly.find_self_intersection(), Some((0, 2)));
    }

    #[test]
    fn test_shared_vertex_touch_is_allowed() {
        // Two triangles meeting at the origin, like the single-edge splitter tip.
        let poly = Polygon::new(vec![
            [-1.0, 1.0], [0.0, 0.0], [1.0, 1.0], [1.0, -1.0], [0.0, 0.0], [-1.0, -1.0],
        ]);
        assert!(poly.is_simple());
    }

    #[test]
    fn test_scaling_preserves_order() {
        let (outer, inner) = wedge();
        let poly = Polygon::assemble(&outer, &inner).scaled(1e-6);
        let um = poly.to_micrometres();
        assert_eq!(um.len(), poly.len());
        for (a, b) in poly.vertices.iter().zip(&um.vertices) {
            assert_eq!(b[0], a[0] * 1e6);
            assert_eq!(b[1], a[1] * 1e6);
        }
    }

    #[test]
    fn test_bounding_box_and_area() {
        let square = Polygon::new(vec![[0.0, 0.0], [2.0, 0.0], [2.0, 1.0], [0.0, 1.0]]);
        assert_eq!(square.bounding_box(), Some(([0.0, 0.0], [2.0, 1.0])));
        assert_eq!(square.signed_area(), 2.0);
        assert_eq!(square.leftmost(), Some([0.0, 0.0]));
        assert_eq!(Polygon::new(Vec::new()).bounding_box(), None);
    }

    #[test]
    fn test_to_array_shape() {
        let (outer, inner) = wedge();
        let arr = Polygon::assemble(&outer, &inner).to_array();
        assert_eq!(arr.shape(), &[12, 2]);
        assert_eq!(arr[[2, 0]], 2.0);
        assert_eq!(arr[[2, 1]], 3.0);
    }
}
