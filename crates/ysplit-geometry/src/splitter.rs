//! The Y-branch splitter shape.
//!
//! The splitter's upper half is bounded by two curves:
//!
//! - the **outer edge**, a spline over `[-1, 1] µm` running from the input
//!   waveguide's upper side (y ≈ 0.25 µm) to the upper output waveguide's
//!   outer side (y ≈ 1.25 µm);
//! - the **inner edge**, running from the bifurcation at the origin to the
//!   upper output waveguide's inner side (y ≈ 0.75 µm). With
//!   [`EdgeCount::Dual`] it is a second spline over `[0, 1] µm`; with
//!   [`EdgeCount::Single`] it is a fixed straight line.
//!
//! The lower half is the mirror image. Both variants share one assembler;
//! the edge count only decides where the inner edge comes from and how many
//! control values the shape takes.

use serde::{Deserialize, Serialize};

use crate::control::{self, Bound};
use crate::edge::{linear_edge, spline_edge, EdgeSampling, SampleStart, SampledEdge};
use crate::error::GeometryError;
use crate::knots::{linspace, KnotSet};
use crate::polygon::Polygon;
use crate::shape::ParametricShape;
use crate::spline::SplineBoundary;

/// How many edges of the splitter are driven by control values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EdgeCount {
    /// Outer edge only; the inner edge is a fixed line.
    Single,
    /// Outer and inner edges.
    #[default]
    Dual,
}

impl TryFrom<u8> for EdgeCount {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(EdgeCount::Single),
            2 => Ok(EdgeCount::Dual),
            other => Err(format!("edge count must be 1 or 2, got {}", other)),
        }
    }
}

impl From<EdgeCount> for u8 {
    fn from(value: EdgeCount) -> Self {
        match value {
            EdgeCount::Single => 1,
            EdgeCount::Dual => 2,
        }
    }
}

/// Knots, sampling, initial taper and bounds of one spline edge (all in m).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplineEdgeConfig {
    /// Number of control knots.
    pub knots: usize,
    /// `[first, last]` knot x-positions.
    pub span: [f64; 2],
    /// Overhang before the first and after the last knot.
    pub overhang: [f64; 2],
    /// Samples taken along the fitted curve.
    pub samples: usize,
    pub sample_start: SampleStart,
    /// Initial control values run linearly from `taper[0]` to `taper[1]`.
    pub taper: [f64; 2],
    /// Port bound on the first control value.
    pub first_bound: Bound,
    /// Port bound on the last control value.
    pub last_bound: Bound,
    /// Interior control values may move this far either side of the taper.
    pub band: f64,
}

impl SplineEdgeConfig {
    /// Outer edge: 10 knots over `[-1, 1] µm`, 0.1 µm overhangs, 100 samples.
    pub fn outer() -> Self {
        Self {
            knots: 10,
            span: [-1.0e-6, 1.0e-6],
            overhang: [0.1e-6, 0.1e-6],
            samples: 100,
            sample_start: SampleStart::Overhang,
            taper: [0.25e-6, 1.25e-6],
            first_bound: Bound::new(0.24e-6, 0.26e-6),
            last_bound: Bound::new(1.2e-6, 1.3e-6),
            band: 0.15e-6,
        }
    }

    /// Inner edge: 10 knots over `[0, 1] µm`, sampled from the bifurcation.
    ///
    /// The ±0.03 µm band keeps every sample right of the tip strictly above
    /// the axis for any in-bounds vector, so the two inner runs never cross.
    pub fn inner() -> Self {
        Self {
            knots: 10,
            span: [0.0, 1.0e-6],
            overhang: [0.05e-6, 0.1e-6],
            samples: 50,
            sample_start: SampleStart::FirstKnot,
            taper: [0.0, 0.75e-6],
            first_bound: Bound::new(0.0, 0.05e-6),
            last_bound: Bound::new(0.7e-6, 0.8e-6),
            band: 0.03e-6,
        }
    }

    fn knot_set(&self) -> Result<KnotSet, GeometryError> {
        KnotSet::uniform(
            self.span[0],
            self.span[1],
            self.knots,
            self.overhang[0],
            self.overhang[1],
        )
    }

    fn sampling(&self) -> EdgeSampling {
        EdgeSampling {
            count: self.samples,
            start: self.sample_start,
        }
    }

    fn initial_values(&self) -> Vec<f64> {
        linspace(self.taper[0], self.taper[1], self.knots)
    }

    fn bounds(&self) -> Vec<Bound> {
        let taper = self.initial_values();
        let last = taper.len() - 1;
        taper
            .iter()
            .enumerate()
            .map(|(k, &t)| match k {
                0 => self.first_bound,
                k if k == last => self.last_bound,
                _ => Bound::new(t - self.band, t + self.band),
            })
            .collect()
    }

    fn check(&self, label: &str) -> Result<(), GeometryError> {
        let invalid = |msg: String| Err(GeometryError::InvalidConfig(format!("{}: {}", label, msg)));
        if self.knots < 2 {
            return invalid(format!("needs at least 2 knots, got {}", self.knots));
        }
        if self.samples < 2 {
            return invalid(format!("needs at least 2 samples, got {}", self.samples));
        }
        if !(self.band.is_finite() && self.band >= 0.0) {
            return invalid(format!("band must be non-negative, got {:e}", self.band));
        }
        for (name, b) in [("first bound", self.first_bound), ("last bound", self.last_bound)] {
            if !b.is_well_formed() {
                return invalid(format!("{} [{:e}, {:e}] is malformed", name, b.lower, b.upper));
            }
        }
        Ok(())
    }
}

/// The fixed straight inner edge of a single-edge splitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedInnerEdge {
    /// Where the two arms separate (m).
    pub bifurcation: [f64; 2],
    /// y of the inner edge where it meets the output port (m). The x is the
    /// outer edge's right overhang.
    pub port_offset: f64,
    pub samples: usize,
}

impl Default for FixedInnerEdge {
    fn default() -> Self {
        Self {
            bifurcation: [0.0, 0.0],
            port_offset: 0.75e-6,
            samples: 50,
        }
    }
}

/// Complete splitter description. All lengths in metres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitterConfig {
    pub edges: EdgeCount,
    pub outer: SplineEdgeConfig,
    /// Used when `edges` is [`EdgeCount::Dual`].
    pub inner: SplineEdgeConfig,
    /// Used when `edges` is [`EdgeCount::Single`].
    pub fixed_inner: FixedInnerEdge,
    pub boundary: SplineBoundary,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self::dual_edge()
    }
}

impl SplitterConfig {
    /// Outer and inner edges both optimised (20 control values).
    pub fn dual_edge() -> Self {
        Self {
            edges: EdgeCount::Dual,
            outer: SplineEdgeConfig::outer(),
            inner: SplineEdgeConfig::inner(),
            fixed_inner: FixedInnerEdge::default(),
            boundary: SplineBoundary::NotAKnot,
        }
    }

    /// Outer edge only (10 control values). The input-port bound is a little
    /// wider than in the dual-edge variant.
    pub fn single_edge() -> Self {
        let mut outer = SplineEdgeConfig::outer();
        outer.first_bound = Bound::new(0.24e-6, 0.28e-6);
        Self {
            edges: EdgeCount::Single,
            outer,
            ..Self::dual_edge()
        }
    }

    /// Preset for an edge count.
    pub fn for_edges(edges: EdgeCount) -> Self {
        match edges {
            EdgeCount::Single => Self::single_edge(),
            EdgeCount::Dual => Self::dual_edge(),
        }
    }
}

/// A validated splitter shape: knot sets, initial parameters and bounds are
/// computed once and shared by every polygon build.
#[derive(Debug, Clone)]
pub struct SplitterGeometry {
    config: SplitterConfig,
    outer_knots: KnotSet,
    inner_knots: Option<KnotSet>,
    initial: Vec<f64>,
    bounds: Vec<Bound>,
}

impl SplitterGeometry {
    /// Validate `config` and precompute knots, initial parameters and bounds.
    ///
    /// # Errors
    /// [`GeometryError::InvalidConfig`] if counts, bounds or the fixed inner
    /// edge are inconsistent, or if the initial taper lies outside the
    /// declared bounds; [`GeometryError::InvalidDomain`] for bad knot spans.
    pub fn new(config: SplitterConfig) -> Result<Self, GeometryError> {
        config.outer.check("outer edge")?;
        let outer_knots = config.outer.knot_set()?;
        let mut initial = config.outer.initial_values();
        let mut bounds = config.outer.bounds();

        let inner_knots = match config.edges {
            EdgeCount::Dual => {
                config.inner.check("inner edge")?;
                initial.extend(config.inner.initial_values());
                bounds.extend(config.inner.bounds());
                Some(config.inner.knot_set()?)
            }
            EdgeCount::Single => {
                let fixed = &config.fixed_inner;
                if fixed.samples < 2 {
                    return Err(GeometryError::InvalidConfig(format!(
                        "fixed inner edge needs at least 2 samples, got {}",
                        fixed.samples
                    )));
                }
                let (_, x_end) = outer_knots.extended_domain();
                if !(fixed.bifurcation[0] < x_end) {
                    return Err(GeometryError::InvalidConfig(format!(
                        "bifurcation x {:e} must lie left of the output port at {:e}",
                        fixed.bifurcation[0], x_end
                    )));
                }
                None
            }
        };

        control::validate(&initial, &bounds).map_err(|e| {
            GeometryError::InvalidConfig(format!("initial taper violates bounds: {}", e))
        })?;

        Ok(Self {
            config,
            outer_knots,
            inner_knots,
            initial,
            bounds,
        })
    }

    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    pub fn edge_count(&self) -> EdgeCount {
        self.config.edges
    }

    pub fn outer_knots(&self) -> &KnotSet {
        &self.outer_knots
    }

    /// `None` for single-edge splitters.
    pub fn inner_knots(&self) -> Option<&KnotSet> {
        self.inner_knots.as_ref()
    }

    /// Sampled outer and inner edges of the upper half.
    ///
    /// Validates `params` against the bounds before fitting anything.
    pub fn edges(&self, params: &[f64]) -> Result<(SampledEdge, SampledEdge), GeometryError> {
        control::validate(params, &self.bounds)?;
        let parts = control::split(params, self.outer_knots.len())?;

        let outer = spline_edge(
            &self.outer_knots,
            parts.outer,
            self.config.outer.sampling(),
            self.config.boundary,
        )?;

        let inner = match &self.inner_knots {
            Some(knots) => spline_edge(
                knots,
                parts.inner,
                self.config.inner.sampling(),
                self.config.boundary,
            )?,
            None => {
                let fixed = &self.config.fixed_inner;
                let (_, x_end) = self.outer_knots.extended_domain();
                linear_edge(fixed.bifurcation, [x_end, fixed.port_offset], fixed.samples)?
            }
        };
        Ok((outer, inner))
    }

    /// Knot positions paired with their control values (upper half), e.g. for
    /// marking control points on a plot.
    pub fn control_points(&self, params: &[f64]) -> Result<Vec<[f64; 2]>, GeometryError> {
        control::validate(params, &self.bounds)?;
        let parts = control::split(params, self.outer_knots.len())?;

        let mut points: Vec<[f64; 2]> = self
            .outer_knots
            .positions()
            .iter()
            .zip(parts.outer)
            .map(|(&x, &y)| [x, y])
            .collect();
        if let Some(knots) = &self.inner_knots {
            points.extend(knots.positions().iter().zip(parts.inner).map(|(&x, &y)| [x, y]));
        }
        Ok(points)
    }
}

impl ParametricShape for SplitterGeometry {
    fn name(&self) -> &str {
        match self.config.edges {
            EdgeCount::Single => "y-branch (outer edge)",
            EdgeCount::Dual => "y-branch (outer + inner edges)",
        }
    }

    fn initial_params(&self) -> &[f64] {
        &self.initial
    }

    fn bounds(&self) -> &[Bound] {
        &self.bounds
    }

    fn polygon(&self, params: &[f64]) -> Result<Polygon, GeometryError> {
        let (outer, inner) = self.edges(params)?;
        let polygon = Polygon::assemble(&outer, &inner);
        log::debug!(
            "{}: {} vertices from {} control values",
            self.name(),
            polygon.len(),
            params.len()
        );
        Ok(polygon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_parameter_counts() {
        let single = SplitterGeometry::new(SplitterConfig::single_edge()).unwrap();
        assert_eq!(single.param_count(), 10);
        assert!(single.inner_knots().is_none());

        let dual = SplitterGeometry::new(SplitterConfig::dual_edge()).unwrap();
        assert_eq!(dual.param_count(), 20);
        assert_eq!(dual.inner_knots().unwrap().len(), 10);
    }

    #[test]
    fn test_port_bounds_are_pinned() {
        let dual = SplitterGeometry::new(SplitterConfig::dual_edge()).unwrap();
        let b = dual.bounds();
        assert_eq!(b[0], Bound::new(0.24e-6, 0.26e-6));
        assert_eq!(b[9], Bound::new(1.2e-6, 1.3e-6));
        assert_eq!(b[10], Bound::new(0.0, 0.05e-6));
        assert_eq!(b[19], Bound::new(0.7e-6, 0.8e-6));

        let single = SplitterGeometry::new(SplitterConfig::single_edge()).unwrap();
        assert_eq!(single.bounds()[0], Bound::new(0.24e-6, 0.28e-6));
    }

    #[test]
    fn test_interior_bounds_follow_taper() {
        let dual = SplitterGeometry::new(SplitterConfig::dual_edge()).unwrap();
        for (value, bound) in dual.initial_params().iter().zip(dual.bounds()).skip(1).take(8) {
            assert_abs_diff_eq!(bound.midpoint(), *value, epsilon = 1e-18);
            assert_abs_diff_eq!(bound.width(), 0.3e-6, epsilon = 1e-18);
        }
        for (value, bound) in dual.initial_params().iter().zip(dual.bounds()).skip(11).take(8) {
            assert_abs_diff_eq!(bound.midpoint(), *value, epsilon = 1e-18);
            assert_abs_diff_eq!(bound.width(), 0.06e-6, epsilon = 1e-18);
        }
    }

    #[test]
    fn test_edge_count_from_integer() {
        assert_eq!(EdgeCount::try_from(1), Ok(EdgeCount::Single));
        assert_eq!(EdgeCount::try_from(2), Ok(EdgeCount::Dual));
        assert!(EdgeCount::try_from(3).is_err());
        assert_eq!(u8::from(EdgeCount::Single), 1);
    }

    #[test]
    fn test_rejects_taper_outside_bounds() {
        let mut config = SplitterConfig::dual_edge();
        config.outer.taper[0] = 0.3e-6;
        let err = SplitterGeometry::new(config).unwrap_err();
        assert!(matches!(err, GeometryError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_bad_counts() {
        let mut config = SplitterConfig::dual_edge();
        config.inner.samples = 1;
        assert!(matches!(
            SplitterGeometry::new(config).unwrap_err(),
            GeometryError::InvalidConfig(_)
        ));

        let mut config = SplitterConfig::single_edge();
        config.fixed_inner.bifurcation = [2.0e-6, 0.0];
        assert!(SplitterGeometry::new(config).is_err());
    }

    #[test]
    fn test_control_points_pair_knots_with_values() {
        let dual = SplitterGeometry::new(SplitterConfig::dual_edge()).unwrap();
        let points = dual.control_points(dual.initial_params()).unwrap();
        assert_eq!(points.len(), 20);
        assert_eq!(points[0], [-1.0e-6, 0.25e-6]);
        assert_eq!(points[10], [0.0, 0.0]);
    }
}
