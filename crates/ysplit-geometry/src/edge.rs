//! Edge-curve construction: fit a spline through an edge's knots and sample
//! it densely.

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::knots::{linspace, KnotSet};
use crate::spline::{CubicSpline, SplineBoundary};

/// Where the sampling grid of a spline edge begins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleStart {
    /// At the left overhang point (the outer edge runs into the input waveguide).
    #[default]
    Overhang,
    /// At the first knot (the inner edge starts exactly at the bifurcation).
    FirstKnot,
}

/// How a spline edge is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeSampling {
    /// Number of evenly spaced samples.
    pub count: usize,
    /// Start of the sampling interval; the end is always the right overhang.
    #[serde(default)]
    pub start: SampleStart,
}

/// A densely sampled edge: parallel x/y sequences with strictly increasing x.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledEdge {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl SampledEdge {
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// `(x, y)` pairs in increasing x order.
    pub fn points(&self) -> impl DoubleEndedIterator<Item = [f64; 2]> + '_ {
        self.xs.iter().zip(self.ys.iter()).map(|(&x, &y)| [x, y])
    }

    pub fn first(&self) -> Option<[f64; 2]> {
        self.points().next()
    }

    pub fn last(&self) -> Option<[f64; 2]> {
        self.points().next_back()
    }
}

/// Fit a cubic spline through `knots` extended by their overhangs and sample it.
///
/// # Arguments
/// * `knots` - Knot positions and overhang margins.
/// * `values` - One control y-value per knot (m).
/// * `sampling` - Sample count and start anchor.
/// * `boundary` - Spline end condition.
///
/// # Errors
/// [`GeometryError::LengthMismatch`] for the wrong number of values,
/// [`GeometryError::InvalidDomain`] if the extended knot set is too short or
/// not strictly increasing, or if no samples were requested.
pub fn spline_edge(
    knots: &KnotSet,
    values: &[f64],
    sampling: EdgeSampling,
    boundary: SplineBoundary,
) -> Result<SampledEdge, GeometryError> {
    if sampling.count == 0 {
        return Err(GeometryError::InvalidDomain(
            "an edge needs at least one sample".into(),
        ));
    }

    let xs = knots.extended_positions();
    let ys = knots.extend_values(values)?;
    let spline = CubicSpline::new(xs, ys, boundary)?;

    let (lo, hi) = spline.domain();
    let start = match sampling.start {
        SampleStart::Overhang => lo,
        SampleStart::FirstKnot => knots.first(),
    };

    let sample_xs = linspace(start, hi, sampling.count);
    let sample_ys = sample_xs.iter().map(|&x| spline.evaluate(x)).collect();
    Ok(SampledEdge {
        xs: sample_xs,
        ys: sample_ys,
    })
}

/// `count` evenly spaced points on the straight segment from `start` to `end`.
pub fn linear_edge(start: [f64; 2], end: [f64; 2], count: usize) -> Result<SampledEdge, GeometryError> {
    if count < 2 {
        return Err(GeometryError::InvalidDomain(format!(
            "a linear edge needs at least 2 points, got {}",
            count
        )));
    }
    if !(end[0] > start[0]) {
        return Err(GeometryError::InvalidDomain(format!(
            "linear edge must run left to right: {:e} -> {:e}",
            start[0], end[0]
        )));
    }
    Ok(SampledEdge {
        xs: linspace(start[0], end[0], count),
        ys: linspace(start[1], end[1], count),
    })
}
