//! Parametric shape trait.
//!
//! An external shape optimizer needs three things from a geometry: a starting
//! point, box bounds for every parameter, and a pure function from parameters
//! to a polygon. [`ParametricShape`] is exactly that contract; host adapters
//! and the optimizer hand-off operate against it rather than a concrete
//! splitter.

use crate::control::Bound;
use crate::error::GeometryError;
use crate::polygon::Polygon;

/// A polygon-valued function of a bounded parameter vector.
///
/// Implementations must be deterministic and free of hidden state: the same
/// parameters always give a bit-identical polygon.
pub trait ParametricShape: Send + Sync {
    /// Human-readable name of this shape.
    fn name(&self) -> &str;

    /// Starting parameters; always inside [`bounds`](Self::bounds).
    fn initial_params(&self) -> &[f64];

    /// One closed interval per parameter.
    fn bounds(&self) -> &[Bound];

    /// Build the polygon for `params`.
    ///
    /// Implementations validate `params` against the bounds first and never
    /// clamp.
    fn polygon(&self, params: &[f64]) -> Result<Polygon, GeometryError>;

    /// Number of parameters.
    fn param_count(&self) -> usize {
        self.bounds().len()
    }
}
