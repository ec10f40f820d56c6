//! # ysplit Geometry
//!
//! Parametric polygon generator for a Y-branch optical power splitter. This
//! crate provides:
//!
//! - **Splines** ([`spline`]): Cubic interpolation with not-a-knot or natural
//!   end conditions.
//! - **Knots and edges** ([`knots`], [`edge`]): Overhang-extended knot sets
//!   and densely sampled edge curves.
//! - **Polygons** ([`polygon`]): Mirror-symmetric assembly of the splitter
//!   outline, plus symmetry and self-intersection checks.
//! - **Splitter** ([`splitter`]): Single- and dual-edge splitter
//!   configurations implementing [`shape::ParametricShape`], the contract an
//!   external shape optimizer consumes.
//! - **Transformations** ([`transform`]): Reflection and unit scaling.
//!
//! Everything here is a pure function of its inputs: no I/O, no shared
//! mutable state, safe to call from any thread.

pub mod control;
pub mod edge;
pub mod error;
pub mod knots;
pub mod polygon;
pub mod shape;
pub mod spline;
pub mod splitter;
pub mod transform;

pub use control::Bound;
pub use error::GeometryError;
pub use polygon::Polygon;
pub use shape::ParametricShape;
pub use splitter::{EdgeCount, SplitterConfig, SplitterGeometry};
