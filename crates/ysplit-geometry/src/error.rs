//! Error type shared by every geometry operation.

use thiserror::Error;

/// Errors from spline construction, parameter validation and polygon
/// assembly.
///
/// Every variant is raised before any output is produced; nothing in this
/// crate clamps or repairs its inputs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("Control value {index} = {value:e} m is outside its bound [{lower:e}, {upper:e}] m")]
    OutOfBounds {
        index: usize,
        value: f64,
        lower: f64,
        upper: f64,
    },

    #[error("Expected {expected} values, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Invalid splitter configuration: {0}")]
    InvalidConfig(String),
}
