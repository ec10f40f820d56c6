//! Splitter placement.
//!
//! The polygon is computed and validated before the host is touched, so a
//! bad parameter vector leaves the session exactly as it was.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ysplit_geometry::{GeometryError, ParametricShape, Polygon};

use crate::session::{Axis, HostError, HostSession, ObjectKind, Property};
use crate::setter::set_hard;

/// Errors from placing a splitter in a host session.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Host became unavailable during placement")]
    HostUnavailable(#[source] HostError),

    #[error("Host error: {0}")]
    Host(HostError),
}

impl From<HostError> for AdapterError {
    fn from(e: HostError) -> Self {
        match e {
            HostError::Unavailable(_) => Self::HostUnavailable(e),
            other => Self::Host(other),
        }
    }
}

/// How the splitter outline is extruded in the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolidSpec {
    /// Object name; placing again under the same name replaces the solid.
    pub name: String,
    /// Centre height (m).
    pub z: f64,
    /// Extrusion depth (m).
    pub depth: f64,
    /// Refractive index of the core.
    pub index: f64,
}

impl Default for SolidSpec {
    fn default() -> Self {
        Self {
            name: "y_branch_opt".into(),
            z: 0.0,
            depth: 220e-9,
            index: 3.48,
        }
    }
}

/// Place the splitter for `params` as a polygon solid named `solid.name`.
///
/// Any existing object with that name is deleted first, so repeated calls
/// leave exactly one solid. Returns the placed polygon in metres.
///
/// # Errors
/// - [`AdapterError::Geometry`] if `params` is rejected; no host call is made.
/// - [`AdapterError::HostUnavailable`] if the session drops mid-placement.
pub fn place_splitter<S, G>(
    session: &mut S,
    shape: &G,
    params: &[f64],
    solid: &SolidSpec,
) -> Result<Polygon, AdapterError>
where
    S: HostSession + ?Sized,
    G: ParametricShape + ?Sized,
{
    let polygon = shape.polygon(params)?;
    debug!("{}: {} vertices for '{}'", shape.name(), polygon.len(), solid.name);

    if session.select(&solid.name)? {
        session.delete_selected()?;
        debug!("Replaced existing '{}'", solid.name);
    }

    session.add_object(ObjectKind::Polygon)?;
    let settings = [
        Property::Name(solid.name.clone()),
        Property::Position(Axis::X, 0.0),
        Property::Position(Axis::Y, 0.0),
        Property::Position(Axis::Z, solid.z),
        Property::Span(Axis::Z, solid.depth),
        Property::Vertices(polygon.vertices.clone()),
        Property::Index(solid.index),
    ];
    for property in &settings {
        set_hard(session, property)?;
    }

    info!(
        "Placed '{}' ({} vertices, depth {:.0} nm, n = {})",
        solid.name,
        polygon.len(),
        solid.depth * 1e9,
        solid.index
    );
    Ok(polygon)
}
