//! Optimizer hand-off.
//!
//! The gradient-based optimizer and its adjoint solver live outside this
//! crate. What they need from us is a shape function, its starting point and
//! bounds, and the settings below; [`OptimizationManifest`] bundles all of it
//! into one JSON document.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ysplit_geometry::knots::linspace;
use ysplit_geometry::{GeometryError, ParametricShape, Polygon};

use crate::session::Direction;
use crate::setup::{SolverKind, WavelengthRange};

/// Errors from building or serialising an optimization manifest.
#[derive(Debug, Error)]
pub enum OptimizationError {
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Invalid optimization settings: {0}")]
    InvalidSettings(String),

    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),
}

/// Wavelength sampling for the figure of merit (m).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WavelengthSweep {
    pub start: f64,
    pub stop: f64,
    pub points: usize,
}

impl Default for WavelengthSweep {
    fn default() -> Self {
        Self { start: 1300e-9, stop: 1800e-9, points: 21 }
    }
}

impl WavelengthSweep {
    pub fn range(&self) -> WavelengthRange {
        WavelengthRange { start: self.start, stop: self.stop }
    }

    /// Evenly spaced sample wavelengths, both ends included.
    pub fn samples(&self) -> Vec<f64> {
        linspace(self.start, self.stop, self.points)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    pub method: String,
    pub max_iter: usize,
    pub scaling_factor: f64,
    /// Projected-gradient tolerance.
    pub pgtol: f64,
    /// Relative figure-of-merit tolerance.
    pub ftol: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            method: "L-BFGS-B".into(),
            max_iter: 30,
            scaling_factor: 1.0,
            pgtol: 1e-20,
            ftol: 1e-9,
        }
    }
}

/// Mode-overlap figure of merit measured at one monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureOfMerit {
    pub monitor_name: String,
    pub mode_number: String,
    pub direction: Direction,
    /// Target transmission, the same at every wavelength.
    pub target_transmission: f64,
    pub norm_p: f64,
}

impl Default for FigureOfMerit {
    fn default() -> Self {
        Self {
            monitor_name: "fom_monitor_1".into(),
            mode_number: "fundamental mode".into(),
            direction: Direction::Forward,
            target_transmission: 1.0,
            norm_p: 1.0,
        }
    }
}

/// A named entry of the host's material database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialSpec {
    pub name: String,
    /// Lower orders win where objects overlap.
    pub mesh_order: u32,
}

impl MaterialSpec {
    pub fn silicon() -> Self {
        Self { name: "Si (Silicon) - Palik".into(), mesh_order: 2 }
    }

    pub fn silica() -> Self {
        Self { name: "SiO2 (Glass) - Palik".into(), mesh_order: 3 }
    }
}

/// How the optimizer discretises the polygon boundary for shape derivatives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolygonHints {
    pub edge_precision: u32,
    /// Boundary displacement step (m).
    pub dx: f64,
}

impl Default for PolygonHints {
    fn default() -> Self {
        Self { edge_precision: 5, dx: 1e-9 }
    }
}

/// Everything the external optimizer is configured with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationSettings {
    pub wavelengths: WavelengthSweep,
    pub optimizer: OptimizerSettings,
    pub figure_of_merit: FigureOfMerit,
    pub solver: SolverKind,
    pub polygon: PolygonHints,
    /// Core material.
    pub eps_in: MaterialSpec,
    /// Cladding material.
    pub eps_out: MaterialSpec,
    /// Solid centre height (m).
    pub z: f64,
    /// Solid depth (m).
    pub depth: f64,
    pub use_deps: bool,
    pub plot_history: bool,
}

impl Default for OptimizationSettings {
    fn default() -> Self {
        Self {
            wavelengths: WavelengthSweep::default(),
            optimizer: OptimizerSettings::default(),
            figure_of_merit: FigureOfMerit::default(),
            solver: SolverKind::Fdtd3D,
            polygon: PolygonHints::default(),
            eps_in: MaterialSpec::silicon(),
            eps_out: MaterialSpec::silica(),
            z: 0.0,
            depth: 220e-9,
            use_deps: true,
            plot_history: true,
        }
    }
}

impl OptimizationSettings {
    pub fn validate(&self) -> Result<(), OptimizationError> {
        let invalid = |msg: String| Err(OptimizationError::InvalidSettings(msg));

        if let Err(e) = self.wavelengths.range().validate() {
            return invalid(e.to_string());
        }
        if self.wavelengths.points == 0 {
            return invalid("wavelength points must be at least 1".into());
        }
        if self.optimizer.max_iter == 0 {
            return invalid("max_iter must be positive".into());
        }
        if !(self.optimizer.scaling_factor.is_finite() && self.optimizer.scaling_factor > 0.0) {
            return invalid(format!("scaling_factor {} must be positive", self.optimizer.scaling_factor));
        }
        if !(self.figure_of_merit.norm_p >= 1.0) {
            return invalid(format!("norm_p {} must be >= 1", self.figure_of_merit.norm_p));
        }
        if !(self.depth.is_finite() && self.depth > 0.0) {
            return invalid(format!("depth {:e} m must be positive", self.depth));
        }
        if !(self.polygon.dx.is_finite() && self.polygon.dx > 0.0) {
            return invalid(format!("dx {:e} m must be positive", self.polygon.dx));
        }
        Ok(())
    }
}

/// The optimization problem as handed to the external optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationManifest {
    pub shape: String,
    pub initial_params: Vec<f64>,
    /// `(lower, upper)` per parameter.
    pub bounds: Vec<(f64, f64)>,
    pub wavelength_samples: Vec<f64>,
    pub settings: OptimizationSettings,
    /// Polygon at the initial parameters (m).
    pub initial_polygon: Polygon,
}

impl OptimizationManifest {
    /// Validate `settings` and evaluate `shape` at its starting point.
    pub fn build<G: ParametricShape + ?Sized>(
        shape: &G,
        settings: OptimizationSettings,
    ) -> Result<Self, OptimizationError> {
        settings.validate()?;
        let initial_polygon = shape.polygon(shape.initial_params())?;
        Ok(Self {
            shape: shape.name().to_string(),
            initial_params: shape.initial_params().to_vec(),
            bounds: shape.bounds().iter().map(|b| b.as_pair()).collect(),
            wavelength_samples: settings.wavelengths.samples(),
            settings,
            initial_polygon,
        })
    }

    pub fn parameter_count(&self) -> usize {
        self.initial_params.len()
    }

    pub fn to_json(&self) -> Result<String, OptimizationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, OptimizationError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ysplit_geometry::{SplitterConfig, SplitterGeometry};

    #[test]
    fn test_defaults() {
        let s = OptimizationSettings::default();
        assert_eq!(s.optimizer.method, "L-BFGS-B");
        assert_eq!(s.optimizer.max_iter, 30);
        assert_eq!(s.figure_of_merit.monitor_name, "fom_monitor_1");
        assert_eq!(s.solver, SolverKind::Fdtd3D);
        assert_eq!(s.eps_in.mesh_order, 2);
        assert_eq!(s.eps_out.mesh_order, 3);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_wavelength_samples() {
        let w = WavelengthSweep::default().samples();
        assert_eq!(w.len(), 21);
        assert_eq!(w[0], 1300e-9);
        assert_eq!(w[20], 1800e-9);
        assert_abs_diff_eq!(w[10], 1550e-9, epsilon = 1e-18);
    }

    #[test]
    fn test_invalid_settings() {
        let mut s = OptimizationSettings::default();
        s.optimizer.max_iter = 0;
        assert!(matches!(s.validate(), Err(OptimizationError::InvalidSettings(_))));

        let mut s = OptimizationSettings::default();
        s.wavelengths.stop = 1.0e-6;
        assert!(s.validate().is_err());

        let mut s = OptimizationSettings::default();
        s.figure_of_merit.norm_p = f64::NAN;
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_manifest() {
        let shape = SplitterGeometry::new(SplitterConfig::dual_edge()).unwrap();
        let m = OptimizationManifest::build(&shape, OptimizationSettings::default()).unwrap();
        assert_eq!(m.parameter_count(), 20);
        assert_eq!(m.bounds.len(), 20);
        assert_eq!(m.bounds[0], shape.bounds()[0].as_pair());
        assert_eq!(m.initial_polygon.len(), 300);

        let json = m.to_json().unwrap();
        assert!(json.contains("\"L-BFGS-B\""));
        assert!(json.contains("\"Si (Silicon) - Palik\""));

        let back = OptimizationManifest::from_json(&json).unwrap();
        assert_eq!(back.shape, m.shape);
        assert_eq!(back.initial_polygon.len(), 300);
        assert_eq!(back.settings.figure_of_merit.mode_number, "fundamental mode");
    }

    #[test]
    fn test_settings_from_partial_json() {
        let s: OptimizationSettings =
            serde_json::from_str(r#"{"optimizer": {"max_iter": 50}, "solver": "mode"}"#).unwrap();
        assert_eq!(s.optimizer.max_iter, 50);
        assert_eq!(s.optimizer.method, "L-BFGS-B");
        assert_eq!(s.solver, SolverKind::Mode25D);
    }
}
