//! TOML configuration deserialisation for splitter jobs.
//!
//! Every table is optional; an empty file describes the dual-edge splitter
//! at its initial taper, placed for a 3D solve.

use anyhow::{Context, Result};
use serde::Deserialize;

use ysplit_geometry::spline::SplineBoundary;
use ysplit_geometry::{EdgeCount, SplitterConfig, SplitterGeometry};
use ysplit_host::layout::LayoutOptions;
use ysplit_host::{OptimizationSettings, SolidSpec, SolverKind, WavelengthRange};

/// Top-level job configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    #[serde(default)]
    pub geometry: GeometryConfig,
    #[serde(default)]
    pub solid: SolidSpec,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub optimization: OptimizationSettings,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Splitter geometry from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeometryConfig {
    /// 1 (outer edge only) or 2 (outer and inner). Default: 2.
    #[serde(default)]
    pub edges: EdgeCount,
    /// "not_a_knot" (default) or "natural".
    #[serde(default)]
    pub boundary: SplineBoundary,
    /// Control points on the outer edge. Default: 10.
    pub outer_knots: Option<usize>,
    /// Control points on the inner edge (dual only). Default: 10.
    pub inner_knots: Option<usize>,
    /// Explicit control vector in metres. Default: the initial taper.
    pub params: Option<Vec<f64>>,
}

impl GeometryConfig {
    pub fn splitter_config(&self) -> SplitterConfig {
        let mut config = SplitterConfig::for_edges(self.edges);
        config.boundary = self.boundary;
        if let Some(n) = self.outer_knots {
            config.outer.knots = n;
        }
        if let Some(n) = self.inner_knots {
            config.inner.knots = n;
        }
        config
    }
}

/// Host simulation parameters from TOML.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// "fdtd" (3D, default) or "mode" (2.5D).
    #[serde(default)]
    pub solver: SolverKind,
    #[serde(default = "default_wavelength_start")]
    pub wavelength_start: f64,
    #[serde(default = "default_wavelength_stop")]
    pub wavelength_stop: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            solver: SolverKind::default(),
            wavelength_start: default_wavelength_start(),
            wavelength_stop: default_wavelength_stop(),
        }
    }
}

impl SimulationConfig {
    pub fn wavelengths(&self) -> WavelengthRange {
        WavelengthRange { start: self.wavelength_start, stop: self.wavelength_stop }
    }
}

fn default_wavelength_start() -> f64 {
    1300e-9
}
fn default_wavelength_stop() -> f64 {
    1800e-9
}

/// Output configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Whether to save the outline as CSV in µm (default: true).
    #[serde(default = "default_true")]
    pub save_csv: bool,
    /// Whether to also save the outline as JSON in metres (default: false).
    #[serde(default)]
    pub save_json: bool,
    /// Whether to export a GDSII layout (default: false).
    #[serde(default)]
    pub save_gds: bool,
    /// GDSII names and layer.
    #[serde(default)]
    pub gds: LayoutOptions,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            save_csv: true,
            save_json: false,
            save_gds: false,
            gds: LayoutOptions::default(),
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}
fn default_true() -> bool {
    true
}

/// A job with its splitter built and its control vector resolved.
pub struct ResolvedJob {
    pub config: JobConfig,
    pub shape: SplitterGeometry,
    pub params: Vec<f64>,
}

/// Parse a TOML job configuration.
pub fn parse_config(content: &str) -> Result<JobConfig> {
    let config: JobConfig = toml::from_str(content)?;
    Ok(config)
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &std::path::Path) -> Result<JobConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_config(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Build the splitter and pick the control vector.
pub fn resolve(config: JobConfig) -> Result<ResolvedJob> {
    use ysplit_geometry::ParametricShape;

    let shape = SplitterGeometry::new(config.geometry.splitter_config())
        .context("invalid [geometry] table")?;
    let params = config
        .geometry
        .params
        .clone()
        .unwrap_or_else(|| shape.initial_params().to_vec());
    Ok(ResolvedJob { config, shape, params })
}
