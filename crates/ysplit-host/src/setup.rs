//! Base simulation layout around the splitter.
//!
//! The splitter sits at the origin between one input waveguide on the left
//! and two output waveguides on the right, inside a PML-bounded region filled
//! with oxide. Two solvers are supported:
//!
//! | Solver | Region | Notes |
//! |--------|--------|-------|
//! | 2.5D variational FDTD | 6 × 6 µm | source orientation and band are optional |
//! | 3D FDTD | 6 × 6 × 3 µm | TE fundamental source, planar monitors |
//!
//! [`base_simulation`] describes the objects without touching a host;
//! [`setup_base_simulation`] applies them.

use log::info;
use serde::{Deserialize, Serialize};

use crate::session::{
    Axis, BoundaryCondition, Direction, HostError, HostSession, MonitorType, ObjectKind,
    Property, Side,
};
use crate::setter::{apply_object, ObjectSpec, SetupReport};

pub const SIM_LENGTH: f64 = 6e-6;
pub const SIM_WIDTH: f64 = 6e-6;
/// Region height, 3D only.
pub const SIM_HEIGHT: f64 = 3e-6;
pub const WAVEGUIDE_WIDTH: f64 = 0.5e-6;
pub const WAVEGUIDE_HEIGHT: f64 = 0.22e-6;
/// Centre-to-centre distance between the output waveguides.
pub const WAVEGUIDE_SPACING: f64 = 2e-6;
pub const N_SI: f64 = 3.48;
pub const N_SIO2: f64 = 1.44;

const SUBSTRATE_ALPHA: f64 = 0.3;
const MESH_ACCURACY: u8 = 3;
const SIMULATION_TIME: f64 = 1000e-15;
const WAVEGUIDE_LENGTH: f64 = 2e-6;
const SOURCE_SPAN: f64 = 2e-6;
const FIELD_MONITOR_SPAN: [f64; 2] = [2.5e-6, 3e-6];
const FOM_MONITOR_SPAN: f64 = 1.5e-6;
const MESH_STEP: f64 = 20e-9;

/// Which solver the base layout targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverKind {
    /// 2.5D variational FDTD.
    #[serde(rename = "mode")]
    Mode25D,
    /// Full 3D FDTD.
    #[default]
    #[serde(rename = "fdtd")]
    Fdtd3D,
}

impl SolverKind {
    pub fn is_3d(&self) -> bool {
        matches!(self, Self::Fdtd3D)
    }
}

/// Source band, in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WavelengthRange {
    pub start: f64,
    pub stop: f64,
}

impl Default for WavelengthRange {
    fn default() -> Self {
        Self { start: 1300e-9, stop: 1800e-9 }
    }
}

impl WavelengthRange {
    pub fn new(start: f64, stop: f64) -> Result<Self, HostError> {
        let range = Self { start, stop };
        range.validate()?;
        Ok(range)
    }

    /// Both ends finite and positive with `start < stop`.
    pub fn validate(&self) -> Result<(), HostError> {
        let ok = self.start.is_finite()
            && self.stop.is_finite()
            && self.start > 0.0
            && self.start < self.stop;
        if ok {
            Ok(())
        } else {
            Err(HostError::InvalidArgument(format!(
                "wavelength range [{:e}, {:e}] m must be positive and increasing",
                self.start, self.stop
            )))
        }
    }
}

/// Layout dimensions reported after setup (m).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub sim_length: f64,
    pub sim_width: f64,
    /// `None` in 2.5D.
    pub sim_height: Option<f64>,
    pub waveguide_width: f64,
    pub waveguide_height: f64,
    pub waveguide_spacing: f64,
    pub n_si: f64,
    pub n_sio2: f64,
}

impl Dimensions {
    pub fn for_solver(kind: SolverKind) -> Self {
        Self {
            sim_length: SIM_LENGTH,
            sim_width: SIM_WIDTH,
            sim_height: kind.is_3d().then_some(SIM_HEIGHT),
            waveguide_width: WAVEGUIDE_WIDTH,
            waveguide_height: WAVEGUIDE_HEIGHT,
            waveguide_spacing: WAVEGUIDE_SPACING,
            n_si: N_SI,
            n_sio2: N_SIO2,
        }
    }
}

/// Result of [`setup_base_simulation`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaseSetup {
    pub solver: SolverKind,
    pub wavelengths: WavelengthRange,
    pub dimensions: Dimensions,
    pub report: SetupReport,
}

/// Describe the base layout for `kind`, in creation order.
pub fn base_simulation(kind: SolverKind, wavelengths: WavelengthRange) -> Vec<ObjectSpec> {
    let three_d = kind.is_3d();
    let at_z = |spec: ObjectSpec| {
        if three_d {
            spec.hard(Property::Position(Axis::Z, 0.0))
        } else {
            spec
        }
    };
    let z_span = |spec: ObjectSpec, span: f64| {
        if three_d {
            spec.hard(Property::Span(Axis::Z, span))
        } else {
            spec
        }
    };

    let mut objects = Vec::with_capacity(10);

    // Region
    let region_kind = if three_d { ObjectKind::FdtdRegion } else { ObjectKind::VarFdtdRegion };
    let mut region = ObjectSpec::new(region_kind)
        .hard(Property::Position(Axis::X, 0.0))
        .hard(Property::Position(Axis::Y, 0.0));
    region = at_z(region)
        .hard(Property::Span(Axis::X, SIM_LENGTH))
        .hard(Property::Span(Axis::Y, SIM_WIDTH));
    region = z_span(region, SIM_HEIGHT)
        .hard(Property::MeshAccuracy(MESH_ACCURACY))
        .hard(Property::SimulationTime(SIMULATION_TIME));
    let faces: &[Axis] = if three_d { &[Axis::X, Axis::Y, Axis::Z] } else { &[Axis::X, Axis::Y] };
    for &axis in faces {
        for side in [Side::Min, Side::Max] {
            region = region.hard(Property::Boundary(axis, side, BoundaryCondition::Pml));
        }
    }
    objects.push(region);

    // Substrate
    let substrate = ObjectSpec::new(ObjectKind::Rectangle)
        .hard(Property::Name("substrate".into()))
        .hard(Property::Position(Axis::X, 0.0))
        .hard(Property::Position(Axis::Y, 0.0));
    let substrate = at_z(substrate)
        .hard(Property::Span(Axis::X, SIM_LENGTH))
        .hard(Property::Span(Axis::Y, SIM_WIDTH));
    objects.push(
        z_span(substrate, SIM_HEIGHT)
            .hard(Property::Index(N_SIO2))
            .hard(Property::Alpha(SUBSTRATE_ALPHA)),
    );

    // Waveguides
    let waveguide = |name: &str, x: f64, y: f64| {
        let spec = ObjectSpec::new(ObjectKind::Rectangle)
            .hard(Property::Name(name.into()))
            .hard(Property::Position(Axis::X, x))
            .hard(Property::Span(Axis::X, WAVEGUIDE_LENGTH))
            .hard(Property::Position(Axis::Y, y))
            .hard(Property::Span(Axis::Y, WAVEGUIDE_WIDTH));
        z_span(at_z(spec), WAVEGUIDE_HEIGHT).hard(Property::Index(N_SI))
    };
    let input_x = -SIM_LENGTH / 2.0 + 1e-6;
    let output_x = SIM_LENGTH / 2.0 - 1e-6;
    objects.push(waveguide("input_waveguide", input_x, 0.0));
    objects.push(waveguide("output_waveguide_1", output_x, WAVEGUIDE_SPACING / 2.0));
    objects.push(waveguide("output_waveguide_2", output_x, -WAVEGUIDE_SPACING / 2.0));

    // Source
    let source_x = -SIM_LENGTH / 2.0 + 0.5e-6;
    let source = if three_d {
        ObjectSpec::new(ObjectKind::ModeSource)
            .hard(Property::Name("source".into()))
            .hard(Property::InjectionAxis(Axis::X))
            .hard(Property::Direction(Direction::Forward))
            .hard(Property::Position(Axis::X, source_x))
            .hard(Property::Position(Axis::Y, 0.0))
            .hard(Property::Position(Axis::Z, 0.0))
            .hard(Property::Span(Axis::Y, SOURCE_SPAN))
            .hard(Property::Span(Axis::Z, SOURCE_SPAN))
            .hard(Property::WavelengthStart(wavelengths.start))
            .hard(Property::WavelengthStop(wavelengths.stop))
            .hard(Property::ModeSelection("fundamental TE mode".into()))
    } else {
        ObjectSpec::new(ObjectKind::ModeSource)
            .soft(Property::InjectionAxis(Axis::X))
            .soft(Property::Direction(Direction::Forward))
            .hard(Property::Position(Axis::X, source_x))
            .hard(Property::Position(Axis::Y, 0.0))
            .hard(Property::Span(Axis::Y, SOURCE_SPAN))
            .soft(Property::WavelengthStart(wavelengths.start))
            .soft(Property::WavelengthStop(wavelengths.stop))
    };
    objects.push(source);

    // Monitors
    let mut fields = ObjectSpec::new(ObjectKind::PowerMonitor)
        .hard(Property::Name("opt_fields".into()));
    if three_d {
        fields = fields.hard(Property::MonitorType(MonitorType::ZNormal2D));
    }
    let fields = fields
        .hard(Property::Position(Axis::X, 0.0))
        .hard(Property::Span(Axis::X, FIELD_MONITOR_SPAN[0]))
        .hard(Property::Position(Axis::Y, 0.0))
        .hard(Property::Span(Axis::Y, FIELD_MONITOR_SPAN[1]));
    objects.push(at_z(fields));

    let fom_x = SIM_LENGTH / 2.0 - 0.5e-6;
    for (name, y) in [
        ("fom_monitor_1", WAVEGUIDE_SPACING / 2.0),
        ("fom_monitor_2", -WAVEGUIDE_SPACING / 2.0),
    ] {
        let mut fom = ObjectSpec::new(ObjectKind::PowerMonitor).hard(Property::Name(name.into()));
        if three_d {
            fom = fom.hard(Property::MonitorType(MonitorType::XNormal2D));
        }
        let fom = fom
            .hard(Property::Position(Axis::X, fom_x))
            .hard(Property::Position(Axis::Y, y))
            .hard(Property::Span(Axis::Y, FOM_MONITOR_SPAN));
        objects.push(z_span(at_z(fom), FOM_MONITOR_SPAN));
    }

    // Mesh override
    let mesh = ObjectSpec::new(ObjectKind::MeshOverride)
        .hard(Property::Name("opt_mesh".into()))
        .hard(Property::Position(Axis::X, 0.0))
        .hard(Property::Span(Axis::X, FIELD_MONITOR_SPAN[0]))
        .hard(Property::Position(Axis::Y, 0.0))
        .hard(Property::Span(Axis::Y, FIELD_MONITOR_SPAN[1]));
    let mut mesh = z_span(at_z(mesh), WAVEGUIDE_HEIGHT + 0.5e-6)
        .hard(Property::MeshStep(Axis::X, MESH_STEP))
        .hard(Property::MeshStep(Axis::Y, MESH_STEP));
    if three_d {
        mesh = mesh.hard(Property::MeshStep(Axis::Z, MESH_STEP));
    }
    objects.push(mesh);

    objects
}

/// Build the base layout in `session`.
///
/// # Errors
/// [`HostError::InvalidArgument`] for a bad wavelength range (before any host
/// call), otherwise the first hard failure.
pub fn setup_base_simulation<S: HostSession + ?Sized>(
    session: &mut S,
    kind: SolverKind,
    wavelengths: WavelengthRange,
) -> Result<BaseSetup, HostError> {
    wavelengths.validate()?;
    info!(
        "Setting up {} base simulation ({:.0}-{:.0} nm)",
        if kind.is_3d() { "FDTD 3D" } else { "MODE 2.5D" },
        wavelengths.start * 1e9,
        wavelengths.stop * 1e9
    );

    let mut report = SetupReport::default();
    for spec in base_simulation(kind, wavelengths) {
        report.merge(apply_object(session, &spec)?);
    }

    info!(
        "Base simulation ready: {} objects, {} settings, {} skipped",
        report.objects,
        report.applied,
        report.skipped.len()
    );
    Ok(BaseSetup {
        solver: kind,
        wavelengths,
        dimensions: Dimensions::for_solver(kind),
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setter::Requirement;
    use approx::assert_abs_diff_eq;

    fn names(specs: &[ObjectSpec]) -> Vec<Option<&str>> {
        specs.iter().map(ObjectSpec::name).collect()
    }

    #[test]
    fn test_object_order() {
        for kind in [SolverKind::Mode25D, SolverKind::Fdtd3D] {
            let specs = base_simulation(kind, WavelengthRange::default());
            let source_name = if kind.is_3d() { Some("source") } else { None };
            assert_eq!(
                names(&specs),
                vec![
                    None,
                    Some("substrate"),
                    Some("input_waveguide"),
                    Some("output_waveguide_1"),
                    Some("output_waveguide_2"),
                    source_name,
                    Some("opt_fields"),
                    Some("fom_monitor_1"),
                    Some("fom_monitor_2"),
                    Some("opt_mesh"),
                ]
            );
        }
    }

    #[test]
    fn test_2d_soft_settings() {
        let specs = base_simulation(SolverKind::Mode25D, WavelengthRange::default());
        let soft: Vec<String> = specs
            .iter()
            .flat_map(|s| &s.settings)
            .filter(|s| s.requirement == Requirement::Soft)
            .map(|s| s.property.key())
            .collect();
        assert_eq!(
            soft,
            ["injection axis", "direction", "wavelength start", "wavelength stop"]
        );
        assert!(specs.iter().all(|s| s.get("z").is_none()));
    }

    #[test]
    fn test_3d_is_all_hard() {
        let specs = base_simulation(SolverKind::Fdtd3D, WavelengthRange::default());
        assert!(specs
            .iter()
            .flat_map(|s| &s.settings)
            .all(|s| s.requirement == Requirement::Hard));

        let region = &specs[0];
        assert_eq!(region.kind, ObjectKind::FdtdRegion);
        let bcs = region.settings.iter().filter(|s| s.property.key().ends_with(" bc")).count();
        assert_eq!(bcs, 6);
    }

    #[test]
    fn test_placements() {
        let specs = base_simulation(SolverKind::Fdtd3D, WavelengthRange::default());
        let x_of = |name: &str| match specs
            .iter()
            .find(|s| s.name() == Some(name))
            .and_then(|s| s.get("x"))
            .map(|s| &s.property)
        {
            Some(Property::Position(_, x)) => *x,
            other => panic!("no x for {}: {:?}", name, other),
        };
        assert_abs_diff_eq!(x_of("input_waveguide"), -2e-6, epsilon = 1e-18);
        assert_abs_diff_eq!(x_of("output_waveguide_1"), 2e-6, epsilon = 1e-18);
        assert_abs_diff_eq!(x_of("fom_monitor_2"), 2.5e-6, epsilon = 1e-18);
        assert_abs_diff_eq!(x_of("source"), -2.5e-6, epsilon = 1e-18);
    }

    #[test]
    fn test_wavelength_range_validation() {
        assert!(WavelengthRange::new(1.3e-6, 1.8e-6).is_ok());
        assert!(WavelengthRange::new(1.8e-6, 1.3e-6).is_err());
        assert!(WavelengthRange::new(0.0, 1.3e-6).is_err());
        assert!(WavelengthRange::new(1.3e-6, f64::NAN).is_err());
    }

    #[test]
    fn test_dimensions() {
        assert_eq!(Dimensions::for_solver(SolverKind::Mode25D).sim_height, None);
        assert_eq!(Dimensions::for_solver(SolverKind::Fdtd3D).sim_height, Some(3e-6));
    }
}
