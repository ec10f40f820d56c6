//! Job runner: ties together geometry, host recording and file output.

use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use ndarray::Array2;

use ysplit_geometry::{ParametricShape, Polygon};
use ysplit_host::adapter::place_splitter;
use ysplit_host::layout::{save_gds, LayoutOptions};
use ysplit_host::setup::{setup_base_simulation, BaseSetup};
use ysplit_host::{OptimizationManifest, OptimizationSettings, RecordingSession, SolverKind};

use crate::config::ResolvedJob;

/// Compute the splitter polygon for the job's control vector (m).
pub fn build_polygon(job: &ResolvedJob) -> Result<Polygon> {
    let polygon = job
        .shape
        .polygon(&job.params)
        .context("control vector rejected")?;

    println!(
        "  Shape '{}': {} parameters, {} vertices",
        job.shape.name(),
        job.params.len(),
        polygon.len()
    );
    if let Some((lo, hi)) = polygon.bounding_box() {
        println!(
            "  Extent: x=[{:.3}, {:.3}] y=[{:.3}, {:.3}] µm",
            lo[0] * 1e6,
            hi[0] * 1e6,
            lo[1] * 1e6,
            hi[1] * 1e6
        );
    }
    if !polygon.is_simple() {
        log::warn!("Outline self-intersects; check the declared bounds");
    }
    Ok(polygon)
}

/// Record the base setup plus splitter placement in a fresh session.
pub fn record_session(job: &ResolvedJob) -> Result<(RecordingSession, BaseSetup)> {
    let mut session = RecordingSession::new();
    let setup = setup_base_simulation(
        &mut session,
        job.config.simulation.solver,
        job.config.simulation.wavelengths(),
    )
    .context("base simulation setup failed")?;
    place_splitter(&mut session, &job.shape, &job.params, &job.config.solid)
        .context("splitter placement failed")?;
    Ok((session, setup))
}

/// Build the optimizer manifest.
///
/// Solid placement comes from `[solid]`; solver and wavelength band come from
/// `[simulation]` so the manifest matches the recorded host script. An
/// `[optimization]` solver or band set away from its default that disagrees
/// with `[simulation]` is an error.
pub fn build_manifest(job: &ResolvedJob) -> Result<OptimizationManifest> {
    let simulation = &job.config.simulation;
    let band = simulation.wavelengths();
    let defaults = OptimizationSettings::default();
    let mut settings = job.config.optimization.clone();

    if settings.solver != defaults.solver && settings.solver != simulation.solver {
        bail!(
            "[optimization] solver {:?} conflicts with [simulation] solver {:?}",
            settings.solver,
            simulation.solver
        );
    }
    for (name, value, default, wanted) in [
        ("start", settings.wavelengths.start, defaults.wavelengths.start, band.start),
        ("stop", settings.wavelengths.stop, defaults.wavelengths.stop, band.stop),
    ] {
        if value != default && value != wanted {
            bail!(
                "[optimization] wavelength {} {:e} m conflicts with [simulation] {:e} m",
                name,
                value,
                wanted
            );
        }
    }

    settings.solver = simulation.solver;
    settings.wavelengths.start = band.start;
    settings.wavelengths.stop = band.stop;
    settings.z = job.config.solid.z;
    settings.depth = job.config.solid.depth;
    let manifest = OptimizationManifest::build(&job.shape, settings)
        .context("invalid [optimization] table")?;
    Ok(manifest)
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn write_rows<W: Write>(out: &mut W, table: &Array2<f64>) -> Result<()> {
    for row in table.rows() {
        writeln!(out, "{:.6},{:.6}", row[0], row[1])?;
    }
    Ok(())
}

/// Render the outline as CSV in µm: `#` metadata lines, a column header,
/// then one `x_um,y_um` row per vertex.
pub fn render_polygon_csv<W: Write>(out: &mut W, polygon: &Polygon, job: &ResolvedJob) -> Result<()> {
    writeln!(out, "# ysplit Y-branch outline")?;
    writeln!(out, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(
        out,
        "# edges: {}, boundary: {:?}",
        u8::from(job.shape.edge_count()),
        job.shape.config().boundary
    )?;
    let controls: Vec<String> = job
        .shape
        .control_points(&job.params)?
        .iter()
        .map(|[x, y]| format!("({:.4},{:.4})", x * 1e6, y * 1e6))
        .collect();
    writeln!(out, "# control points (um): {}", controls.join(" "))?;
    writeln!(out, "#")?;
    writeln!(out, "x_um,y_um")?;
    write_rows(out, &polygon.to_micrometres().to_array())
}

/// Write the outline to a CSV file in µm with a metadata header.
pub fn write_polygon_csv(polygon: &Polygon, path: &Path, job: &ResolvedJob) -> Result<()> {
    create_parent(path)?;
    let mut file = BufWriter::new(std::fs::File::create(path)?);
    render_polygon_csv(&mut file, polygon, job)?;
    file.flush()?;

    println!("Outline written to: {}", path.display());
    Ok(())
}

/// Write the outline to a JSON file in metres.
pub fn write_polygon_json(polygon: &Polygon, path: &Path) -> Result<()> {
    create_parent(path)?;
    let json = serde_json::to_string_pretty(polygon)
        .map_err(|e| anyhow::anyhow!("JSON serialisation error: {}", e))?;
    std::fs::write(path, json)?;

    println!("Outline (JSON) written to: {}", path.display());
    Ok(())
}

/// Export the outline as a GDSII layout.
pub fn write_gds(polygon: &Polygon, path: &Path, options: &LayoutOptions) -> Result<()> {
    create_parent(path)?;
    save_gds(path, polygon, options)
        .with_context(|| format!("writing GDSII to {}", path.display()))?;

    println!(
        "Layout written to: {} (cell {}, layer {})",
        path.display(),
        options.cell,
        options.layer
    );
    Ok(())
}

/// Render a recorded host session as a script with a two-line header.
pub fn render_script<W: Write>(out: &mut W, session: &RecordingSession, setup: &BaseSetup) -> Result<()> {
    let solver = match setup.solver {
        SolverKind::Mode25D => "MODE 2.5D",
        SolverKind::Fdtd3D => "FDTD 3D",
    };
    writeln!(out, "# ysplit host script ({})", solver)?;
    writeln!(
        out,
        "# {} objects, {} settings, {} optional settings skipped",
        session.objects().len(),
        setup.report.applied,
        setup.report.skipped.len()
    )?;
    out.write_all(session.to_script().as_bytes())?;
    Ok(())
}

/// Write a recorded host session as a script.
pub fn write_script(session: &RecordingSession, setup: &BaseSetup, path: &Path) -> Result<()> {
    create_parent(path)?;
    let mut file = BufWriter::new(std::fs::File::create(path)?);
    render_script(&mut file, session, setup)?;
    file.flush()?;

    println!("Host script written to: {}", path.display());
    Ok(())
}

/// Render the optimizer manifest as pretty JSON.
pub fn render_manifest<W: Write>(out: &mut W, manifest: &OptimizationManifest) -> Result<()> {
    out.write_all(manifest.to_json()?.as_bytes())?;
    writeln!(out)?;
    Ok(())
}

/// Write the optimizer manifest as JSON.
pub fn write_manifest(manifest: &OptimizationManifest, path: &Path) -> Result<()> {
    create_parent(path)?;
    let mut file = BufWriter::new(std::fs::File::create(path)?);
    render_manifest(&mut file, manifest)?;
    file.flush()?;

    println!(
        "Manifest written to: {} ({} parameters, {} wavelengths)",
        path.display(),
        manifest.parameter_count(),
        manifest.wavelength_samples.len()
    );
    Ok(())
}

/// Print the declared bounds in µm.
pub fn print_bounds(job: &ResolvedJob) {
    let outer = job.shape.outer_knots().len();
    println!("{:>5}  {:>6}  {:>10}  {:>10}  {:>10}", "index", "edge", "lower_um", "initial_um", "upper_um");
    for (i, (bound, initial)) in job
        .shape
        .bounds()
        .iter()
        .zip(job.shape.initial_params())
        .enumerate()
    {
        let edge = if i < outer { "outer" } else { "inner" };
        println!(
            "{:>5}  {:>6}  {:>10.4}  {:>10.4}  {:>10.4}",
            i,
            edge,
            bound.lower * 1e6,
            initial * 1e6,
            bound.upper * 1e6
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_config, resolve};

    fn job(toml: &str) -> ResolvedJob {
        resolve(parse_config(toml).unwrap()).unwrap()
    }

    #[test]
    fn test_script_places_splitter_last() {
        let job = job("[simulation]\nsolver = \"mode\"\n");
        let (session, setup) = record_session(&job).unwrap();
        assert_eq!(setup.solver, SolverKind::Mode25D);
        assert_eq!(session.count_named("y_branch_opt"), 1);

        let script = session.to_script();
        assert!(script.starts_with("addvarfdtd;"));
        let tail: Vec<&str> = script.lines().rev().take(8).collect();
        assert_eq!(tail[0], "set(\"index\", 3.48);");
        assert!(tail[7].starts_with("addpoly"));
    }

    #[test]
    fn test_out_of_bounds_params_fail() {
        let job = job("[geometry]\nedges = 1\nparams = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]\n");
        assert!(build_polygon(&job).is_err());
        assert!(record_session(&job).is_err());
    }

    #[test]
    fn test_manifest_follows_simulation_table() {
        let job = job(
            "[simulation]\nsolver = \"mode\"\nwavelength_start = 1.5e-6\nwavelength_stop = 1.6e-6\n",
        );
        let manifest = build_manifest(&job).unwrap();
        assert_eq!(manifest.settings.solver, SolverKind::Mode25D);
        assert_eq!(manifest.settings.wavelengths.start, 1.5e-6);
        assert_eq!(manifest.settings.wavelengths.stop, 1.6e-6);
        assert_eq!(manifest.wavelength_samples.len(), 21);
        assert_eq!(manifest.wavelength_samples[0], 1.5e-6);
        assert_eq!(manifest.wavelength_samples[20], 1.6e-6);
    }

    #[test]
    fn test_manifest_rejects_conflicting_band() {
        let conflicting = job(
            "[simulation]\nwavelength_start = 1.5e-6\n\n[optimization]\nwavelengths = { start = 1.4e-6 }\n",
        );
        let err = build_manifest(&conflicting).unwrap_err();
        assert!(err.to_string().contains("wavelength start"), "{}", err);

        let agreeing = job(
            "[simulation]\nwavelength_start = 1.5e-6\n\n[optimization]\nwavelengths = { start = 1.5e-6 }\n",
        );
        assert!(build_manifest(&agreeing).is_ok());
    }

    #[test]
    fn test_manifest_rejects_conflicting_solver() {
        let job = job("[simulation]\nsolver = \"fdtd\"\n\n[optimization]\nsolver = \"mode\"\n");
        assert!(build_manifest(&job).is_err());
    }

    #[test]
    fn test_csv_header_and_micrometre_rows() {
        let job = job("");
        let polygon = build_polygon(&job).unwrap();
        let mut buf = Vec::new();
        render_polygon_csv(&mut buf, &polygon, &job).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "# ysplit Y-branch outline");
        assert_eq!(lines[2], "# edges: 2, boundary: NotAKnot");
        assert!(lines[3].starts_with("# control points (um): (-1.0000,0.2500) "));
        assert_eq!(lines[3].matches('(').count(), 20);
        assert_eq!(lines[5], "x_um,y_um");

        let rows = &lines[6..];
        assert_eq!(rows.len(), 300);
        assert_eq!(rows[0], "-1.100000,0.250000");
        assert_eq!(rows[299], "-1.100000,-0.250000");
        assert_eq!(rows[149], "0.000000,0.000000");
    }

    #[test]
    fn test_script_header() {
        let job = job("[simulation]\nsolver = \"mode\"\n");
        let (session, setup) = record_session(&job).unwrap();
        let mut buf = Vec::new();
        render_script(&mut buf, &session, &setup).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "# ysplit host script (MODE 2.5D)");
        assert!(lines[1].starts_with("# 11 objects, "));
        assert!(lines[1].ends_with(", 0 optional settings skipped"));
        assert_eq!(lines[2], "addvarfdtd;");
        assert_eq!(text.lines().count(), session.to_script().lines().count() + 2);
    }

    #[test]
    fn test_manifest_json() {
        let job = job("[geometry]\nedges = 1\n");
        let manifest = build_manifest(&job).unwrap();
        let mut buf = Vec::new();
        render_manifest(&mut buf, &manifest).unwrap();
        assert!(buf.ends_with(b"\n"));

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["bounds"].as_array().unwrap().len(), 10);
        assert_eq!(value["initial_params"].as_array().unwrap().len(), 10);
        assert_eq!(value["settings"]["solver"], "fdtd");
        assert_eq!(value["initial_polygon"]["vertices"].as_array().unwrap().len(), 300);
    }

    #[test]
    fn test_manifest_takes_solid_depth() {
        let job = job("[solid]\ndepth = 3e-7\n");
        let manifest = build_manifest(&job).unwrap();
        assert_eq!(manifest.settings.depth, 3e-7);
        assert_eq!(manifest.bounds.len(), 20);
    }
}
