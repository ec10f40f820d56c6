//! ysplit command-line interface.
//!
//! Generate and export Y-branch splitter geometry from TOML job files:
//! ```sh
//! ysplit polygon job.toml
//! ysplit validate job.toml
//! ysplit script job.toml -o setup.lsf
//! ysplit manifest job.toml -o problem.json
//! ysplit bounds job.toml
//! ```

mod config;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ysplit_geometry::ParametricShape;

#[derive(Parser)]
#[command(name = "ysplit")]
#[command(about = "ysplit: parametric Y-branch splitter geometry")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the splitter outline and write it to disk.
    Polygon {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file and its control vector.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
    /// Record base setup and splitter placement as a host script.
    Script {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Script path (default: <output dir>/setup.lsf).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write the optimization problem manifest as JSON.
    Manifest {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Manifest path (default: <output dir>/manifest.json).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the declared parameter bounds in µm.
    Bounds {
        /// Path to the job configuration file.
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Polygon { config, output } => {
            println!("ysplit Y-branch Generator");
            println!("=========================");
            let job = config::resolve(config::load_config(&config)?)?;
            println!("Configuration: {}", config.display());

            let polygon = runner::build_polygon(&job)?;

            // Determine output directory
            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.config.output.directory));

            if job.config.output.save_csv {
                runner::write_polygon_csv(&polygon, &out_dir.join("polygon.csv"), &job)?;
            }
            if job.config.output.save_json {
                runner::write_polygon_json(&polygon, &out_dir.join("polygon.json"))?;
            }
            if job.config.output.save_gds {
                let name = format!("{}.gds", job.config.output.gds.cell.to_lowercase());
                runner::write_gds(&polygon, &out_dir.join(name), &job.config.output.gds)?;
            }

            println!("Done.");
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::resolve(config::load_config(&config)?)?;
            job.shape.polygon(&job.params)?;
            job.config.simulation.wavelengths().validate()?;
            job.config.optimization.validate()?;
            println!(
                "Configuration is valid: {} ({} parameters)",
                config.display(),
                job.shape.param_count()
            );
            Ok(())
        }
        Commands::Script { config, output } => {
            let job = config::resolve(config::load_config(&config)?)?;
            let (session, setup) = runner::record_session(&job)?;
            let path = output
                .unwrap_or_else(|| PathBuf::from(&job.config.output.directory).join("setup.lsf"));
            runner::write_script(&session, &setup, &path)?;
            Ok(())
        }
        Commands::Manifest { config, output } => {
            let job = config::resolve(config::load_config(&config)?)?;
            let manifest = runner::build_manifest(&job)?;
            let path = output.unwrap_or_else(|| {
                PathBuf::from(&job.config.output.directory).join("manifest.json")
            });
            runner::write_manifest(&manifest, &path)?;
            Ok(())
        }
        Commands::Bounds { config } => {
            let job = config::resolve(config::load_config(&config)?)?;
            runner::print_bounds(&job);
            Ok(())
        }
    }
}
