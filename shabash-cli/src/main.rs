//! shabash - locate an RF source from receiver telemetry.
//!
//! # Usage
//!
//! ```bash
//! # Locate from the active profile's first two graphs, with an SVG audit
//! shabash locate --config configs/csv_lines_config.yaml --svg report.svg
//!
//! # Point-source fit on every graph
//! shabash point-source --profile field
//!
//! # Record live telemetry until Ctrl-C
//! shabash record --port 44000 --output-dir csvs --name rssi_field
//! ```

mod error;
mod io;
mod telemetry;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand};
use shabash_core::config::{ProfileConfig, ShabashConfig};
use shabash_core::{
    Dataset, LocatePipeline, LocationReport, PointSourceFitter, SvgConfig, SvgVisualizer,
};

use crate::error::{Error, Result};
use crate::io::CsvLoader;
use crate::telemetry::RecorderConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Locate the source from the first two graphs (A minus B)
    Locate {
        /// Configuration file path
        #[arg(short, long, default_value = "configs/csv_lines_config.yaml")]
        config: PathBuf,

        /// Profile to use instead of the file's `config` key
        #[arg(short, long)]
        profile: Option<String>,

        /// Write an SVG of the result
        #[arg(long)]
        svg: Option<PathBuf>,
    },

    /// Fit the inverse-square point-source model to every graph
    PointSource {
        /// Configuration file path
        #[arg(short, long, default_value = "configs/csv_lines_config.yaml")]
        config: PathBuf,

        /// Profile to use instead of the file's `config` key
        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Record live telemetry to CSV until Ctrl-C
    Record {
        /// Telemetry port on localhost
        #[arg(short, long, default_value_t = 44000)]
        port: u16,

        /// Output directory
        #[arg(short, long, default_value = "csvs")]
        output_dir: PathBuf,

        /// File name stem
        #[arg(short, long, default_value = "rssi")]
        name: String,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = Args::parse();

    let result = match args.command {
        Command::Locate {
            config,
            profile,
            svg,
        } => run_locate(&config, profile.as_deref(), svg.as_deref()),
        Command::PointSource { config, profile } => run_point_source(&config, profile.as_deref()),
        Command::Record {
            port,
            output_dir,
            name,
        } => run_record(RecorderConfig {
            port,
            output_dir,
            base_name: name,
            ..Default::default()
        }),
    };

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Commands
// ============================================================================

fn load_profile(path: &Path, profile: Option<&str>) -> Result<ProfileConfig> {
    let mut config = ShabashConfig::load(path)?;
    if let Some(name) = profile {
        config = config.with_profile(name)?;
    }
    log::info!("Using profile '{}' from {}", config.config, path.display());
    Ok(config.active_profile()?.clone())
}

fn load_graphs(profile: &ProfileConfig, required: usize) -> Result<Vec<Dataset>> {
    if profile.graphs.len() < required {
        return Err(Error::MissingGraphs {
            required,
            found: profile.graphs.len(),
        });
    }
    let loader = CsvLoader::new(profile);
    profile
        .graphs
        .iter()
        .map(|graph| loader.load_graph(graph))
        .collect()
}

fn log_report(report: &LocationReport, profile: &ProfileConfig) {
    for layer in &report.layers {
        log::info!(
            "  layer [{}, {}]: {} points, p{} = {:?}, selected {}",
            layer.min_altitude,
            layer.max_altitude,
            layer.member_count,
            profile.locator.percentile,
            layer.location.percentile_value,
            layer.location.selected
        );
    }

    let hit = report.intersection();
    log::info!(
        "Estimated source: lon {:.6}, lat {:.6}, asl {:.1} ({} trials, mean inlier distance {:.4})",
        hit.x,
        hit.y,
        hit.z,
        report.line_fit.trials,
        report.line_fit.mean_inlier_distance
    );
    if let Some(real) = profile.real_source() {
        log::info!(
            "  offset from surveyed source: {:.6} (lon/lat units)",
            hit.planar().distance(&real.planar())
        );
    }
}

fn run_locate(config: &Path, profile: Option<&str>, svg: Option<&Path>) -> Result<()> {
    let profile = load_profile(config, profile)?;
    let graphs = load_graphs(&profile, 2)?;
    let (a, b) = (&graphs[0], &graphs[1]);

    let pipeline = LocatePipeline::new(profile.to_pipeline_config());
    let report = pipeline.run(a, b)?;
    log_report(&report, &profile);

    if let Some(path) = svg {
        SvgVisualizer::new(&report, SvgConfig::default())
            .with_title(format!("{} - {}", a.label, b.label))
            .with_expected_source(profile.shown_source())
            .with_real_source(profile.real_source())
            .save(path)?;
        log::info!("SVG written to {}", path.display());
    }
    Ok(())
}

fn run_point_source(config: &Path, profile: Option<&str>) -> Result<()> {
    let profile = load_profile(config, profile)?;
    let mut graphs = load_graphs(&profile, 1)?;
    if graphs.len() >= 2 {
        let union = Dataset::signed_union(&graphs[0], &graphs[1]);
        graphs.push(union);
    }

    let fitter = PointSourceFitter::new(profile.point_source.clone());
    for dataset in &graphs {
        let fit = fitter.fit(&dataset.samples, &profile.find_shabash_bounds)?;
        log::info!(
            "'{}': source at lon {:.6}, lat {:.6}, asl {:.1}, C {:.4} ({:?}, {} iterations, cost {:.3e})",
            dataset.label,
            fit.source.x,
            fit.source.y,
            fit.source.z,
            fit.scale,
            fit.status,
            fit.iterations,
            fit.cost
        );
    }
    Ok(())
}

fn run_record(config: RecorderConfig) -> Result<()> {
    // Set up Ctrl-C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })?;

    let path = telemetry::record(&config, running)?;
    log::info!("Recording saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        let args = Args::parse_from(["shabash", "locate", "-c", "field.yaml", "--svg", "out.svg"]);
        match args.command {
            Command::Locate {
                config,
                profile,
                svg,
            } => {
                assert_eq!(config, PathBuf::from("field.yaml"));
                assert_eq!(profile, None);
                assert_eq!(svg, Some(PathBuf::from("out.svg")));
            }
            other => panic!("unexpected command {:?}", other),
        }

        let args = Args::parse_from(["shabash", "record"]);
        match args.command {
            Command::Record { port, name, .. } => {
                assert_eq!(port, 44000);
                assert_eq!(name, "rssi");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_missing_graphs() {
        let profile = ProfileConfig::default();
        assert!(matches!(
            load_graphs(&profile, 2),
            Err(Error::MissingGraphs { required: 2, found: 0 })
        ));
    }
}
