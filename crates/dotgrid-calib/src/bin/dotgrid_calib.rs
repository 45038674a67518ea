//! dotgrid-calib CLI: calibrate a pan/tilt camera rig from a directory of
//! dot-grid target images.

use clap::{Args, Parser};
use dotgrid_calib::{calibrate_directory, BlobDotDetector, CalibrationConfig};
use std::path::PathBuf;

#[cfg(not(feature = "tracing"))]
use log::LevelFilter;
use log::{error, info};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Debug, Parser)]
#[command(name = "dotgrid-calib")]
#[command(about = "Lens distortion and pan/tilt calibration from dot-grid target images")]
#[command(version)]
struct Cli {
    /// JSON config; defaults are used for everything it leaves out.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding raw0_<pan>_<tilt> / raw1_<pan>_<tilt> images.
    #[arg(long)]
    images: Option<PathBuf>,

    /// Image file extension.
    #[arg(long)]
    ext: Option<String>,

    /// Device name written to the report.
    #[arg(long)]
    device: Option<String>,

    /// Path of the JSON report.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Directory for the debug images.
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    /// Write the effective config to this path and exit.
    #[arg(long)]
    dump_config: Option<PathBuf>,

    #[command(flatten)]
    rig: RigArgs,

    /// Annealing passes of the distortion search.
    #[arg(long)]
    passes: Option<usize>,

    /// Seed for the per-image random generator.
    #[arg(long)]
    seed: Option<u64>,

    /// Log debug output.
    #[arg(short, long)]
    verbose: bool,

    /// Only log records from this crate (repeatable), e.g. `dotgrid_lens`.
    #[arg(long = "log-crate", value_name = "CRATE")]
    log_crates: Vec<String>,

    /// Emit tracing events as JSON (with the `tracing` feature).
    #[arg(long)]
    log_json: bool,
}

#[derive(Debug, Clone, Args, Default)]
struct RigArgs {
    /// Distance between the two cameras (mm).
    #[arg(long)]
    baseline_mm: Option<f64>,
    /// Distance from the cameras to the target (mm).
    #[arg(long)]
    distance_mm: Option<f64>,
    /// Height of the target centre above the cameras (mm).
    #[arg(long)]
    target_height_mm: Option<f64>,
    /// Nominal horizontal field of view (degrees).
    #[arg(long)]
    fov_deg: Option<f64>,
    /// Dot spacing on the target (mm).
    #[arg(long)]
    dot_spacing_mm: Option<f64>,
    /// Known focal length (pixels).
    #[arg(long)]
    focal_length_px: Option<f64>,
    /// Single camera rig: only raw0_* images are used.
    #[arg(long)]
    mono: bool,
}

impl Cli {
    fn to_config(&self) -> CliResult<CalibrationConfig> {
        let mut cfg = match &self.config {
            Some(path) => CalibrationConfig::load_json(path)?,
            None => CalibrationConfig::default(),
        };
        if let Some(dir) = &self.images {
            cfg.image_dir = dir.display().to_string();
        }
        if let Some(ext) = &self.ext {
            cfg.extension = ext.clone();
        }
        if let Some(device) = &self.device {
            cfg.device = device.clone();
        }
        if let Some(out) = &self.out {
            cfg.output_path = Some(out.display().to_string());
        }
        if let Some(dir) = &self.debug_dir {
            cfg.debug_dir = Some(dir.display().to_string());
        }

        let rig = &mut cfg.rig;
        let overrides = [
            (self.rig.baseline_mm, &mut rig.baseline_mm),
            (self.rig.distance_mm, &mut rig.distance_mm),
            (self.rig.target_height_mm, &mut rig.target_height_mm),
            (self.rig.fov_deg, &mut rig.fov_deg),
            (self.rig.dot_spacing_mm, &mut rig.dot_spacing_mm),
        ];
        for (value, field) in overrides {
            if let Some(v) = value {
                *field = v;
            }
        }
        if self.rig.focal_length_px.is_some() {
            rig.focal_length_px = self.rig.focal_length_px;
        }
        if self.rig.mono {
            rig.stereo = false;
        }

        if let Some(passes) = self.passes {
            cfg.detect.distortion.passes = passes;
        }
        if let Some(seed) = self.seed {
            cfg.detect.overlay.seed = seed;
        }
        Ok(cfg)
    }
}

fn init_logging(cli: &Cli) -> CliResult<()> {
    #[cfg(feature = "tracing")]
    {
        let _ = tracing_log::LogTracer::init();
        dotgrid_calib::core::init_tracing(cli.log_json, &cli.log_crates);
    }
    #[cfg(not(feature = "tracing"))]
    {
        let level = if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };
        dotgrid_calib::core::init_for_crates(level, &cli.log_crates)?;
    }
    Ok(())
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;
    let config = cli.to_config()?;

    if let Some(path) = &cli.dump_config {
        config.write_json(path)?;
        info!("wrote config to {}", path.display());
        return Ok(());
    }

    let detector = BlobDotDetector::new(config.detector.clone());
    match calibrate_directory(&config, &detector) {
        Ok(report) => {
            for cam in &report.cameras {
                info!(
                    "camera {}: centre ({:.2}, {:.2}), rms {:.4} px, fov {:.2} deg",
                    cam.index,
                    cam.centre_of_distortion.x,
                    cam.centre_of_distortion.y,
                    cam.rms_error,
                    cam.field_of_view_deg
                );
            }
            Ok(())
        }
        // unusable input is reported, not treated as a crash
        Err(e) if e.is_input_error() => {
            error!("calibration skipped: {e}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
