//! High-level facade for dot-grid camera calibration.
//!
//! This crate provides:
//! - re-exports of the grid recovery (`dotgrid-graph`) and lens model
//!   (`dotgrid-lens`) crates,
//! - a reference blob detector behind the [`DotDetector`] trait,
//! - the per-image pipeline [`calibrate_dots`] / [`calibrate_image`],
//! - pan/tilt servo calibration and directory-level batch calibration with a
//!   JSON report.
//!
//! ## Quickstart
//!
//! ```no_run
//! use dotgrid_calib::{calibrate_directory, BlobDotDetector, CalibrationConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = CalibrationConfig::default();
//! config.image_dir = "captures".to_string();
//! let detector = BlobDotDetector::new(config.detector.clone());
//!
//! let report = calibrate_directory(&config, &detector)?;
//! for cam in &report.cameras {
//!     println!("camera {}: rms {:.3} px", cam.index, cam.rms_error);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `dotgrid_calib::core`: dots, grids, geometry, regression, image buffers.
//! - `dotgrid_calib::graph`: centre square, adjacency linking, grid coordinates.
//! - `dotgrid_calib::lens`: overlay search, distortion fit, remap tables.

pub use dotgrid_core as core;
pub use dotgrid_graph as graph;
pub use dotgrid_lens as lens;

pub use dotgrid_core::{Dot, GridCoords, RgbImage};
pub use dotgrid_lens::{DistortionModel, RemapGeometry, RemapTable};

mod batch;
mod blobs;
mod detect;
mod io;
mod pantilt;

pub use batch::{
    calibrate_directory, field_of_view_deg, focal_length_px, load_rgb, parse_image_name, save_rgb,
    scan_images, stereo_offset, CalibrateError, ImageEntry, ImageName, ImageSet,
};
pub use blobs::{otsu_threshold, BlobDotDetector, DotDetector, DotDetectorParams};
pub use detect::{calibrate_dots, calibrate_image, DetectError, DetectParams, ImageCalibration};
pub use io::{CalibrationConfig, CalibrationReport, CameraReport, ConfigIoError, DebugImages};
pub use pantilt::{
    AxisCalibration, CameraFrame, PanTiltCalibration, PanTiltCalibrator, PanTiltError,
    PanTiltParams, RigGeometry, ServoObservation,
};
