//! JSON configuration and report helpers.

use dotgrid_lens::RemapParams;
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{DetectParams, DotDetectorParams, PanTiltCalibration, PanTiltParams, RigGeometry};

#[derive(thiserror::Error, Debug)]
pub enum ConfigIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn default_extension() -> String {
    "png".to_string()
}

fn default_device() -> String {
    "dotgrid".to_string()
}

/// Everything a batch calibration run needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Directory holding the `raw0_*` / `raw1_*` images.
    #[serde(default)]
    pub image_dir: String,
    /// Image file extension, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Device name written to the report.
    #[serde(default = "default_device")]
    pub device: String,
    /// Report path; `<image_dir>/<device>_calibration.json` when unset.
    #[serde(default)]
    pub output_path: Option<String>,
    /// Directory for debug images; `image_dir` when unset.
    #[serde(default)]
    pub debug_dir: Option<String>,
    #[serde(default)]
    pub rig: RigGeometry,
    #[serde(default)]
    pub detector: DotDetectorParams,
    #[serde(default)]
    pub detect: DetectParams,
    #[serde(default)]
    pub remap: RemapParams,
    #[serde(default)]
    pub pan_tilt: PanTiltParams,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            image_dir: ".".to_string(),
            extension: default_extension(),
            device: default_device(),
            output_path: None,
            debug_dir: None,
            rig: RigGeometry::default(),
            detector: DotDetectorParams::default(),
            detect: DetectParams::default(),
            remap: RemapParams::default(),
            pan_tilt: PanTiltParams::default(),
        }
    }
}

impl CalibrationConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the report path.
    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                Path::new(&self.image_dir).join(format!("{}_calibration.json", self.device))
            })
    }

    /// Resolve the debug image directory.
    pub fn debug_dir(&self) -> PathBuf {
        PathBuf::from(self.debug_dir.as_deref().unwrap_or(&self.image_dir))
    }
}

/// Paths of the three debug images written per camera.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DebugImages {
    /// Raw winner image with the detected dots marked.
    pub dots: String,
    /// Rectified winner image.
    pub rectified: String,
    /// Rectified winner image with the ideal grid intercepts marked.
    pub grid: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraReport {
    pub index: usize,
    /// Image whose lens model won (lowest RMS error).
    pub image: String,
    pub width: usize,
    pub height: usize,
    pub focal_length_px: f64,
    pub field_of_view_deg: f64,
    pub centre_of_distortion: Point2<f64>,
    /// Radial curve coefficients, constant term first.
    pub distortion: Vec<f64>,
    pub scale: f64,
    pub rotation_deg: f64,
    pub rms_error: f64,
    pub images_used: usize,
    pub images_skipped: usize,
    pub debug_images: DebugImages,
}

/// Calibration file written at the end of a batch run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub device: String,
    /// Mean focal length over the calibrated cameras.
    pub focal_length_px: f64,
    /// Camera separation; only present for stereo rigs.
    pub baseline_mm: Option<f64>,
    /// Mean left-minus-right rectified centre-dot offset over image pairs
    /// taken at the same servo setting.
    pub stereo_offset_px: Option<Vector2<f64>>,
    pub pan_tilt: Option<PanTiltCalibration>,
    pub cameras: Vec<CameraReport>,
}

impl CalibrationReport {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
