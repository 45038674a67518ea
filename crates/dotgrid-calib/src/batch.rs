//! Directory-level calibration of a one- or two-camera pan/tilt rig.
//!
//! Images are named `raw<camera>_<pan>_<tilt>.<ext>`. Every image is run
//! through [`calibrate_image`]; per camera the lens model with the lowest
//! RMS error wins and is used to rectify the centre dot of every image of
//! that camera. The rectified centre dots then drive the pan/tilt fit and
//! the stereo offset.

use dotgrid_core::RgbImage;
use dotgrid_lens::{ParamsError, RemapGeometry, RemapTable};
use log::{debug, info, warn};
use nalgebra::{Point2, Vector2};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    calibrate_image, CalibrationConfig, CalibrationReport, CameraFrame, CameraReport,
    ConfigIoError, DebugImages, DotDetector, ImageCalibration, PanTiltCalibrator, RigGeometry,
    ServoObservation,
};

#[derive(thiserror::Error, Debug)]
pub enum CalibrateError {
    #[error("no images named raw<camera>_<pan>_<tilt>.{extension} in {dir}")]
    NoImages { dir: String, extension: String },

    #[error("unequal image counts: {left} for camera 0, {right} for camera 1")]
    UnequalCounts { left: usize, right: usize },

    #[error("camera {camera}: no image produced a lens model")]
    NoUsableImages { camera: usize },

    #[error("image buffer does not match its {width}x{height} size")]
    InvalidImage { width: usize, height: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Config(#[from] ConfigIoError),

    #[error("invalid detection parameters: {0}")]
    InvalidParams(#[from] ParamsError),
}

impl CalibrateError {
    /// Whether the error comes from unusable input rather than a failing
    /// system call or codec.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::NoImages { .. } | Self::UnequalCounts { .. } | Self::NoUsableImages { .. }
        )
    }
}

/// Camera index and servo values encoded in an image file name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageName {
    pub camera: usize,
    pub pan: i32,
    pub tilt: i32,
}

/// Parse `raw<camera>_..._<pan>_<tilt>.<extension>`. The extension match
/// ignores case; anything else returns `None`.
pub fn parse_image_name(path: &Path, extension: &str) -> Option<ImageName> {
    let ext = path.extension()?.to_str()?;
    if !ext.eq_ignore_ascii_case(extension.trim_start_matches('.')) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let fields: Vec<&str> = stem.split('_').collect();
    if fields.len() < 3 {
        return None;
    }
    let camera = match fields[0] {
        "raw0" => 0,
        "raw1" => 1,
        _ => return None,
    };
    let n = fields.len();
    Some(ImageName {
        camera,
        pan: fields[n - 2].parse().ok()?,
        tilt: fields[n - 1].parse().ok()?,
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImageEntry {
    pub path: PathBuf,
    pub name: ImageName,
}

/// Image files of a directory grouped by camera, each group sorted by path.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImageSet {
    pub cameras: [Vec<ImageEntry>; 2],
}

impl ImageSet {
    pub fn camera(&self, index: usize) -> &[ImageEntry] {
        &self.cameras[index]
    }
}

/// List the calibration images in `dir`.
///
/// A stereo rig needs the same non-zero number of images for both cameras;
/// a single-camera rig uses only the `raw0_*` images.
pub fn scan_images(dir: &Path, extension: &str, stereo: bool) -> Result<ImageSet, CalibrateError> {
    let mut set = ImageSet::default();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = parse_image_name(&path, extension) else {
            continue;
        };
        if name.camera == 1 && !stereo {
            continue;
        }
        set.cameras[name.camera].push(ImageEntry { path, name });
    }
    for camera in &mut set.cameras {
        camera.sort_by(|a, b| a.path.cmp(&b.path));
    }

    let (left, right) = (set.cameras[0].len(), set.cameras[1].len());
    if left + right == 0 {
        return Err(CalibrateError::NoImages {
            dir: dir.display().to_string(),
            extension: extension.to_string(),
        });
    }
    if stereo && left != right {
        return Err(CalibrateError::UnequalCounts { left, right });
    }
    debug!("scan {}: {} + {} images", dir.display(), left, right);
    Ok(set)
}

pub fn load_rgb(path: &Path) -> Result<RgbImage, CalibrateError> {
    let img = image::open(path)?.to_rgb8();
    let (width, height) = (img.width() as usize, img.height() as usize);
    RgbImage::from_raw(width, height, img.into_raw())
        .ok_or(CalibrateError::InvalidImage { width, height })
}

pub fn save_rgb(img: &RgbImage, path: &Path) -> Result<(), CalibrateError> {
    let invalid = CalibrateError::InvalidImage {
        width: img.width,
        height: img.height,
    };
    let buf = image::RgbImage::from_raw(img.width as u32, img.height as u32, img.data.clone())
        .ok_or(invalid)?;
    buf.save(path)?;
    Ok(())
}

/// Focal length in pixels: the rig value if given, else measured from the
/// grid pitch and the target geometry, else derived from the nominal field
/// of view.
pub fn focal_length_px(rig: &RigGeometry, pitch_px: f64, width: usize) -> f64 {
    if let Some(f) = rig.focal_length_px.filter(|f| *f > 0.0) {
        return f;
    }
    if rig.dot_spacing_mm > 0.0 && rig.distance_mm > 0.0 && pitch_px > 0.0 {
        return pitch_px * rig.distance_mm / rig.dot_spacing_mm;
    }
    0.5 * width as f64 / (0.5 * rig.fov_deg.to_radians()).tan()
}

/// Horizontal field of view in degrees for a given focal length.
pub fn field_of_view_deg(width: usize, focal_length_px: f64) -> f64 {
    2.0 * (0.5 * width as f64).atan2(focal_length_px).to_degrees()
}

/// Mean `left - right` centre-dot offset over observations that share a
/// servo setting. `None` without a single shared setting.
pub fn stereo_offset(left: &[ServoObservation], right: &[ServoObservation]) -> Option<Vector2<f64>> {
    let mut sum = Vector2::zeros();
    let mut n = 0usize;
    for l in left {
        let Some(r) = right
            .iter()
            .find(|r| r.pan_servo == l.pan_servo && r.tilt_servo == l.tilt_servo)
        else {
            continue;
        };
        sum += l.centre - r.centre;
        n += 1;
    }
    (n > 0).then(|| sum / n as f64)
}

struct Winner {
    entry: ImageEntry,
    calibration: ImageCalibration,
    raw: RgbImage,
}

#[derive(Default)]
struct CameraRun {
    winner: Option<Winner>,
    centres: Vec<(ImageName, Point2<f64>)>,
    skipped: usize,
}

#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(images = entries.len()))
)]
fn run_camera<D: DotDetector + ?Sized>(
    entries: &[ImageEntry],
    detector: &D,
    config: &CalibrationConfig,
) -> Result<CameraRun, CalibrateError> {
    let mut run = CameraRun::default();
    for entry in entries {
        let raw = load_rgb(&entry.path)?;
        let calibration = match calibrate_image(detector, &raw, &config.detect) {
            Ok(c) => c,
            Err(e) => {
                warn!("{}: {e}", entry.path.display());
                run.skipped += 1;
                continue;
            }
        };
        run.centres.push((entry.name, calibration.centre_dot));
        let better = run
            .winner
            .as_ref()
            .is_none_or(|w| calibration.rms_error() < w.calibration.rms_error());
        if better {
            run.winner = Some(Winner {
                entry: entry.clone(),
                calibration,
                raw,
            });
        }
    }
    Ok(run)
}

fn write_debug_images(
    winner: &Winner,
    table: &RemapTable,
    dir: &Path,
    stem: &str,
) -> Result<DebugImages, CalibrateError> {
    const DOT: [u8; 3] = [0, 255, 0];
    const CENTRE: [u8; 3] = [255, 0, 0];
    const INTERCEPT: [u8; 3] = [0, 128, 255];

    let cal = &winner.calibration;
    let mut dots = winner.raw.clone();
    for d in &cal.dots {
        let arm = (d.radius.round() as i64).max(2);
        dots.draw_cross(d.position.x, d.position.y, arm, if d.is_centre { CENTRE } else { DOT });
    }

    let rectified = table.rectify_image(&winner.raw);
    let mut grid = rectified.clone();
    for u in cal.overlay.grid.intercepts() {
        if let Some(p) = table.rectify_pixel(cal.fit.model.distort_point(u)) {
            grid.draw_cross(p.x, p.y, 3, INTERCEPT);
        }
    }

    let paths = [
        dir.join(format!("{stem}_dots.png")),
        dir.join(format!("{stem}_rectified.png")),
        dir.join(format!("{stem}_grid.png")),
    ];
    save_rgb(&dots, &paths[0])?;
    save_rgb(&rectified, &paths[1])?;
    save_rgb(&grid, &paths[2])?;
    let [dots, rectified, grid] = paths.map(|p| p.display().to_string());
    Ok(DebugImages {
        dots,
        rectified,
        grid,
    })
}

struct CameraResult {
    report: CameraReport,
    frame: CameraFrame,
    observations: Vec<ServoObservation>,
}

fn finish_camera(
    index: usize,
    run: CameraRun,
    config: &CalibrationConfig,
) -> Result<CameraResult, CalibrateError> {
    let Some(winner) = run.winner else {
        return Err(CalibrateError::NoUsableImages { camera: index });
    };
    let cal = &winner.calibration;
    let geometry = RemapGeometry {
        rotation: cal.rotation,
        scale: cal.scale,
        ..RemapGeometry::new(cal.width, cal.height)
    };
    let table = RemapTable::build(&cal.fit.model, geometry, &config.remap);

    let focal = focal_length_px(&config.rig, cal.overlay.pitch_px(), cal.width);
    let frame = CameraFrame {
        width: cal.width,
        height: cal.height,
        fov_deg: field_of_view_deg(cal.width, focal),
    };
    let observations: Vec<ServoObservation> = run
        .centres
        .iter()
        .filter_map(|(name, raw)| {
            table.rectify_pixel(*raw).map(|centre| ServoObservation {
                pan_servo: name.pan,
                tilt_servo: name.tilt,
                centre,
            })
        })
        .collect();

    let dir = config.debug_dir();
    fs::create_dir_all(&dir)?;
    let debug_images = write_debug_images(
        &winner,
        &table,
        &dir,
        &format!("{}_cam{index}", config.device),
    )?;

    info!(
        "camera {index}: winner {} (rms {:.4}), {} used, {} skipped, fov {:.2} deg",
        winner.entry.path.display(),
        cal.rms_error(),
        run.centres.len(),
        run.skipped,
        frame.fov_deg
    );
    let report = CameraReport {
        index,
        image: winner.entry.path.display().to_string(),
        width: cal.width,
        height: cal.height,
        focal_length_px: focal,
        field_of_view_deg: frame.fov_deg,
        centre_of_distortion: cal.fit.model.centre,
        distortion: cal.fit.model.curve.coefficients.clone(),
        scale: cal.scale,
        rotation_deg: cal.rotation.to_degrees(),
        rms_error: cal.rms_error(),
        images_used: run.centres.len(),
        images_skipped: run.skipped,
        debug_images,
    };
    Ok(CameraResult {
        report,
        frame,
        observations,
    })
}

/// Calibrate every camera from the images in `config.image_dir`, write the
/// debug images and the JSON report, and return the report.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(dir = %config.image_dir))
)]
pub fn calibrate_directory<D: DotDetector + ?Sized>(
    config: &CalibrationConfig,
    detector: &D,
) -> Result<CalibrationReport, CalibrateError> {
    config.detect.validate()?;
    let stereo = config.rig.stereo;
    let set = scan_images(Path::new(&config.image_dir), &config.extension, stereo)?;
    let camera_count = if stereo { 2 } else { 1 };

    let mut results = Vec::with_capacity(camera_count);
    for index in 0..camera_count {
        let run = run_camera(set.camera(index), detector, config)?;
        results.push(finish_camera(index, run, config)?);
    }

    let mut pan_tilt = PanTiltCalibrator::new(&config.rig, config.pan_tilt.clone());
    for r in &results {
        pan_tilt.add_camera(r.frame, &r.observations);
    }
    let pan_tilt = match pan_tilt.solve() {
        Ok(p) => Some(p),
        Err(e) => {
            warn!("pan/tilt: {e}");
            None
        }
    };

    let stereo_offset_px = match results.as_slice() {
        [left, right] => stereo_offset(&left.observations, &right.observations),
        _ => None,
    };
    let focal_length_px =
        results.iter().map(|r| r.report.focal_length_px).sum::<f64>() / results.len() as f64;

    let report = CalibrationReport {
        device: config.device.clone(),
        focal_length_px,
        baseline_mm: stereo.then_some(config.rig.baseline_mm),
        stereo_offset_px,
        pan_tilt,
        cameras: results.into_iter().map(|r| r.report).collect(),
    };
    let path = config.output_path();
    report.write_json(&path)?;
    info!("wrote calibration report to {}", path.display());
    Ok(report)
}
