//! Pan/tilt servo axis calibration.
//!
//! Each image of the batch was taken at known pan and tilt servo values. The
//! rectified centre-dot position in that image gives the true pan and tilt
//! angle of the camera, and a low-degree polynomial maps servo value to
//! angle for each axis.

use dotgrid_core::PolynomialFit;
use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Physical rig constants.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RigGeometry {
    /// Distance between the two cameras.
    pub baseline_mm: f64,
    /// Distance from the cameras to the target.
    pub distance_mm: f64,
    /// Height of the target centre above the cameras.
    pub target_height_mm: f64,
    /// Nominal horizontal field of view in degrees.
    pub fov_deg: f64,
    /// Centre-to-centre spacing of the target dots.
    pub dot_spacing_mm: f64,
    /// Known focal length in pixels; measured from the target when unset.
    pub focal_length_px: Option<f64>,
    /// Two cameras (`raw0_*` and `raw1_*` images) rather than one.
    pub stereo: bool,
}

impl Default for RigGeometry {
    fn default() -> Self {
        Self {
            baseline_mm: 100.0,
            distance_mm: 1000.0,
            target_height_mm: 0.0,
            fov_deg: 60.0,
            dot_spacing_mm: 20.0,
            focal_length_px: None,
            stereo: true,
        }
    }
}

impl RigGeometry {
    /// Tilt of the line of sight to the target centre, in degrees.
    pub fn observation_tilt_deg(&self) -> f64 {
        self.target_height_mm.atan2(self.distance_mm).to_degrees()
    }
}

/// Parameters for [`PanTiltCalibrator`].
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PanTiltParams {
    /// Fraction of the image, centred, inside which a centre dot is trusted.
    pub interior: f64,
    /// Degree of the servo-to-angle polynomials.
    pub degree: usize,
}

impl Default for PanTiltParams {
    fn default() -> Self {
        Self {
            interior: 0.6,
            degree: 1,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PanTiltError {
    #[error("{axis} axis: {got} usable observations, need at least {need}")]
    NotEnoughObservations {
        axis: &'static str,
        got: usize,
        need: usize,
    },
}

/// Rectified centre-dot position observed at one servo setting.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServoObservation {
    pub pan_servo: i32,
    pub tilt_servo: i32,
    pub centre: Point2<f64>,
}

/// Image size and field of view of the camera an observation came from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraFrame {
    pub width: usize,
    pub height: usize,
    pub fov_deg: f64,
}

impl CameraFrame {
    fn degrees_per_pixel(&self) -> f64 {
        self.fov_deg / self.width as f64
    }

    fn is_interior(&self, p: Point2<f64>, interior: f64) -> bool {
        let (w, h) = (self.width as f64, self.height as f64);
        (p.x - 0.5 * w).abs() <= 0.5 * interior * w && (p.y - 0.5 * h).abs() <= 0.5 * interior * h
    }
}

/// Servo-to-angle polynomial for one axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisCalibration {
    /// Coefficients, constant term first; angles in degrees.
    pub coefficients: Vec<f64>,
    /// Servo value at which the linear part of the polynomial is zero.
    pub offset: f64,
    pub rms_error: f64,
    pub mean_error: f64,
    pub samples: usize,
}

impl AxisCalibration {
    pub fn angle_deg(&self, servo: f64) -> f64 {
        self.coefficients.iter().rev().fold(0.0, |acc, c| acc * servo + c)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PanTiltCalibration {
    pub pan: AxisCalibration,
    pub tilt: AxisCalibration,
}

/// Accumulates servo observations from one or more cameras and fits both
/// axes.
#[derive(Clone, Debug)]
pub struct PanTiltCalibrator {
    params: PanTiltParams,
    observation_tilt_deg: f64,
    pan: PolynomialFit,
    tilt: PolynomialFit,
    rejected: usize,
}

impl PanTiltCalibrator {
    pub fn new(rig: &RigGeometry, params: PanTiltParams) -> Self {
        Self {
            pan: PolynomialFit::new(params.degree),
            tilt: PolynomialFit::new(params.degree),
            observation_tilt_deg: rig.observation_tilt_deg(),
            params,
            rejected: 0,
        }
    }

    /// Add the observations of one camera. Centre dots outside the interior
    /// box are ignored. Returns the number accepted.
    pub fn add_camera(&mut self, frame: CameraFrame, observations: &[ServoObservation]) -> usize {
        if frame.width == 0 {
            return 0;
        }
        let per_px = frame.degrees_per_pixel();
        let (half_w, half_h) = (0.5 * frame.width as f64, 0.5 * frame.height as f64);
        let mut accepted = 0;
        for obs in observations {
            if !frame.is_interior(obs.centre, self.params.interior) {
                self.rejected += 1;
                continue;
            }
            let pan = (obs.centre.x - half_w) * per_px;
            let tilt = -(obs.centre.y - half_h) * per_px + self.observation_tilt_deg;
            self.pan.add_point(obs.pan_servo as f64, pan);
            self.tilt.add_point(obs.tilt_servo as f64, tilt);
            accepted += 1;
        }
        accepted
    }

    pub fn len(&self) -> usize {
        self.pan.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pan.is_empty()
    }

    pub fn solve(&self) -> Result<PanTiltCalibration, PanTiltError> {
        debug!(
            "pan/tilt: {} observations, {} outside the interior box",
            self.len(),
            self.rejected
        );
        Ok(PanTiltCalibration {
            pan: solve_axis(&self.pan, "pan")?,
            tilt: solve_axis(&self.tilt, "tilt")?,
        })
    }
}

fn solve_axis(fit: &PolynomialFit, axis: &'static str) -> Result<AxisCalibration, PanTiltError> {
    let not_enough = PanTiltError::NotEnoughObservations {
        axis,
        got: fit.len(),
        need: fit.degree() + 1,
    };
    let solved = fit.solve().ok_or(not_enough)?;
    let coefficients: Vec<f64> = (0..=solved.degree()).map(|i| solved.coefficient(i)).collect();
    let slope = coefficients.get(1).copied().unwrap_or(0.0);
    let offset = if slope.abs() > 1e-12 {
        -coefficients[0] / slope
    } else {
        0.0
    };
    Ok(AxisCalibration {
        coefficients,
        offset,
        rms_error: solved.rms_error(),
        mean_error: solved.mean_error(),
        samples: solved.samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn observation_tilt_follows_target_height() {
        let rig = RigGeometry {
            target_height_mm: 1000.0,
            distance_mm: 1000.0,
            ..RigGeometry::default()
        };
        assert_relative_eq!(rig.observation_tilt_deg(), 45.0, epsilon = 1e-12);
    }

    #[test]
    fn border_observations_are_ignored() {
        let frame = CameraFrame {
            width: 640,
            height: 480,
            fov_deg: 64.0,
        };
        let mut cal = PanTiltCalibrator::new(&RigGeometry::default(), PanTiltParams::default());
        let obs = [
            ServoObservation {
                pan_servo: 0,
                tilt_servo: 0,
                centre: Point2::new(320.0, 240.0),
            },
            ServoObservation {
                pan_servo: 10,
                tilt_servo: 0,
                centre: Point2::new(600.0, 240.0),
            },
            ServoObservation {
                pan_servo: 0,
                tilt_servo: 10,
                centre: Point2::new(320.0, 20.0),
            },
        ];
        assert_eq!(cal.add_camera(frame, &obs), 1);
        assert_eq!(cal.len(), 1);
        let err = cal.solve().unwrap_err();
        assert_eq!(
            err,
            PanTiltError::NotEnoughObservations {
                axis: "pan",
                got: 1,
                need: 2
            }
        );
    }
}
