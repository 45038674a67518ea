//! Per-image calibration: dots in, lens model out.

use dotgrid_core::{Dot, RgbImage};
use dotgrid_graph::{build_grid, DenseGrid, GridError, LinkParams};
use dotgrid_lens::{
    detect_rotation, find_grid_rectangle, fit_distortion, search_overlay, DistortionFit,
    DistortionFitParams, GridRectangle, Overlay, OverlayParams, ParamsError,
};
use log::info;
use nalgebra::Point2;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::DotDetector;

/// Reasons a single image yields no lens model. None of these are fatal for
/// a batch; the image is skipped.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DetectError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("centre dot at ({x:.1}, {y:.1}) is too far from the image centre")]
    CentreTooFar { x: f64, y: f64 },

    #[error("no populated grid rectangle within the allowed insets")]
    NoGridRectangle,

    #[error("{edge} row of the grid rectangle has {populated} dots, {needed} needed")]
    SparseBorder {
        edge: &'static str,
        populated: usize,
        needed: usize,
    },

    #[error("ideal grid overlay did not match the observed dots")]
    NoOverlay,

    #[error("no solvable distortion curve for {samples} samples")]
    CurveFitFailed { samples: usize },

    #[error(transparent)]
    InvalidParams(#[from] ParamsError),
}

/// Parameters for [`calibrate_dots`].
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectParams {
    pub link: LinkParams,
    pub overlay: OverlayParams,
    pub distortion: DistortionFitParams,
    /// Largest distance of the centre dot from the image centre, as a
    /// fraction of the image width (horizontally) and height (vertically).
    /// `None` disables the check.
    pub max_centre_offset: Option<f64>,
    /// Smallest fraction of populated cells on the top and bottom rows of
    /// the grid rectangle.
    pub min_border_fill: f64,
}

impl Default for DetectParams {
    fn default() -> Self {
        Self {
            link: LinkParams::default(),
            overlay: OverlayParams::default(),
            distortion: DistortionFitParams::default(),
            max_centre_offset: Some(0.25),
            min_border_fill: 0.5,
        }
    }
}

impl DetectParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        self.distortion.validate()?;
        let fill = self.min_border_fill;
        if !fill.is_finite() || fill < 0.0 {
            return Err(ParamsError::OutOfRange {
                name: "min_border_fill",
                value: fill,
            });
        }
        Ok(())
    }
}

/// Lens model and supporting geometry recovered from one image.
#[derive(Clone, Debug)]
pub struct ImageCalibration {
    pub width: usize,
    pub height: usize,
    /// Dots with their grid coordinates.
    pub dots: Vec<Dot>,
    /// Raw position of the centre marker.
    pub centre_dot: Point2<f64>,
    pub assigned: usize,
    pub dense: DenseGrid,
    pub overlay: Overlay,
    pub fit: DistortionFit,
    /// Camera roll in radians.
    pub rotation: f64,
    pub scale: f64,
}

impl ImageCalibration {
    pub fn rms_error(&self) -> f64 {
        self.fit.rms_error
    }
}

fn check_centre(dots: &[Dot], width: usize, height: usize, limit: f64) -> Result<(), DetectError> {
    let Some(centre) = dots.iter().find(|d| d.is_centre) else {
        return Ok(());
    };
    let p = centre.position;
    let dx = (p.x - 0.5 * width as f64).abs();
    let dy = (p.y - 0.5 * height as f64).abs();
    if dx > limit * width as f64 || dy > limit * height as f64 {
        return Err(DetectError::CentreTooFar { x: p.x, y: p.y });
    }
    Ok(())
}

fn check_border_rows(
    dense: &DenseGrid,
    rect: &GridRectangle,
    min_fill: f64,
) -> Result<(), DetectError> {
    let needed = (min_fill * (rect.dim_x() + 1) as f64).ceil() as usize;
    for (edge, iy) in [("top", rect.top), ("bottom", rect.bottom)] {
        let populated = rect.row_fill(dense, iy);
        if populated < needed {
            return Err(DetectError::SparseBorder {
                edge,
                populated,
                needed,
            });
        }
    }
    Ok(())
}

/// Run grid recovery, overlay search, the distortion fit and rotation
/// detection over the dots of one `width × height` image.
///
/// A fresh generator seeded from `params.overlay.seed` drives both
/// stochastic stages, so equal inputs give equal outputs.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(dots, params), fields(dots = dots.len()))
)]
pub fn calibrate_dots(
    dots: Vec<Dot>,
    width: usize,
    height: usize,
    params: &DetectParams,
) -> Result<ImageCalibration, DetectError> {
    params.validate()?;
    if let Some(limit) = params.max_centre_offset {
        check_centre(&dots, width, height, limit)?;
    }
    let grid = build_grid(dots, &params.link)?;
    let dots = grid.graph.nodes().to_vec();
    let centre_dot = grid
        .graph
        .centre_index()
        .map(|i| dots[i].position)
        .ok_or(DetectError::Grid(GridError::NoCentreDot(dots.len())))?;

    let rect =
        find_grid_rectangle(&grid.dense, &params.overlay).ok_or(DetectError::NoGridRectangle)?;
    check_border_rows(&grid.dense, &rect, params.min_border_fill)?;
    let mut rng = StdRng::seed_from_u64(params.overlay.seed);
    let overlay = search_overlay(&grid.dense, &dots, &rect, &params.overlay, &mut rng)
        .ok_or(DetectError::NoOverlay)?;

    let samples = overlay.samples(&grid.dense, &dots);
    let image_centre = Point2::new(0.5 * width as f64, 0.5 * height as f64);
    let fit = fit_distortion(&samples, image_centre, &params.distortion, &mut rng).ok_or(
        DetectError::CurveFitFailed {
            samples: samples.len(),
        },
    )?;

    let rotation = detect_rotation(&fit.model, &grid.dense, &dots);
    let scale = fit.model.scale_for_width(width);
    info!(
        "image {}x{}: centre of distortion ({:.2}, {:.2}), rms {:.4}, rotation {:.3} deg, scale {:.4}",
        width,
        height,
        fit.model.centre.x,
        fit.model.centre.y,
        fit.rms_error,
        rotation.to_degrees(),
        scale
    );
    Ok(ImageCalibration {
        width,
        height,
        dots,
        centre_dot,
        assigned: grid.assigned,
        dense: grid.dense,
        overlay,
        fit,
        rotation,
        scale,
    })
}

/// Detect dots in `image` with `detector`, then [`calibrate_dots`].
pub fn calibrate_image<D: DotDetector + ?Sized>(
    detector: &D,
    image: &RgbImage,
    params: &DetectParams,
) -> Result<ImageCalibration, DetectError> {
    let gray = image.to_gray();
    let dots = detector.detect(&gray.view());
    calibrate_dots(dots, image.width, image.height, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotgrid_core::GridCoords;
    use dotgrid_graph::DotGraph;

    fn dense_from(cells: &[(i32, i32)]) -> DenseGrid {
        let mut g = DotGraph::new();
        for &(x, y) in cells {
            let mut d = Dot::new(x as f64 * 20.0, -(y as f64) * 20.0, 2.0);
            d.grid = Some(GridCoords::new(x, y));
            g.add(d);
        }
        DenseGrid::from_graph(&g).expect("grid")
    }

    #[test]
    fn sparse_top_row_is_rejected() {
        // 8 columns; the top row keeps only its two corners
        let cells: Vec<(i32, i32)> = (0..5)
            .flat_map(|y| (0..8).map(move |x| (x, y)))
            .filter(|&(x, y)| y < 4 || x == 0 || x == 7)
            .collect();
        let dense = dense_from(&cells);
        let rect = find_grid_rectangle(&dense, &OverlayParams::default()).expect("rect");
        assert_eq!((rect.bottom, rect.top), (0, 4));

        let err = check_border_rows(&dense, &rect, 0.5).unwrap_err();
        assert_eq!(
            err,
            DetectError::SparseBorder {
                edge: "top",
                populated: 2,
                needed: 4
            }
        );
        assert_eq!(check_border_rows(&dense, &rect, 0.25), Ok(()));
    }

    #[test]
    fn invalid_distortion_params_are_reported() {
        let mut params = DetectParams::default();
        params.distortion.cooling_factor = 0.0;
        let dots = vec![Dot::centre(320.0, 240.0, 5.0)];
        let err = calibrate_dots(dots, 640, 480, &params).unwrap_err();
        assert_eq!(err, DetectError::InvalidParams(ParamsError::CoolingFactor(0.0)));

        params.distortion.cooling_factor = 0.5;
        params.min_border_fill = f64::NAN;
        assert!(matches!(
            params.validate(),
            Err(ParamsError::OutOfRange {
                name: "min_border_fill",
                ..
            })
        ));
    }

    #[test]
    fn far_centre_is_rejected_before_grid_recovery() {
        let dots = vec![Dot::centre(20.0, 20.0, 5.0), Dot::new(60.0, 60.0, 3.0)];
        let err = calibrate_dots(dots.clone(), 640, 480, &DetectParams::default()).unwrap_err();
        assert!(matches!(err, DetectError::CentreTooFar { .. }));

        let unchecked = DetectParams {
            max_centre_offset: None,
            ..DetectParams::default()
        };
        let err = calibrate_dots(dots, 640, 480, &unchecked).unwrap_err();
        assert_eq!(err, DetectError::Grid(GridError::IncompleteCentreSquare));
    }

    #[test]
    fn grid_errors_pass_through() {
        let err = calibrate_dots(Vec::new(), 640, 480, &DetectParams::default()).unwrap_err();
        assert_eq!(err, DetectError::Grid(GridError::NoDots));

        let dots = vec![Dot::centre(320.0, 240.0, 5.0), Dot::new(300.0, 220.0, 3.0)];
        let err = calibrate_dots(dots, 640, 480, &DetectParams::default()).unwrap_err();
        assert_eq!(err, DetectError::Grid(GridError::IncompleteCentreSquare));
    }
}
