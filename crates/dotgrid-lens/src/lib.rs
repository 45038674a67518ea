//! Lens model estimation for dot-grid calibration targets.
//!
//! Starting from a dense grid of observed dots:
//! - [`search_overlay`] fits an ideal rectilinear grid (the overlay) whose
//!   line intercepts give the undistorted position of every dot,
//! - [`fit_distortion`] searches the centre of distortion and a radial
//!   polynomial mapping rectified radius to observed radius,
//! - [`detect_rotation`] measures camera roll from the centre column,
//! - [`RemapTable`] turns the model into per-pixel rectification tables.

mod distortion;
mod ideal;
mod overlay;
mod params;
mod rectangle;
mod remap;
mod rotation;

pub use distortion::{
    fit_curve_at, fit_distortion, valid_curve, DistortionFit, DistortionModel, RadialSample,
};
pub use ideal::{foreshortened, IdealGrid};
pub use overlay::{best_fit, observed_cells, search_overlay, BestFit, ObservedCell, Overlay};
pub use params::{DistortionFitParams, OverlayParams, ParamsError, RemapParams};
pub use rectangle::{find_grid_rectangle, GridRectangle};
pub use remap::{source_position, RemapGeometry, RemapTable};
pub use rotation::detect_rotation;
