use dotgrid_core::Dot;
use dotgrid_graph::DenseGrid;
use log::debug;
use nalgebra::{Point2, Vector2};

use crate::DistortionModel;

fn mean(points: &[Point2<f64>]) -> Point2<f64> {
    let sum = points
        .iter()
        .fold(Vector2::zeros(), |acc, p| acc + p.coords);
    Point2::from(sum / points.len() as f64)
}

/// Camera roll in radians from the centre column (grid `x == 0`).
///
/// The column is rectified with `model` (no rotation), split into its bottom
/// and top halves by grid order, and the roll is `asin(dx / len)` of the
/// vector from the top-half centroid to the bottom-half centroid. Degenerate
/// columns give `0`.
pub fn detect_rotation(model: &DistortionModel, dense: &DenseGrid, dots: &[Dot]) -> f64 {
    let column: Vec<Point2<f64>> = dense
        .column(0)
        .into_iter()
        .filter_map(|i| model.rectify_point(dots[i].position))
        .collect();
    let half = column.len() / 2;
    let (bottom, top) = column.split_at(half);
    if bottom.is_empty() || top.is_empty() {
        debug!("rotation: centre column has {} points", column.len());
        return 0.0;
    }

    let d = mean(bottom) - mean(top);
    let len = d.norm();
    if len < 1e-12 {
        return 0.0;
    }
    let rotation = (d.x / len).clamp(-1.0, 1.0).asin();
    debug!(
        "rotation: {:.5} rad from {} column points",
        rotation,
        column.len()
    );
    rotation
}
