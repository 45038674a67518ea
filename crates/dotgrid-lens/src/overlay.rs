//! Ideal grid overlay search.
//!
//! The perimeter through the corner dots of the grid rectangle is scaled
//! (and, once per scale, jittered on its left and right edges), subdivided
//! into an [`IdealGrid`] and slid over the observed dots by whole pixels.
//! Every placement is scored by [`best_fit`]; the globally lowest score wins.

use dotgrid_core::{Dot, Polygon2D};
use dotgrid_graph::DenseGrid;
use log::debug;
use nalgebra::{Point2, Vector2};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{GridRectangle, IdealGrid, OverlayParams, RadialSample};

/// An observed dot at dense-grid array index `(ix, iy)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObservedCell {
    pub ix: i64,
    pub iy: i64,
    pub position: Point2<f64>,
}

pub fn observed_cells(dense: &DenseGrid, dots: &[Dot]) -> Vec<ObservedCell> {
    dense
        .populated()
        .map(|(ix, iy, i)| ObservedCell {
            ix,
            iy,
            position: dots[i].position,
        })
        .collect()
}

/// Best whole-cell alignment of an ideal grid against the observed dots.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BestFit {
    /// Cell offset added to the intercept index along `x`.
    pub offset_x: i64,
    /// Cell offset added to the intercept index along `y`.
    pub offset_y: i64,
    /// Sum of `|dx| + |dy|` over matched cells.
    pub score: f64,
    /// Mean observed-minus-ideal displacement over matched cells.
    pub nudge: Vector2<f64>,
    pub matched: usize,
}

/// Intercept index for dense cell `(ix, iy)`. Intercept rows count down
/// from the rectangle's top row.
#[inline]
fn intercept_index(rect: &GridRectangle, ix: i64, iy: i64, ox: i64, oy: i64) -> (i64, i64) {
    (ix - rect.left + ox, rect.top - iy + oy)
}

/// Try every cell offset in `-range..=range` on both axes and keep the one
/// with the smallest summed absolute difference between observed dots and
/// translated intercepts. Ties keep the first offset tried.
pub fn best_fit(
    grid: &IdealGrid,
    rect: &GridRectangle,
    observed: &[ObservedCell],
    translation: Vector2<f64>,
    range: i64,
) -> Option<BestFit> {
    let mut best: Option<BestFit> = None;
    for oy in -range..=range {
        for ox in -range..=range {
            let mut score = 0.0;
            let mut sum = Vector2::zeros();
            let mut matched = 0usize;
            for cell in observed {
                let (i, j) = intercept_index(rect, cell.ix, cell.iy, ox, oy);
                let Some(ideal) = grid.intercept(i, j) else {
                    continue;
                };
                let d = cell.position - (ideal + translation);
                score += d.x.abs() + d.y.abs();
                sum += d;
                matched += 1;
            }
            if matched == 0 {
                continue;
            }
            if best.as_ref().is_none_or(|b| score < b.score) {
                best = Some(BestFit {
                    offset_x: ox,
                    offset_y: oy,
                    score,
                    nudge: sum / matched as f64,
                    matched,
                });
            }
        }
    }
    best
}

/// Accepted overlay for one image.
#[derive(Clone, Debug, PartialEq)]
pub struct Overlay {
    pub rect: GridRectangle,
    /// Scaled (and possibly jittered) perimeter the grid was built from.
    pub perimeter: Polygon2D,
    /// Intercepts with the winning translation and nudge applied.
    pub grid: IdealGrid,
    pub fit: BestFit,
    pub scale: f64,
    pub translation: Vector2<f64>,
}

impl Overlay {
    /// Ideal position for dense cell `(ix, iy)`, if it falls on the grid.
    pub fn intercept_for(&self, ix: i64, iy: i64) -> Option<Point2<f64>> {
        let (i, j) = intercept_index(&self.rect, ix, iy, self.fit.offset_x, self.fit.offset_y);
        self.grid.intercept(i, j)
    }

    /// `(ideal, observed)` pairs for every populated cell with an intercept.
    pub fn samples(&self, dense: &DenseGrid, dots: &[Dot]) -> Vec<RadialSample> {
        dense
            .populated()
            .filter_map(|(ix, iy, i)| {
                self.intercept_for(ix, iy).map(|ideal| RadialSample {
                    ideal,
                    observed: dots[i].position,
                })
            })
            .collect()
    }

    /// Mean cell pitch of the accepted perimeter, in pixels.
    pub fn pitch_px(&self) -> f64 {
        let dx = self.rect.dim_x().max(1) as f64;
        let dy = self.rect.dim_y().max(1) as f64;
        let p = &self.perimeter;
        let horizontal = (p.side_length(0) + p.side_length(2)) / (2.0 * dx);
        let vertical = (p.side_length(1) + p.side_length(3)) / (2.0 * dy);
        0.5 * (horizontal + vertical)
    }
}

struct Candidate {
    perimeter: Polygon2D,
    grid: IdealGrid,
    fit: BestFit,
    scale: f64,
    translation: Vector2<f64>,
}

/// Search scale, edge jitter and translation for the ideal grid that best
/// matches the observed dots, starting from the perimeter through the
/// corner dots of `rect` (see [`crate::find_grid_rectangle`]).
///
/// Scale `k` of `scale_steps` is `1 + span·(k - steps/2)/steps`. For each
/// scale the plain perimeter and one with independently jittered left and
/// right edges are evaluated, so the random sequence drawn from `rng` is
/// fixed by the seed.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(cells = dense.populated_count()))
)]
pub fn search_overlay<R: Rng>(
    dense: &DenseGrid,
    dots: &[Dot],
    rect: &GridRectangle,
    params: &OverlayParams,
    rng: &mut R,
) -> Option<Overlay> {
    let rect = *rect;
    let base = rect.perimeter(dense, dots)?;
    let observed = observed_cells(dense, dots);

    let steps = params.scale_steps.max(1);
    let centre_step = (steps / 2) as f64;
    let jitter = params.edge_jitter.abs();
    let mut best: Option<Candidate> = None;

    for k in 0..steps {
        let scale = 1.0 + params.scale_span * (k as f64 - centre_step) / steps as f64;
        let mut scaled = base.clone();
        scaled.scale(scale);
        let mut jittered = scaled.clone();
        jittered.scale_side(1, 1.0 + rng.random_range(-jitter..=jitter));
        jittered.scale_side(3, 1.0 + rng.random_range(-jitter..=jitter));

        for perimeter in [scaled, jittered] {
            let Some(grid) = IdealGrid::from_perimeter(&perimeter, rect.dim_x(), rect.dim_y())
            else {
                continue;
            };
            let mut local: Option<(BestFit, Vector2<f64>)> = None;
            for ty in -params.translate_y..=params.translate_y {
                for tx in -params.translate_x..=params.translate_x {
                    let t = Vector2::new(tx as f64, ty as f64);
                    let Some(fit) = best_fit(&grid, &rect, &observed, t, params.offset_range)
                    else {
                        continue;
                    };
                    if local.as_ref().is_none_or(|(b, _)| fit.score < b.score) {
                        local = Some((fit, t));
                    }
                }
            }
            let Some((fit, translation)) = local else {
                continue;
            };
            if best.as_ref().is_none_or(|b| fit.score < b.fit.score) {
                best = Some(Candidate {
                    perimeter,
                    grid,
                    fit,
                    scale,
                    translation,
                });
            }
        }
    }

    let Candidate {
        perimeter,
        mut grid,
        fit,
        scale,
        translation,
    } = best?;
    grid.translate(translation + fit.nudge);
    debug!(
        "overlay: scale {:.4}, translation ({}, {}), offset ({}, {}), score {:.3} over {} cells",
        scale, translation.x, translation.y, fit.offset_x, fit.offset_y, fit.score, fit.matched
    );
    Some(Overlay {
        rect,
        perimeter,
        grid,
        fit,
        scale,
        translation,
    })
}
