use dotgrid_core::{Dot, GridCoords};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::DotGraph;

/// Current estimate of the horizontal and vertical lattice steps, in pixels.
///
/// `horizontal` points right (`x > 0`), `vertical` points down the image
/// (`y > 0`).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepVectors {
    pub horizontal: Vector2<f64>,
    pub vertical: Vector2<f64>,
}

/// The four dots immediately surrounding the centre marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CentreSquare {
    pub centre: usize,
    pub top_left: usize,
    pub top_right: usize,
    pub bottom_right: usize,
    pub bottom_left: usize,
}

impl CentreSquare {
    /// Seed grid coordinates, in `[top_left, top_right, bottom_right,
    /// bottom_left]` order.
    pub const SEEDS: [GridCoords; 4] = [
        GridCoords::new(-1, 1),
        GridCoords::new(0, 1),
        GridCoords::new(0, 0),
        GridCoords::new(-1, 0),
    ];

    pub fn corners(&self) -> [usize; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Initial step vectors from the averaged opposite edges of the square.
    pub fn steps(&self, dots: &[Dot]) -> StepVectors {
        let p = |i: usize| dots[i].position;
        let horizontal =
            ((p(self.top_right) - p(self.top_left)) + (p(self.bottom_right) - p(self.bottom_left)))
                * 0.5;
        let vertical =
            ((p(self.bottom_left) - p(self.top_left)) + (p(self.bottom_right) - p(self.top_right)))
                * 0.5;
        StepVectors {
            horizontal,
            vertical,
        }
    }

    /// Assign the fixed seed coordinates to the four corner dots.
    pub fn seed(&self, graph: &mut DotGraph) {
        for (idx, coords) in self.corners().into_iter().zip(Self::SEEDS) {
            graph.node_mut(idx).grid = Some(coords);
        }
    }
}

/// Indices of the (up to) four non-centre dots nearest to `centre`, closest
/// first. A candidate replaces a kept one only when strictly closer.
fn nearest_four(dots: &[Dot], centre: usize) -> Vec<usize> {
    let origin = dots[centre].position;
    let mut best: Vec<(f64, usize)> = Vec::with_capacity(5);
    for (i, dot) in dots.iter().enumerate() {
        if i == centre || dot.is_centre {
            continue;
        }
        let d = dot.distance_to(origin);
        if best.len() == 4 && d >= best[3].0 {
            continue;
        }
        let at = best.iter().position(|&(bd, _)| d < bd).unwrap_or(best.len());
        best.insert(at, (d, i));
        best.truncate(4);
    }
    best.into_iter().map(|(_, i)| i).collect()
}

/// Find the centre square around the first centre-flagged dot.
///
/// Each of the four nearest dots may fill a quadrant slot only if it lies
/// strictly on that side of the centre on both axes; the closest qualifying
/// candidate wins each slot. Returns `None` unless all four slots fill.
pub fn find_centre_square(dots: &[Dot]) -> Option<CentreSquare> {
    let centre = dots.iter().position(|d| d.is_centre)?;
    let candidates = nearest_four(dots, centre);
    if candidates.len() < 4 {
        return None;
    }

    let c = dots[centre].position;
    // [tl, tr, br, bl]
    let mut slots: [Option<(f64, usize)>; 4] = [None; 4];
    for i in candidates {
        let p = dots[i].position;
        let slot = if p.x < c.x && p.y < c.y {
            0
        } else if p.x > c.x && p.y < c.y {
            1
        } else if p.x > c.x && p.y > c.y {
            2
        } else if p.x < c.x && p.y > c.y {
            3
        } else {
            continue;
        };
        let d = dots[i].distance_to(c);
        if slots[slot].is_none_or(|(bd, _)| d < bd) {
            slots[slot] = Some((d, i));
        }
    }

    let [Some(tl), Some(tr), Some(br), Some(bl)] = slots else {
        return None;
    };
    Some(CentreSquare {
        centre,
        top_left: tl.1,
        top_right: tr.1,
        bottom_right: br.1,
        bottom_left: bl.1,
    })
}
