use dotgrid_core::{Dot, Polygon2D};
use dotgrid_graph::DenseGrid;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::OverlayParams;

/// Inclusive rectangle of dense-grid array indices whose four corner cells
/// are populated. `top > bottom` because grid `y` grows upwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridRectangle {
    pub left: i64,
    pub right: i64,
    pub bottom: i64,
    pub top: i64,
}

impl GridRectangle {
    /// Cells spanned horizontally.
    pub fn dim_x(&self) -> usize {
        (self.right - self.left) as usize
    }

    /// Cells spanned vertically.
    pub fn dim_y(&self) -> usize {
        (self.top - self.bottom) as usize
    }

    pub fn area(&self) -> usize {
        self.dim_x() * self.dim_y()
    }

    /// Corner dot indices `[top_left, top_right, bottom_right, bottom_left]`.
    pub fn corners(&self, dense: &DenseGrid) -> Option<[usize; 4]> {
        Some([
            dense.cell(self.left, self.top)?,
            dense.cell(self.right, self.top)?,
            dense.cell(self.right, self.bottom)?,
            dense.cell(self.left, self.bottom)?,
        ])
    }

    /// Quadrilateral through the corner dots, in the same vertex order as
    /// [`GridRectangle::corners`]. Edge 0 is the top, edge 1 the right side.
    pub fn perimeter(&self, dense: &DenseGrid, dots: &[Dot]) -> Option<Polygon2D> {
        let corners = self.corners(dense)?;
        Some(Polygon2D::new(corners.iter().map(|&i| dots[i].position).collect()))
    }

    /// Populated cells of row `iy` between the left and right edges.
    pub fn row_fill(&self, dense: &DenseGrid, iy: i64) -> usize {
        (self.left..=self.right)
            .filter(|&ix| dense.is_populated(ix, iy))
            .count()
    }

    fn inset(dense: &DenseGrid, dx: usize, dy: usize) -> Option<Self> {
        let (w, h) = (dense.width(), dense.height());
        if 2 * dx + 1 >= w || 2 * dy + 1 >= h {
            return None;
        }
        let rect = Self {
            left: dx as i64,
            right: (w - 1 - dx) as i64,
            bottom: dy as i64,
            top: (h - 1 - dy) as i64,
        };
        rect.corners(dense).map(|_| rect)
    }
}

fn first_row_major(dense: &DenseGrid, params: &OverlayParams) -> Option<GridRectangle> {
    (0..params.max_inset_y).find_map(|dy| {
        (0..params.max_inset_x).find_map(|dx| GridRectangle::inset(dense, dx, dy))
    })
}

fn first_column_major(dense: &DenseGrid, params: &OverlayParams) -> Option<GridRectangle> {
    (0..params.max_inset_x).find_map(|dx| {
        (0..params.max_inset_y).find_map(|dy| GridRectangle::inset(dense, dx, dy))
    })
}

/// Largest symmetric-inset rectangle with populated corners, then grown
/// row by row at the top and bottom while both edge cells stay populated.
pub fn find_grid_rectangle(dense: &DenseGrid, params: &OverlayParams) -> Option<GridRectangle> {
    let mut rect = match (
        first_row_major(dense, params),
        first_column_major(dense, params),
    ) {
        (Some(a), Some(b)) => {
            if b.area() > a.area() {
                b
            } else {
                a
            }
        }
        (a, b) => a.or(b)?,
    };

    while dense.is_populated(rect.left, rect.top + 1)
        && dense.is_populated(rect.right, rect.top + 1)
    {
        rect.top += 1;
    }
    while dense.is_populated(rect.left, rect.bottom - 1)
        && dense.is_populated(rect.right, rect.bottom - 1)
    {
        rect.bottom -= 1;
    }

    debug!(
        "grid rectangle x {}..={} y {}..={} in {}x{}",
        rect.left,
        rect.right,
        rect.bottom,
        rect.top,
        dense.width(),
        dense.height()
    );
    Some(rect)
}
