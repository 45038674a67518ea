//! Synthetic rectilinear grid spanned by a quadrilateral perimeter.

use dotgrid_core::{line_intersection, Grid2D, Polygon2D};
use nalgebra::{Point2, Vector2};

/// Fraction along an edge after foreshortening, for a line that would sit at
/// `t` if both ends of the span were equally far away. `near_len` and
/// `far_len` are the lengths of the opposite edges at `t = 0` and `t = 1`.
pub fn foreshortened(t: f64, near_len: f64, far_len: f64) -> f64 {
    let denom = (1.0 - t) * near_len + t * far_len;
    if denom.abs() < 1e-12 {
        return t;
    }
    t * far_len / denom
}

/// Line intercepts of an ideal `dim_x × dim_y` cell grid.
///
/// Intercept `(i, j)` is the crossing of vertical line `i` (counted from the
/// left edge) and horizontal line `j` (counted from the top edge), so the
/// array is `(dim_x + 1) × (dim_y + 1)`.
#[derive(Clone, Debug, PartialEq)]
pub struct IdealGrid {
    intercepts: Grid2D<Point2<f64>>,
}

impl IdealGrid {
    /// Subdivide the perimeter `[top_left, top_right, bottom_right,
    /// bottom_left]` and intersect the two line families. Returns `None` for
    /// a non-quadrilateral, an empty grid or parallel lines.
    pub fn from_perimeter(perimeter: &Polygon2D, dim_x: usize, dim_y: usize) -> Option<Self> {
        if perimeter.len() != 4 || dim_x == 0 || dim_y == 0 {
            return None;
        }
        let v = perimeter.vertices();
        let (tl, tr, br, bl) = (v[0], v[1], v[2], v[3]);
        let top = perimeter.side_length(0);
        let right = perimeter.side_length(1);
        let bottom = perimeter.side_length(2);
        let left = perimeter.side_length(3);

        let lerp = |a: Point2<f64>, b: Point2<f64>, t: f64| a + (b - a) * t;

        let verticals: Vec<(Point2<f64>, Point2<f64>)> = (0..=dim_x)
            .map(|i| {
                let t = foreshortened(i as f64 / dim_x as f64, left, right);
                (lerp(tl, tr, t), lerp(bl, br, t))
            })
            .collect();
        let horizontals: Vec<(Point2<f64>, Point2<f64>)> = (0..=dim_y)
            .map(|j| {
                let t = foreshortened(j as f64 / dim_y as f64, top, bottom);
                (lerp(tl, bl, t), lerp(tr, br, t))
            })
            .collect();

        let mut points = Vec::with_capacity((dim_x + 1) * (dim_y + 1));
        for (h0, h1) in &horizontals {
            for (v0, v1) in &verticals {
                points.push(line_intersection(*v0, *v1, *h0, *h1)?);
            }
        }
        let intercepts = Grid2D::from_vec(dim_x + 1, dim_y + 1, points)?;
        Some(Self { intercepts })
    }

    pub fn dim_x(&self) -> usize {
        self.intercepts.width().saturating_sub(1)
    }

    pub fn dim_y(&self) -> usize {
        self.intercepts.height().saturating_sub(1)
    }

    #[inline]
    pub fn intercept(&self, i: i64, j: i64) -> Option<Point2<f64>> {
        self.intercepts.get(i, j).copied()
    }

    pub fn translate(&mut self, offset: Vector2<f64>) {
        for p in self.intercepts.iter_mut() {
            *p += offset;
        }
    }

    pub fn intercepts(&self) -> impl Iterator<Item = Point2<f64>> + '_ {
        self.intercepts.iter().map(|(_, _, p)| *p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rectangle_subdivides_evenly() {
        let perimeter = Polygon2D::rectangle(100.0, 50.0, 300.0, 150.0);
        let grid = IdealGrid::from_perimeter(&perimeter, 4, 2).expect("grid");
        assert_eq!(grid.dim_x(), 4);
        assert_eq!(grid.dim_y(), 2);
        let p = grid.intercept(1, 1).expect("inside");
        assert_relative_eq!(p.x, 150.0, epsilon = 1e-9);
        assert_relative_eq!(p.y, 100.0, epsilon = 1e-9);
        let corner = grid.intercept(4, 2).expect("corner");
        assert_relative_eq!(corner.x, 300.0, epsilon = 1e-9);
        assert_relative_eq!(corner.y, 150.0, epsilon = 1e-9);
        assert!(grid.intercept(5, 0).is_none());
    }

    #[test]
    fn shorter_far_edge_compresses_cells() {
        // right edge half as long as the left edge
        assert_relative_eq!(foreshortened(0.5, 2.0, 1.0), 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(foreshortened(0.0, 2.0, 1.0), 0.0);
        assert_relative_eq!(foreshortened(1.0, 2.0, 1.0), 1.0);
        assert_relative_eq!(foreshortened(0.25, 3.0, 3.0), 0.25);
    }

    #[test]
    fn translation_moves_every_intercept() {
        let perimeter = Polygon2D::rectangle(0.0, 0.0, 10.0, 10.0);
        let mut grid = IdealGrid::from_perimeter(&perimeter, 2, 2).expect("grid");
        grid.translate(Vector2::new(3.0, -1.0));
        let p = grid.intercept(0, 0).expect("corner");
        assert_relative_eq!(p.x, 3.0);
        assert_relative_eq!(p.y, -1.0);
        assert_eq!(grid.intercepts().count(), 9);
    }

    #[test]
    fn degenerate_perimeter_is_rejected() {
        let flat = Polygon2D::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(20.0, 0.0),
            Point2::new(30.0, 0.0),
        ]);
        assert!(IdealGrid::from_perimeter(&flat, 2, 2).is_none());
        let rect = Polygon2D::rectangle(0.0, 0.0, 10.0, 10.0);
        assert!(IdealGrid::from_perimeter(&rect, 0, 2).is_none());
    }
}
