//! Small 2D geometry helpers: line intersection, point/line distance and a
//! vertex-list polygon with uniform and per-edge scaling.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Intersection of the infinite lines `a0–a1` and `b0–b1`.
///
/// Returns `None` for parallel or degenerate lines.
pub fn line_intersection(
    a0: Point2<f64>,
    a1: Point2<f64>,
    b0: Point2<f64>,
    b1: Point2<f64>,
) -> Option<Point2<f64>> {
    let da = a1 - a0;
    let db = b1 - b0;
    let denom = da.x * db.y - da.y * db.x;
    if denom.abs() < 1e-12 {
        return None;
    }
    let w = b0 - a0;
    let t = (w.x * db.y - w.y * db.x) / denom;
    Some(a0 + da * t)
}

/// Perpendicular distance from `p` to the infinite line through `a` and `b`.
///
/// Falls back to the point distance when `a == b`.
pub fn point_line_distance(p: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> f64 {
    let d = b - a;
    let len = d.norm();
    if len < 1e-12 {
        return (p - a).norm();
    }
    let w = p - a;
    (d.x * w.y - d.y * w.x).abs() / len
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// Closed polygon given by its vertex list. Edge `i` runs from vertex `i` to
/// vertex `i + 1` (wrapping).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Polygon2D {
    vertices: Vec<Point2<f64>>,
}

impl Polygon2D {
    pub fn new(vertices: Vec<Point2<f64>>) -> Self {
        Self { vertices }
    }

    /// Axis-aligned rectangle, vertices clockwise from top-left (image coords).
    pub fn rectangle(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self::new(vec![
            Point2::new(left, top),
            Point2::new(right, top),
            Point2::new(right, bottom),
            Point2::new(left, bottom),
        ])
    }

    #[inline]
    pub fn vertices(&self) -> &[Point2<f64>] {
        &self.vertices
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Endpoints of edge `i`.
    pub fn side(&self, i: usize) -> Option<(Point2<f64>, Point2<f64>)> {
        let n = self.vertices.len();
        if n < 2 || i >= n {
            return None;
        }
        Some((self.vertices[i], self.vertices[(i + 1) % n]))
    }

    pub fn side_length(&self, i: usize) -> f64 {
        self.side(i).map(|(a, b)| (b - a).norm()).unwrap_or(0.0)
    }

    pub fn bounds(&self) -> Bounds {
        let mut b = Bounds {
            left: f64::INFINITY,
            top: f64::INFINITY,
            right: f64::NEG_INFINITY,
            bottom: f64::NEG_INFINITY,
        };
        for p in &self.vertices {
            b.left = b.left.min(p.x);
            b.top = b.top.min(p.y);
            b.right = b.right.max(p.x);
            b.bottom = b.bottom.max(p.y);
        }
        b
    }

    /// Vertex average.
    pub fn centroid(&self) -> Point2<f64> {
        if self.vertices.is_empty() {
            return Point2::origin();
        }
        let sum = self
            .vertices
            .iter()
            .fold(Vector2::zeros(), |acc, p| acc + p.coords);
        Point2::from(sum / self.vertices.len() as f64)
    }

    /// Even-odd ray casting test.
    pub fn is_inside(&self, p: Point2<f64>) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let vi = self.vertices[i];
            let vj = self.vertices[j];
            if (vi.y > p.y) != (vj.y > p.y) {
                let x_cross = vi.x + (p.y - vi.y) * (vj.x - vi.x) / (vj.y - vi.y);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Scale uniformly about the centroid.
    pub fn scale(&mut self, factor: f64) {
        let c = self.centroid();
        for p in &mut self.vertices {
            *p = c + (*p - c) * factor;
        }
    }

    /// Scale edge `i` about its own midpoint, moving both of its vertices.
    pub fn scale_side(&mut self, i: usize, factor: f64) {
        let n = self.vertices.len();
        let Some((a, b)) = self.side(i) else {
            return;
        };
        let mid = Point2::from((a.coords + b.coords) * 0.5);
        self.vertices[i] = mid + (a - mid) * factor;
        self.vertices[(i + 1) % n] = mid + (b - mid) * factor;
    }

    pub fn translate(&mut self, offset: Vector2<f64>) {
        for p in &mut self.vertices {
            *p += offset;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn intersects_crossing_lines() {
        let p = line_intersection(
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
            Point2::new(10.0, 0.0),
        )
        .expect("lines cross");
        assert_relative_eq!(p.x, 5.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn parallel_lines_have_no_intersection() {
        let p = line_intersection(
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(0.0, 1.0),
            Point2::new(10.0, 1.0),
        );
        assert!(p.is_none());
    }

    #[test]
    fn point_line_distance_is_perpendicular() {
        let d = point_line_distance(
            Point2::new(3.0, 4.0),
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
        );
        assert_relative_eq!(d, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn rectangle_inside_and_bounds() {
        let r = Polygon2D::rectangle(10.0, 20.0, 110.0, 70.0);
        assert!(r.is_inside(Point2::new(50.0, 50.0)));
        assert!(!r.is_inside(Point2::new(5.0, 50.0)));
        assert!(!r.is_inside(Point2::new(50.0, 80.0)));
        let b = r.bounds();
        assert_relative_eq!(b.width(), 100.0);
        assert_relative_eq!(b.height(), 50.0);
        assert_relative_eq!(r.side_length(0), 100.0);
        assert_relative_eq!(r.side_length(1), 50.0);
    }

    #[test]
    fn scaling_keeps_centroid() {
        let mut r = Polygon2D::rectangle(0.0, 0.0, 10.0, 10.0);
        r.scale(2.0);
        let c = r.centroid();
        assert_relative_eq!(c.x, 5.0);
        assert_relative_eq!(c.y, 5.0);
        assert_relative_eq!(r.side_length(0), 20.0);

        r.scale_side(1, 0.5);
        assert_relative_eq!(r.side_length(1), 10.0);
        assert_relative_eq!(r.side_length(3), 20.0);
    }
}
