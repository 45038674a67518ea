use dotgrid_core::{Grid2D, GridCoords};

use crate::DotGraph;

/// Dense array of dot indices addressed by grid coordinate.
///
/// Array index `(ix, iy)` holds grid coordinate `(min.x + ix, min.y + iy)`.
/// Because grid `y` grows upwards, the largest `iy` is the top row of the
/// target in the image.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseGrid {
    cells: Grid2D<Option<usize>>,
    min: GridCoords,
}

impl DenseGrid {
    /// Build from every assigned dot in `graph`. When two dots share a grid
    /// coordinate the first in list order is kept. Returns `None` if no dot
    /// is assigned.
    pub fn from_graph(graph: &DotGraph) -> Option<Self> {
        let assigned: Vec<(usize, GridCoords)> = graph
            .nodes()
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.grid.map(|g| (i, g)))
            .collect();
        let first = assigned.first()?.1;
        let (mut min, mut max) = (first, first);
        for &(_, g) in &assigned {
            min.x = min.x.min(g.x);
            min.y = min.y.min(g.y);
            max.x = max.x.max(g.x);
            max.y = max.y.max(g.y);
        }

        let width = (max.x - min.x + 1) as usize;
        let height = (max.y - min.y + 1) as usize;
        let mut cells = Grid2D::new(width, height, None);
        for (i, g) in assigned {
            let (ix, iy) = ((g.x - min.x) as i64, (g.y - min.y) as i64);
            if !cells.is_populated(ix, iy) {
                cells.set(ix, iy, Some(i));
            }
        }
        Some(Self { cells, min })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.cells.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.cells.height()
    }

    /// Smallest grid coordinate on each axis.
    #[inline]
    pub fn min(&self) -> GridCoords {
        self.min
    }

    /// Dot index at array position `(ix, iy)`.
    #[inline]
    pub fn cell(&self, ix: i64, iy: i64) -> Option<usize> {
        self.cells.value(ix, iy).copied()
    }

    #[inline]
    pub fn is_populated(&self, ix: i64, iy: i64) -> bool {
        self.cells.is_populated(ix, iy)
    }

    /// Dot index at grid coordinate `g`.
    pub fn at(&self, g: GridCoords) -> Option<usize> {
        let (ix, iy) = self.index_of(g);
        self.cell(ix, iy)
    }

    pub fn index_of(&self, g: GridCoords) -> (i64, i64) {
        ((g.x - self.min.x) as i64, (g.y - self.min.y) as i64)
    }

    pub fn coords_of(&self, ix: i64, iy: i64) -> GridCoords {
        GridCoords::new(self.min.x + ix as i32, self.min.y + iy as i32)
    }

    /// Dots with grid `x == gx`, ordered by ascending grid `y` (bottom to top).
    pub fn column(&self, gx: i32) -> Vec<usize> {
        let ix = (gx - self.min.x) as i64;
        (0..self.height() as i64)
            .filter_map(|iy| self.cell(ix, iy))
            .collect()
    }

    pub fn populated_count(&self) -> usize {
        self.cells.populated_count()
    }

    /// `(ix, iy, dot index)` for every populated cell, row-major.
    pub fn populated(&self) -> impl Iterator<Item = (i64, i64, usize)> + '_ {
        self.cells
            .iter()
            .filter_map(|(x, y, c)| c.map(|i| (x as i64, y as i64, i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotgrid_core::Dot;

    fn with_coords(coords: &[(i32, i32)]) -> DotGraph {
        let mut g = DotGraph::new();
        for (k, &(x, y)) in coords.iter().enumerate() {
            let mut dot = Dot::new(k as f64, 0.0, 1.0);
            dot.grid = Some(GridCoords::new(x, y));
            g.add(dot);
        }
        g.add(Dot::centre(0.0, 0.0, 2.0));
        g
    }

    #[test]
    fn offsets_by_minimum() {
        let g = with_coords(&[(-1, 1), (0, 1), (0, 0), (-1, 0), (2, -3)]);
        let dense = DenseGrid::from_graph(&g).expect("grid");
        assert_eq!(dense.width(), 4);
        assert_eq!(dense.height(), 5);
        assert_eq!(dense.min(), GridCoords::new(-1, -3));
        assert_eq!(dense.at(GridCoords::new(2, -3)), Some(4));
        assert_eq!(dense.cell(0, 0), None);
        assert_eq!(dense.cell(3, 0), Some(4));
        assert_eq!(dense.coords_of(1, 3), GridCoords::new(0, 0));
        assert_eq!(dense.populated_count(), 5);
    }

    #[test]
    fn first_dot_wins_shared_cell() {
        let g = with_coords(&[(0, 0), (0, 0), (0, 1)]);
        let dense = DenseGrid::from_graph(&g).expect("grid");
        assert_eq!(dense.at(GridCoords::new(0, 0)), Some(0));
        assert_eq!(dense.column(0), vec![0, 2]);
    }

    #[test]
    fn empty_graph_has_no_grid() {
        assert!(DenseGrid::from_graph(&DotGraph::new()).is_none());
    }
}
